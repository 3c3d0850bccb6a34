pub mod handlers;
pub mod jwt;
pub mod middleware;

use thiserror::Error;

pub use jwt::{Claims, TokenService, TokenType};
pub use middleware::{AuthenticatedUser, auth_middleware};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not authenticated")]
    MissingCredentials,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token type")]
    WrongTokenType,
    #[error("failed to sign token")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

/// Compares two secrets without exiting early on the first mismatch.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len_diff = a.len() ^ b.len();
    let byte_diff = a
        .iter()
        .zip(b.iter().cycle())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    len_diff == 0 && byte_diff == 0
}
