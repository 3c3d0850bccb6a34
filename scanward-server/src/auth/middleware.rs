use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::AuthError;
use crate::infra::{app_state::AppState, errors::AppError};

/// Subject of a verified access token, available to handlers as a request
/// extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub subject: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&request)?;
    let claims = state.tokens.decode_access(token).inspect_err(|err| {
        warn!(
            path = %request.uri().path(),
            reason = %err,
            "rejected bearer token"
        );
    })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { subject: claims.sub });
    Ok(next.run(request).await)
}

fn extract_bearer_token(request: &Request) -> Result<&str, AuthError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or(AuthError::MissingCredentials)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token.trim())
}
