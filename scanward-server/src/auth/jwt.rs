use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use scanward_config::{AuthConfig, JwtAlgorithm};
use scanward_model::TokenResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Signs and verifies access/refresh tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(
        secret: &[u8],
        algorithm: JwtAlgorithm,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        let algorithm = match algorithm {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
        };
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Expects expiry settings already bounded by the config guard rails.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.secret_key.as_bytes(),
            config.jwt_algorithm,
            Duration::minutes(config.access_token_expire_minutes as i64),
            Duration::hours(config.refresh_token_expire_hours as i64),
        )
    }

    /// Access token lifetime in seconds, as reported to clients.
    pub fn access_expires_in(&self) -> u64 {
        self.access_ttl.num_seconds().max(0) as u64
    }

    pub fn issue_pair(&self, subject: &str) -> Result<TokenResponse, AuthError> {
        Ok(TokenResponse::bearer(
            self.issue_access(subject)?,
            self.issue(subject, TokenType::Refresh, self.refresh_ttl)?,
            self.access_expires_in(),
        ))
    }

    pub fn issue_access(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, TokenType::Access, self.access_ttl)
    }

    fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding)
            .map_err(AuthError::Encoding)
    }

    /// Verifies signature and expiry, whatever the token type.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(self.algorithm);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    pub fn decode_access(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode_typed(token, TokenType::Access)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode_typed(token, TokenType::Refresh)
    }

    fn decode_typed(
        &self,
        token: &str,
        expected: TokenType,
    ) -> Result<Claims, AuthError> {
        let claims = self.decode(token)?;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }
}
