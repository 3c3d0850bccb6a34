use axum::{Json, extract::State};
use scanward_model::{LoginRequest, RefreshRequest, TokenResponse};
use tracing::{info, warn};

use super::{AuthError, constant_time_eq};
use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let auth = &state.config.auth;
    // Evaluate both comparisons so timing doesn't reveal which one failed.
    let username_ok =
        constant_time_eq(request.username.as_bytes(), auth.username.as_bytes());
    let password_ok =
        constant_time_eq(request.password.as_bytes(), auth.password.as_bytes());
    if !(username_ok & password_ok) {
        warn!(username = %request.username, "login rejected");
        return Err(AuthError::InvalidCredentials.into());
    }

    let tokens = state.tokens.issue_pair(&request.username)?;
    info!(username = %request.username, "login succeeded");
    Ok(Json(tokens))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let claims = state
        .tokens
        .decode_refresh(&request.refresh_token)
        .inspect_err(|err| warn!(reason = %err, "refresh rejected"))?;

    let access_token = state.tokens.issue_access(&claims.sub)?;
    Ok(Json(TokenResponse::bearer(
        access_token,
        request.refresh_token,
        state.tokens.access_expires_in(),
    )))
}
