use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    jwt::JwtKeys,
    services::{authenticate, load_token_subject, register_user},
};
use crate::{
    error::{ApiError, Envelope},
    state::AppState,
    users::repo_types::User,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/refresh", post(refresh))
}

fn issue(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let pair = keys.generate_tokens(user.id, &user.username)?;
    Ok(AuthResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<AuthResponse>>), ApiError> {
    let Json(payload) = payload?;
    let user = register_user(state.users.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Envelope::ok(issue(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Envelope<AuthResponse>>, ApiError> {
    let Json(payload) = payload?;
    let user = authenticate(state.users.as_ref(), payload).await?;
    Ok(Envelope::ok(issue(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<Envelope<AuthResponse>>, ApiError> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::Unauthorized("Invalid refresh token".into())
    })?;

    let user = load_token_subject(state.users.as_ref(), claims.sub).await?;
    info!(user_id = %user.id, "tokens refreshed");
    Ok(Envelope::ok(issue(&state, user)?))
}
