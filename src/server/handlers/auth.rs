use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::AuthUser;
use crate::database::entities::users;
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::auth_service::{LegacyToken, LoginRequest, RegisterRequest, TokenPair};
use crate::services::AuthService;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

fn service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone()).with_hash_cost(state.config.password_hash_cost)
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> CoreResult<(StatusCode, Json<users::Model>)> {
    let user = service(&state).register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> CoreResult<Json<TokenPair>> {
    let tokens = service(&state).login(&state.jwt, payload).await?;
    Ok(Json(tokens))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> CoreResult<Json<Value>> {
    let access = service(&state).refresh(&state.jwt, &payload.refresh).await?;
    Ok(Json(json!({
        "access": access,
        "expires_in": state.jwt.access_expires_in(),
    })))
}

pub async fn issue_token(
    State(state): State<AppState>,
    user: AuthUser,
) -> CoreResult<(StatusCode, Json<LegacyToken>)> {
    let token = service(&state)
        .issue_legacy_token(user.id(), state.config.legacy_token_hours)
        .await?;
    info!(user_id = user.id(), expires_at = %token.expires_at, "issued legacy token");
    Ok((StatusCode::CREATED, Json(token)))
}

pub async fn revoke_tokens(State(state): State<AppState>, user: AuthUser) -> CoreResult<Json<Value>> {
    let revoked = service(&state).revoke_legacy_tokens(user.id()).await?;
    Ok(Json(json!({ "revoked": revoked })))
}

pub async fn me(user: AuthUser) -> Json<users::Model> {
    Json(user.0)
}
