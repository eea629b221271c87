use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::database::entities::weddings;
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::wedding_service::{
    CreateWeddingRequest, MemberInfo, UpdateWeddingRequest, WeddingWithRole,
};
use crate::services::{Access, WeddingService};

use super::wedding_access;

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: String,
}

pub async fn list_weddings(
    State(state): State<AppState>,
    user: AuthUser,
) -> CoreResult<Json<Vec<WeddingWithRole>>> {
    let weddings = WeddingService::new(state.db.clone())
        .list_for_user(user.id())
        .await?;
    Ok(Json(weddings))
}

pub async fn create_wedding(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateWeddingRequest>,
) -> CoreResult<(StatusCode, Json<weddings::Model>)> {
    let wedding = WeddingService::new(state.db.clone())
        .create(user.id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(wedding)))
}

pub async fn get_wedding(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<WeddingWithRole>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    Ok(Json(WeddingWithRole {
        role: access.role.as_str().to_string(),
        wedding: access.wedding,
    }))
}

pub async fn update_wedding(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<UpdateWeddingRequest>,
) -> CoreResult<Json<weddings::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let wedding = WeddingService::new(state.db.clone())
        .update(&access, payload)
        .await?;
    Ok(Json(wedding))
}

pub async fn delete_wedding(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Admin).await?;
    WeddingService::new(state.db.clone()).delete(access).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn regenerate_public_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<weddings::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let wedding = WeddingService::new(state.db.clone())
        .regenerate_public_code(&access)
        .await?;
    Ok(Json(wedding))
}

pub async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<Vec<MemberInfo>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let members = WeddingService::new(state.db.clone())
        .list_members(access.wedding_id())
        .await?;
    Ok(Json(members))
}

pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<AddMemberRequest>,
) -> CoreResult<(StatusCode, Json<MemberInfo>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Admin).await?;
    let member = WeddingService::new(state.db.clone())
        .add_member(access.wedding_id(), &payload.email, &payload.role)
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, member_id)): Path<(i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Admin).await?;
    WeddingService::new(state.db.clone())
        .remove_member(&access, member_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
