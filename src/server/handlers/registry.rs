use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::database::entities::registry_items;
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::registry_service::{RegistryItemInput, RegistryItemPatch};
use crate::services::{Access, RegistryService};

use super::wedding_access;

pub async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<Vec<registry_items::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let items = RegistryService::new(state.db.clone())
        .list(access.wedding_id())
        .await?;
    Ok(Json(items))
}

pub async fn get_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, item_id)): Path<(i32, i32)>,
) -> CoreResult<Json<registry_items::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let item = RegistryService::new(state.db.clone())
        .get(access.wedding_id(), item_id)
        .await?;
    Ok(Json(item))
}

pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<RegistryItemInput>,
) -> CoreResult<(StatusCode, Json<registry_items::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let item = RegistryService::new(state.db.clone())
        .create(access.wedding_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, item_id)): Path<(i32, i32)>,
    Json(payload): Json<RegistryItemPatch>,
) -> CoreResult<Json<registry_items::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let item = RegistryService::new(state.db.clone())
        .update(access.wedding_id(), item_id, payload)
        .await?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, item_id)): Path<(i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    RegistryService::new(state.db.clone())
        .delete(access.wedding_id(), item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unclaim_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, item_id)): Path<(i32, i32)>,
) -> CoreResult<Json<registry_items::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let item = RegistryService::new(state.db.clone())
        .unclaim(access.wedding_id(), item_id)
        .await?;
    Ok(Json(item))
}
