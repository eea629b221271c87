use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::common::pagination::{Page, PageParams};
use crate::database::entities::vendors;
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::vendor_service::{VendorFilter, VendorInput, VendorPatch};
use crate::services::{Access, VendorService};

use super::wedding_access;

pub async fn list_vendors(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Query(filter): Query<VendorFilter>,
    Query(page): Query<PageParams>,
) -> CoreResult<Json<Page<vendors::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let vendors = VendorService::new(state.db.clone())
        .list(access.wedding_id(), filter, &page)
        .await?;
    Ok(Json(vendors))
}

pub async fn get_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, vendor_id)): Path<(i32, i32)>,
) -> CoreResult<Json<vendors::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let vendor = VendorService::new(state.db.clone())
        .get(access.wedding_id(), vendor_id)
        .await?;
    Ok(Json(vendor))
}

pub async fn create_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<VendorInput>,
) -> CoreResult<(StatusCode, Json<vendors::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let vendor = VendorService::new(state.db.clone())
        .create(access.wedding_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

pub async fn update_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, vendor_id)): Path<(i32, i32)>,
    Json(payload): Json<VendorPatch>,
) -> CoreResult<Json<vendors::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let vendor = VendorService::new(state.db.clone())
        .update(access.wedding_id(), vendor_id, payload)
        .await?;
    Ok(Json(vendor))
}

pub async fn delete_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, vendor_id)): Path<(i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    VendorService::new(state.db.clone())
        .delete(access.wedding_id(), vendor_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
