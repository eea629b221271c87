use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::common::pagination::{Page, PageParams};
use crate::common::BulkOutcome;
use crate::database::entities::{guest_children, guests};
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::guest_service::{
    ChildInput, ChildPatch, GuestDetail, GuestFilter, GuestInput, GuestPatch, GuestSummary,
    RsvpRequest,
};
use crate::services::{Access, GuestService};

use super::wedding_access;

#[derive(Debug, Deserialize)]
pub struct GuestIds {
    pub guest_ids: Vec<i32>,
}

pub async fn list_guests(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Query(filter): Query<GuestFilter>,
    Query(page): Query<PageParams>,
) -> CoreResult<Json<Page<guests::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let guests = GuestService::new(state.db.clone())
        .list(access.wedding_id(), filter, &page)
        .await?;
    Ok(Json(guests))
}

pub async fn create_guest(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<GuestInput>,
) -> CoreResult<(StatusCode, Json<guests::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let guest = GuestService::new(state.db.clone())
        .create(&access.wedding, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(guest)))
}

pub async fn get_guest(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, guest_id)): Path<(i32, i32)>,
) -> CoreResult<Json<GuestDetail>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let guest = GuestService::new(state.db.clone())
        .get(access.wedding_id(), guest_id)
        .await?;
    Ok(Json(guest))
}

pub async fn update_guest(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, guest_id)): Path<(i32, i32)>,
    Json(payload): Json<GuestPatch>,
) -> CoreResult<Json<guests::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let guest = GuestService::new(state.db.clone())
        .update(&access.wedding, guest_id, payload)
        .await?;
    Ok(Json(guest))
}

pub async fn delete_guest(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, guest_id)): Path<(i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    GuestService::new(state.db.clone())
        .delete(access.wedding_id(), guest_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record an answer on the guest's behalf
pub async fn rsvp(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, guest_id)): Path<(i32, i32)>,
    Json(payload): Json<RsvpRequest>,
) -> CoreResult<Json<guests::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let guest = GuestService::new(state.db.clone())
        .rsvp(&access.wedding, guest_id, payload)
        .await?;
    Ok(Json(guest))
}

pub async fn add_child(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, guest_id)): Path<(i32, i32)>,
    Json(payload): Json<ChildInput>,
) -> CoreResult<(StatusCode, Json<guest_children::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let child = GuestService::new(state.db.clone())
        .add_child(access.wedding_id(), guest_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn update_child(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, guest_id, child_id)): Path<(i32, i32, i32)>,
    Json(payload): Json<ChildPatch>,
) -> CoreResult<Json<guest_children::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let child = GuestService::new(state.db.clone())
        .update_child(access.wedding_id(), guest_id, child_id, payload)
        .await?;
    Ok(Json(child))
}

pub async fn delete_child(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, guest_id, child_id)): Path<(i32, i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    GuestService::new(state.db.clone())
        .delete_child(access.wedding_id(), guest_id, child_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send_reminders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<GuestIds>,
) -> CoreResult<Json<BulkOutcome>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let outcome = GuestService::new(state.db.clone())
        .send_reminders(access.wedding_id(), &payload.guest_ids)
        .await?;
    Ok(Json(outcome))
}

pub async fn mark_invitations_sent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<GuestIds>,
) -> CoreResult<Json<BulkOutcome>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let outcome = GuestService::new(state.db.clone())
        .mark_invitations_sent(access.wedding_id(), &payload.guest_ids)
        .await?;
    Ok(Json(outcome))
}

pub async fn guest_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<GuestSummary>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let summary = GuestService::new(state.db.clone())
        .summary(access.wedding_id())
        .await?;
    Ok(Json(summary))
}
