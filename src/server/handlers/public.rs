//! Unauthenticated pages reached through invitation and wedding codes

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::guest_service::{PublicInvitation, RsvpRequest};
use crate::services::registry_service::{
    ClaimRequest, PublicRegistry, PublicRegistryItem, UnclaimRequest,
};
use crate::services::{GuestService, RegistryService};

pub async fn get_invitation(
    State(state): State<AppState>,
    Path(user_code): Path<String>,
) -> CoreResult<Json<PublicInvitation>> {
    let invitation = GuestService::new(state.db.clone())
        .public_invitation(&user_code, Utc::now().date_naive())
        .await?;
    Ok(Json(invitation))
}

pub async fn submit_rsvp(
    State(state): State<AppState>,
    Path(user_code): Path<String>,
    Json(payload): Json<RsvpRequest>,
) -> CoreResult<Json<PublicInvitation>> {
    let invitation = GuestService::new(state.db.clone())
        .public_rsvp(&user_code, payload, Utc::now().date_naive())
        .await?;
    Ok(Json(invitation))
}

pub async fn get_registry(
    State(state): State<AppState>,
    Path(public_code): Path<String>,
) -> CoreResult<Json<PublicRegistry>> {
    let registry = RegistryService::new(state.db.clone())
        .public_list(&public_code)
        .await?;
    Ok(Json(registry))
}

pub async fn claim_item(
    State(state): State<AppState>,
    Path((public_code, item_id)): Path<(String, i32)>,
    Json(payload): Json<ClaimRequest>,
) -> CoreResult<Json<PublicRegistryItem>> {
    let item = RegistryService::new(state.db.clone())
        .claim(&public_code, item_id, payload)
        .await?;
    Ok(Json(item))
}

pub async fn unclaim_item(
    State(state): State<AppState>,
    Path((public_code, item_id)): Path<(String, i32)>,
    Json(payload): Json<UnclaimRequest>,
) -> CoreResult<Json<PublicRegistryItem>> {
    let item = RegistryService::new(state.db.clone())
        .public_unclaim(&public_code, item_id, payload)
        .await?;
    Ok(Json(item))
}
