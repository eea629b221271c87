use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::database::entities::seating_assignments;
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::seating_service::{
    AssignRequest, MoveRequest, SeatingChart, TableInput, TablePatch, TableWithCounts,
};
use crate::services::{Access, SeatingService};

use super::wedding_access;

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentQuery {
    pub table_id: Option<i32>,
}

pub async fn list_tables(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<Vec<TableWithCounts>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let tables = SeatingService::new(state.db.clone())
        .list_tables(access.wedding_id())
        .await?;
    Ok(Json(tables))
}

pub async fn get_table(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, table_id)): Path<(i32, i32)>,
) -> CoreResult<Json<TableWithCounts>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let table = SeatingService::new(state.db.clone())
        .get_table(access.wedding_id(), table_id)
        .await?;
    Ok(Json(table))
}

pub async fn create_table(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<TableInput>,
) -> CoreResult<(StatusCode, Json<TableWithCounts>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let table = SeatingService::new(state.db.clone())
        .create_table(access.wedding_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(table)))
}

pub async fn update_table(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, table_id)): Path<(i32, i32)>,
    Json(payload): Json<TablePatch>,
) -> CoreResult<Json<TableWithCounts>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let table = SeatingService::new(state.db.clone())
        .update_table(access.wedding_id(), table_id, payload)
        .await?;
    Ok(Json(table))
}

pub async fn delete_table(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, table_id)): Path<(i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    SeatingService::new(state.db.clone())
        .delete_table(access.wedding_id(), table_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_assignments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Query(query): Query<AssignmentQuery>,
) -> CoreResult<Json<Vec<seating_assignments::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let assignments = SeatingService::new(state.db.clone())
        .list_assignments(access.wedding_id(), query.table_id)
        .await?;
    Ok(Json(assignments))
}

pub async fn assign(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<AssignRequest>,
) -> CoreResult<(StatusCode, Json<seating_assignments::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let assignment = SeatingService::new(state.db.clone())
        .assign(access.wedding_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn move_assignment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, assignment_id)): Path<(i32, i32)>,
    Json(payload): Json<MoveRequest>,
) -> CoreResult<Json<seating_assignments::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let assignment = SeatingService::new(state.db.clone())
        .move_assignment(access.wedding_id(), assignment_id, payload)
        .await?;
    Ok(Json(assignment))
}

pub async fn unassign(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, assignment_id)): Path<(i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    SeatingService::new(state.db.clone())
        .unassign(access.wedding_id(), assignment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn chart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<SeatingChart>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let chart = SeatingService::new(state.db.clone())
        .chart(access.wedding_id())
        .await?;
    Ok(Json(chart))
}
