use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::database::entities::{budget_categories, expenses};
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::budget_service::{
    BudgetCategoryInput, BudgetCategoryPatch, BudgetSummary, ExpenseFilter, ExpenseInput,
    ExpensePatch,
};
use crate::services::{Access, BudgetService};

use super::wedding_access;

pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<Vec<budget_categories::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let categories = BudgetService::new(state.db.clone())
        .list_categories(access.wedding_id())
        .await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<BudgetCategoryInput>,
) -> CoreResult<(StatusCode, Json<budget_categories::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let category = BudgetService::new(state.db.clone())
        .create_category(access.wedding_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, category_id)): Path<(i32, i32)>,
    Json(payload): Json<BudgetCategoryPatch>,
) -> CoreResult<Json<budget_categories::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let category = BudgetService::new(state.db.clone())
        .update_category(access.wedding_id(), category_id, payload)
        .await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, category_id)): Path<(i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    BudgetService::new(state.db.clone())
        .delete_category(access.wedding_id(), category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_expenses(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Query(filter): Query<ExpenseFilter>,
) -> CoreResult<Json<Vec<expenses::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let expenses = BudgetService::new(state.db.clone())
        .list_expenses(access.wedding_id(), filter)
        .await?;
    Ok(Json(expenses))
}

pub async fn get_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, expense_id)): Path<(i32, i32)>,
) -> CoreResult<Json<expenses::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let expense = BudgetService::new(state.db.clone())
        .get_expense(access.wedding_id(), expense_id)
        .await?;
    Ok(Json(expense))
}

pub async fn create_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<ExpenseInput>,
) -> CoreResult<(StatusCode, Json<expenses::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let expense = BudgetService::new(state.db.clone())
        .create_expense(access.wedding_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn update_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, expense_id)): Path<(i32, i32)>,
    Json(payload): Json<ExpensePatch>,
) -> CoreResult<Json<expenses::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let expense = BudgetService::new(state.db.clone())
        .update_expense(access.wedding_id(), expense_id, payload)
        .await?;
    Ok(Json(expense))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, expense_id)): Path<(i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    BudgetService::new(state.db.clone())
        .delete_expense(access.wedding_id(), expense_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn summary(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<BudgetSummary>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let summary = BudgetService::new(state.db.clone())
        .summary(&access.wedding)
        .await?;
    Ok(Json(summary))
}
