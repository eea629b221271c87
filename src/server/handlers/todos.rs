use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::common::pagination::{Page, PageParams};
use crate::common::BulkOutcome;
use crate::database::entities::{checklist_items, subtasks, todo_attachments, todo_categories, todos};
use crate::domain::TodoStatus;
use crate::errors::{CoreError, CoreResult};
use crate::server::app::AppState;
use crate::services::attachment_service::IncomingFile;
use crate::services::todo_service::{
    BulkStatusRequest, CategoryInput, CategoryPatch, ChecklistInput, ChecklistPatch, SubtaskInput,
    SubtaskPatch, Timeline, TodoDetail, TodoFilter, TodoInput, TodoPatch, WithParent,
};
use crate::services::{Access, AttachmentService, TodoService, ValidationService};

use super::wedding_access;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

fn attachments(state: &AppState) -> AttachmentService {
    AttachmentService::new(state.db.clone(), state.config.uploads.clone())
}

pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<Vec<todo_categories::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let categories = TodoService::new(state.db.clone())
        .list_categories(access.wedding_id())
        .await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<CategoryInput>,
) -> CoreResult<(StatusCode, Json<todo_categories::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let category = TodoService::new(state.db.clone())
        .create_category(access.wedding_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, category_id)): Path<(i32, i32)>,
    Json(payload): Json<CategoryPatch>,
) -> CoreResult<Json<todo_categories::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let category = TodoService::new(state.db.clone())
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
    TodoService::new(state.db.clone())
        .delete_category(access.wedding_id(), category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_todos(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Query(filter): Query<TodoFilter>,
    Query(page): Query<PageParams>,
) -> CoreResult<Json<Page<todos::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let todos = TodoService::new(state.db.clone())
        .list(access.wedding_id(), filter, &page)
        .await?;
    Ok(Json(todos))
}

pub async fn create_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<TodoInput>,
) -> CoreResult<(StatusCode, Json<todos::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let todo = TodoService::new(state.db.clone())
        .create(access.wedding_id(), user.id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn get_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id)): Path<(i32, i32)>,
) -> CoreResult<Json<TodoDetail>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let todo = TodoService::new(state.db.clone())
        .get(access.wedding_id(), todo_id)
        .await?;
    Ok(Json(todo))
}

pub async fn update_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id)): Path<(i32, i32)>,
    Json(payload): Json<TodoPatch>,
) -> CoreResult<Json<todos::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let todo = TodoService::new(state.db.clone())
        .update(access.wedding_id(), todo_id, payload)
        .await?;
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id)): Path<(i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    attachments(&state)
        .remove_files_for_todo(access.wedding_id(), todo_id)
        .await?;
    TodoService::new(state.db.clone())
        .delete(access.wedding_id(), todo_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id)): Path<(i32, i32)>,
    Json(payload): Json<StatusRequest>,
) -> CoreResult<Json<todos::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let status = ValidationService::parse_choice::<TodoStatus>("status", &payload.status)?;
    let todo = TodoService::new(state.db.clone())
        .set_status(access.wedding_id(), todo_id, status)
        .await?;
    Ok(Json(todo))
}

pub async fn reopen(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id)): Path<(i32, i32)>,
) -> CoreResult<Json<todos::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let todo = TodoService::new(state.db.clone())
        .reopen(access.wedding_id(), todo_id)
        .await?;
    Ok(Json(todo))
}

pub async fn bulk_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
    Json(payload): Json<BulkStatusRequest>,
) -> CoreResult<Json<BulkOutcome>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let outcome = TodoService::new(state.db.clone())
        .bulk_status(access.wedding_id(), payload)
        .await?;
    Ok(Json(outcome))
}

pub async fn timeline(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<Timeline>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let timeline = TodoService::new(state.db.clone())
        .timeline(access.wedding_id(), Utc::now().date_naive())
        .await?;
    Ok(Json(timeline))
}

pub async fn add_checklist_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id)): Path<(i32, i32)>,
    Json(payload): Json<ChecklistInput>,
) -> CoreResult<(StatusCode, Json<WithParent<checklist_items::Model>>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let item = TodoService::new(state.db.clone())
        .add_checklist_item(access.wedding_id(), todo_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_checklist_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id, item_id)): Path<(i32, i32, i32)>,
    Json(payload): Json<ChecklistPatch>,
) -> CoreResult<Json<WithParent<checklist_items::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let item = TodoService::new(state.db.clone())
        .update_checklist_item(access.wedding_id(), todo_id, item_id, payload)
        .await?;
    Ok(Json(item))
}

/// Returns the parent todo with its recomputed progress
pub async fn delete_checklist_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id, item_id)): Path<(i32, i32, i32)>,
) -> CoreResult<Json<todos::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let todo = TodoService::new(state.db.clone())
        .delete_checklist_item(access.wedding_id(), todo_id, item_id)
        .await?;
    Ok(Json(todo))
}

pub async fn add_subtask(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id)): Path<(i32, i32)>,
    Json(payload): Json<SubtaskInput>,
) -> CoreResult<(StatusCode, Json<WithParent<subtasks::Model>>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let subtask = TodoService::new(state.db.clone())
        .add_subtask(access.wedding_id(), todo_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

pub async fn update_subtask(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id, subtask_id)): Path<(i32, i32, i32)>,
    Json(payload): Json<SubtaskPatch>,
) -> CoreResult<Json<WithParent<subtasks::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let subtask = TodoService::new(state.db.clone())
        .update_subtask(access.wedding_id(), todo_id, subtask_id, payload)
        .await?;
    Ok(Json(subtask))
}

pub async fn delete_subtask(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id, subtask_id)): Path<(i32, i32, i32)>,
) -> CoreResult<Json<todos::Model>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let todo = TodoService::new(state.db.clone())
        .delete_subtask(access.wedding_id(), todo_id, subtask_id)
        .await?;
    Ok(Json(todo))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id)): Path<(i32, i32)>,
) -> CoreResult<Json<Vec<todo_attachments::Model>>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let attachments = attachments(&state)
        .list(access.wedding_id(), todo_id)
        .await?;
    Ok(Json(attachments))
}

/// Multipart upload; the file goes in a field named `file`
pub async fn upload_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id)): Path<(i32, i32)>,
    mut multipart: Multipart,
) -> CoreResult<(StatusCode, Json<todo_attachments::Model>)> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;

    let mut incoming = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CoreError::validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(|name| name.to_string())
            .ok_or_else(|| CoreError::field("file", "Uploaded file has no file name"))?;
        let content_type = field.content_type().map(|ct| ct.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| CoreError::field("file", format!("Failed to read upload: {}", e)))?;

        incoming = Some(IncomingFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let file = incoming.ok_or_else(|| CoreError::field("file", "No file was uploaded"))?;
    let attachment = attachments(&state)
        .upload(access.wedding_id(), todo_id, user.id(), file)
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn download_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id, attachment_id)): Path<(i32, i32, i32)>,
) -> CoreResult<impl IntoResponse> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let (attachment, bytes) = attachments(&state)
        .open(access.wedding_id(), todo_id, attachment_id)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&attachment.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            attachment.original_name.replace('"', "")
        ))
        .map_err(|_| CoreError::internal("Attachment name is not a valid header value"))?,
    );

    Ok((headers, bytes))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wedding_id, todo_id, attachment_id)): Path<(i32, i32, i32)>,
) -> CoreResult<StatusCode> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    attachments(&state)
        .delete(access.wedding_id(), todo_id, attachment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
