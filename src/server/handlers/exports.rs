use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
};

use crate::auth::AuthUser;
use crate::errors::{CoreError, CoreResult};
use crate::server::app::AppState;
use crate::services::{Access, ExportService};

use super::wedding_access;

fn file_headers(content_type: &'static str, filename: &str) -> CoreResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
            .map_err(|_| CoreError::internal("Export file name is not a valid header value"))?,
    );
    Ok(headers)
}

/// Meal list and seating chart for the caterer
pub async fn guest_report_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<impl IntoResponse> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let bytes = ExportService::new(state.db.clone())
        .guest_report_pdf(&access.wedding)
        .await?;
    let headers = file_headers(
        "application/pdf",
        &format!("guest-report-{}.pdf", access.wedding_id()),
    )?;
    Ok((headers, bytes))
}

pub async fn guests_csv(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<impl IntoResponse> {
    let access = wedding_access(&state, &user, wedding_id, Access::Read).await?;
    let bytes = ExportService::new(state.db.clone())
        .guest_csv(access.wedding_id())
        .await?;
    let headers = file_headers(
        "text/csv; charset=utf-8",
        &format!("guests-{}.csv", access.wedding_id()),
    )?;
    Ok((headers, bytes))
}
