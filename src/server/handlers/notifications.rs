use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures_util::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::AuthUser;
use crate::common::pagination::{Page, PageParams};
use crate::database::entities::{notification_preferences, notifications};
use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::notification_service::{NotificationFilter, PreferencesPatch, SweepReport};
use crate::services::{Access, NotificationService};

use super::wedding_access;

#[derive(Debug, Default, Deserialize)]
pub struct WeddingScope {
    pub wedding_id: Option<i32>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<NotificationFilter>,
    Query(page): Query<PageParams>,
) -> CoreResult<Json<Page<notifications::Model>>> {
    let notifications = NotificationService::new(state.db.clone())
        .list(user.id(), filter, &page)
        .await?;
    Ok(Json(notifications))
}

pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<WeddingScope>,
) -> CoreResult<Json<Value>> {
    let count = NotificationService::new(state.db.clone())
        .unread_count(user.id(), scope.wedding_id)
        .await?;
    Ok(Json(json!({ "unread": count })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(notification_id): Path<i32>,
) -> CoreResult<Json<notifications::Model>> {
    let notification = NotificationService::new(state.db.clone())
        .mark_read(user.id(), notification_id)
        .await?;
    Ok(Json(notification))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<WeddingScope>,
) -> CoreResult<Json<Value>> {
    let updated = NotificationService::new(state.db.clone())
        .mark_all_read(user.id(), scope.wedding_id)
        .await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(notification_id): Path<i32>,
) -> CoreResult<StatusCode> {
    NotificationService::new(state.db.clone())
        .delete(user.id(), notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_preferences(
    State(state): State<AppState>,
    user: AuthUser,
) -> CoreResult<Json<notification_preferences::Model>> {
    let preferences = NotificationService::new(state.db.clone())
        .preferences(user.id())
        .await?;
    Ok(Json(preferences))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PreferencesPatch>,
) -> CoreResult<Json<notification_preferences::Model>> {
    let preferences = NotificationService::new(state.db.clone())
        .update_preferences(user.id(), payload)
        .await?;
    Ok(Json(preferences))
}

/// Run the due-date sweep for one wedding now
pub async fn sweep_wedding(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wedding_id): Path<i32>,
) -> CoreResult<Json<SweepReport>> {
    let access = wedding_access(&state, &user, wedding_id, Access::Write).await?;
    let report = NotificationService::new(state.db.clone())
        .sweep_wedding(access.wedding_id(), Utc::now())
        .await?;
    Ok(Json(report))
}

/// Server-sent events carrying notifications created after the stream opened
pub async fn stream(
    State(state): State<AppState>,
    user: AuthUser,
) -> CoreResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let service = NotificationService::new(state.db.clone());
    let user_id = user.id();
    let last_id = service.latest_id(user_id).await?;
    let poll = Duration::from_secs(state.config.sse_poll_secs);

    debug!(user_id, last_id, "notification stream opened");
    let stream = notification_stream(service, user_id, last_id, poll);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

fn notification_stream(
    service: NotificationService,
    user_id: i32,
    mut last_id: i32,
    poll: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let mut last_unread: Option<u64> = None;
        let mut ticker = tokio::time::interval(poll);

        loop {
            ticker.tick().await;

            match service.newer_than(user_id, last_id).await {
                Ok(rows) => {
                    for row in rows {
                        last_id = row.id;
                        match Event::default().event("notification").json_data(&row) {
                            Ok(event) => yield Ok(event.id(row.id.to_string())),
                            Err(err) => warn!(user_id, error = %err, "could not encode notification"),
                        }
                    }
                }
                Err(err) => warn!(user_id, error = %err, "notification poll failed"),
            }

            match service.unread_count(user_id, None).await {
                Ok(count) if last_unread != Some(count) => {
                    last_unread = Some(count);
                    yield Ok(Event::default().event("unread").data(count.to_string()));
                }
                Ok(_) => {}
                Err(err) => warn!(user_id, error = %err, "unread count poll failed"),
            }
        }
    }
}
