use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::db_errors::is_unique_violation;
use crate::common::pagination::{fetch_page, Page, PageParams};
use crate::database::entities::{guests, notification_preferences, notifications, todos, weddings};
use crate::domain::notifications::{classify_due, due_datetime};
use crate::domain::{NotificationType, TodoStatus};
use crate::errors::{CoreError, CoreResult};

use super::authorization::wedding_member_ids;
use super::validation::ValidationService;

/// A notification about to be written
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i32,
    pub wedding_id: i32,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_todo_id: Option<i32>,
    pub related_guest_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilter {
    pub wedding_id: Option<i32>,
    pub is_read: Option<bool>,
    pub notification_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesPatch {
    pub todo_due_soon: Option<bool>,
    pub todo_due_now: Option<bool>,
    pub todo_overdue: Option<bool>,
    pub rsvp_accepted: Option<bool>,
    pub rsvp_declined: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub todos_checked: u64,
    pub created: u64,
}

impl std::ops::AddAssign for SweepReport {
    fn add_assign(&mut self, other: Self) {
        self.todos_checked += other.todos_checked;
        self.created += other.created;
    }
}

/// Whether `user_id` accepts notifications of this type. Users without a
/// preferences row get everything.
pub async fn user_allows<C>(db: &C, user_id: i32, notification_type: NotificationType) -> CoreResult<bool>
where
    C: ConnectionTrait,
{
    let prefs = notification_preferences::Entity::find()
        .filter(notification_preferences::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(prefs.map(|p| p.allows(notification_type)).unwrap_or(true))
}

/// Insert a notification unless an identical todo notification already
/// exists for the user.
///
/// Returns `None` when the row was already present. Safe to call from
/// concurrent sweeps: the partial unique index settles races.
pub async fn create_notification<C>(db: &C, new: NewNotification) -> CoreResult<Option<notifications::Model>>
where
    C: ConnectionTrait,
{
    if let Some(todo_id) = new.related_todo_id {
        let existing = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(new.user_id))
            .filter(notifications::Column::RelatedTodoId.eq(todo_id))
            .filter(notifications::Column::NotificationType.eq(new.notification_type.as_str()))
            .count(db)
            .await?;
        if existing > 0 {
            return Ok(None);
        }
    }

    let result = notifications::ActiveModel {
        user_id: Set(new.user_id),
        wedding_id: Set(new.wedding_id),
        notification_type: Set(new.notification_type.as_str().to_string()),
        title: Set(new.title),
        message: Set(new.message),
        is_read: Set(false),
        read_at: Set(None),
        related_todo_id: Set(new.related_todo_id),
        related_guest_id: Set(new.related_guest_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match result {
        Ok(model) => Ok(Some(model)),
        Err(err) if is_unique_violation(&err) => {
            debug!(user_id = new.user_id, "notification already present");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Tell every member who wants it that a guest answered their invitation.
///
/// Returns the number of notifications written.
pub async fn notify_rsvp<C>(
    db: &C,
    wedding: &weddings::Model,
    guest: &guests::Model,
    notification_type: NotificationType,
) -> CoreResult<u64>
where
    C: ConnectionTrait,
{
    let (title, verb) = match notification_type {
        NotificationType::RsvpAccepted => ("RSVP accepted", "will attend"),
        NotificationType::RsvpDeclined => ("RSVP declined", "cannot attend"),
        _ => return Ok(0),
    };

    let mut created = 0;
    for user_id in wedding_member_ids(db, wedding.id).await? {
        if !user_allows(db, user_id, notification_type).await? {
            continue;
        }
        let new = NewNotification {
            user_id,
            wedding_id: wedding.id,
            notification_type,
            title: title.to_string(),
            message: format!("{} {} {}", guest.full_name(), verb, wedding.title),
            related_todo_id: None,
            related_guest_id: Some(guest.id),
        };
        if create_notification(db, new).await?.is_some() {
            created += 1;
        }
    }

    info!(
        wedding_id = wedding.id,
        guest_id = guest.id,
        notification_type = notification_type.as_str(),
        created,
        "rsvp notifications"
    );
    Ok(created)
}

#[derive(Clone)]
pub struct NotificationService {
    db: DatabaseConnection,
}

impl NotificationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Raise due-soon/due-now/overdue alerts for one wedding's open todos
    pub async fn sweep_wedding(&self, wedding_id: i32, now: DateTime<Utc>) -> CoreResult<SweepReport> {
        let open = todos::Entity::find()
            .filter(todos::Column::WeddingId.eq(wedding_id))
            .filter(todos::Column::DueDate.is_not_null())
            .filter(
                todos::Column::Status
                    .is_not_in([TodoStatus::Completed.as_str(), TodoStatus::Cancelled.as_str()]),
            )
            .all(&self.db)
            .await?;

        let mut report = SweepReport::default();
        let mut members: Option<Vec<i32>> = None;

        for todo in open {
            report.todos_checked += 1;
            let Some(due_date) = todo.due_date else {
                continue;
            };
            let Some(notification_type) = classify_due(due_datetime(due_date, todo.due_time), now)
            else {
                continue;
            };

            let recipients = match todo.assigned_to {
                Some(user_id) => vec![user_id],
                None => match &members {
                    Some(ids) => ids.clone(),
                    None => {
                        let ids = wedding_member_ids(&self.db, wedding_id).await?;
                        members = Some(ids.clone());
                        ids
                    }
                },
            };

            for user_id in recipients {
                if !user_allows(&self.db, user_id, notification_type).await? {
                    continue;
                }
                let new = NewNotification {
                    user_id,
                    wedding_id,
                    notification_type,
                    title: due_title(notification_type, &todo.title),
                    message: due_message(notification_type, &todo),
                    related_todo_id: Some(todo.id),
                    related_guest_id: None,
                };
                if create_notification(&self.db, new).await?.is_some() {
                    report.created += 1;
                }
            }
        }

        if report.created > 0 {
            info!(wedding_id, created = report.created, "due-date sweep");
        }
        Ok(report)
    }

    /// Sweep every wedding; failures of one wedding do not stop the others
    pub async fn sweep_all(&self, now: DateTime<Utc>) -> CoreResult<SweepReport> {
        let weddings = weddings::Entity::find().all(&self.db).await?;
        let mut total = SweepReport::default();
        for wedding in weddings {
            match self.sweep_wedding(wedding.id, now).await {
                Ok(report) => total += report,
                Err(err) => warn!(wedding_id = wedding.id, error = %err, "sweep failed"),
            }
        }
        Ok(total)
    }

    pub async fn list(
        &self,
        user_id: i32,
        filter: NotificationFilter,
        params: &PageParams,
    ) -> CoreResult<Page<notifications::Model>> {
        let mut select = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id));

        if let Some(wedding_id) = filter.wedding_id {
            select = select.filter(notifications::Column::WeddingId.eq(wedding_id));
        }
        if let Some(is_read) = filter.is_read {
            select = select.filter(notifications::Column::IsRead.eq(is_read));
        }
        if let Some(raw) = filter.notification_type.as_deref() {
            let notification_type =
                ValidationService::parse_choice::<NotificationType>("notification_type", raw)?;
            select = select
                .filter(notifications::Column::NotificationType.eq(notification_type.as_str()));
        }

        let select = select
            .order_by_desc(notifications::Column::CreatedAt)
            .order_by_desc(notifications::Column::Id);
        fetch_page(select, &self.db, params).await
    }

    pub async fn unread_count(&self, user_id: i32, wedding_id: Option<i32>) -> CoreResult<u64> {
        let mut select = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::IsRead.eq(false));
        if let Some(wedding_id) = wedding_id {
            select = select.filter(notifications::Column::WeddingId.eq(wedding_id));
        }
        Ok(select.count(&self.db).await?)
    }

    /// Rows newer than `after_id`, oldest first
    pub async fn newer_than(&self, user_id: i32, after_id: i32) -> CoreResult<Vec<notifications::Model>> {
        Ok(notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::Id.gt(after_id))
            .order_by_asc(notifications::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn latest_id(&self, user_id: i32) -> CoreResult<i32> {
        let latest = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .order_by_desc(notifications::Column::Id)
            .one(&self.db)
            .await?;
        Ok(latest.map(|n| n.id).unwrap_or(0))
    }

    async fn find_owned(&self, user_id: i32, id: i32) -> CoreResult<notifications::Model> {
        notifications::Entity::find_by_id(id)
            .filter(notifications::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Notification", id.to_string()))
    }

    pub async fn mark_read(&self, user_id: i32, id: i32) -> CoreResult<notifications::Model> {
        let notification = self.find_owned(user_id, id).await?;
        if notification.is_read {
            return Ok(notification);
        }
        let mut active = notification.into_active_model();
        active.is_read = Set(true);
        active.read_at = Set(Some(Utc::now()));
        Ok(active.update(&self.db).await?)
    }

    pub async fn mark_all_read(&self, user_id: i32, wedding_id: Option<i32>) -> CoreResult<u64> {
        let mut update = notifications::Entity::update_many()
            .col_expr(notifications::Column::IsRead, Expr::value(true))
            .col_expr(notifications::Column::ReadAt, Expr::value(Utc::now()))
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::IsRead.eq(false));
        if let Some(wedding_id) = wedding_id {
            update = update.filter(notifications::Column::WeddingId.eq(wedding_id));
        }
        Ok(update.exec(&self.db).await?.rows_affected)
    }

    pub async fn delete(&self, user_id: i32, id: i32) -> CoreResult<()> {
        let notification = self.find_owned(user_id, id).await?;
        notifications::Entity::delete_by_id(notification.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Preferences row for the user, created with everything enabled on
    /// first access
    pub async fn preferences(&self, user_id: i32) -> CoreResult<notification_preferences::Model> {
        let existing = notification_preferences::Entity::find()
            .filter(notification_preferences::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        if let Some(prefs) = existing {
            return Ok(prefs);
        }

        let created = notification_preferences::ActiveModel {
            user_id: Set(user_id),
            todo_due_soon: Set(true),
            todo_due_now: Set(true),
            todo_overdue: Set(true),
            rsvp_accepted: Set(true),
            rsvp_declined: Set(true),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await;

        match created {
            Ok(prefs) => Ok(prefs),
            // Lost a race with another first access
            Err(err) if is_unique_violation(&err) => notification_preferences::Entity::find()
                .filter(notification_preferences::Column::UserId.eq(user_id))
                .one(&self.db)
                .await?
                .ok_or_else(|| CoreError::internal("Notification preferences vanished")),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_preferences(
        &self,
        user_id: i32,
        patch: PreferencesPatch,
    ) -> CoreResult<notification_preferences::Model> {
        let mut active = self.preferences(user_id).await?.into_active_model();
        if let Some(value) = patch.todo_due_soon {
            active.todo_due_soon = Set(value);
        }
        if let Some(value) = patch.todo_due_now {
            active.todo_due_now = Set(value);
        }
        if let Some(value) = patch.todo_overdue {
            active.todo_overdue = Set(value);
        }
        if let Some(value) = patch.rsvp_accepted {
            active.rsvp_accepted = Set(value);
        }
        if let Some(value) = patch.rsvp_declined {
            active.rsvp_declined = Set(value);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }
}

fn due_title(notification_type: NotificationType, todo_title: &str) -> String {
    match notification_type {
        NotificationType::TodoDueSoon => format!("Due soon: {}", todo_title),
        NotificationType::TodoDueNow => format!("Due now: {}", todo_title),
        _ => format!("Overdue: {}", todo_title),
    }
}

fn due_message(notification_type: NotificationType, todo: &todos::Model) -> String {
    let due = match (todo.due_date, todo.due_time) {
        (Some(date), Some(time)) => format!("{} {}", date, time.format("%H:%M")),
        (Some(date), None) => date.to_string(),
        _ => String::new(),
    };
    match notification_type {
        NotificationType::TodoDueSoon => format!("'{}' is due at {}", todo.title, due),
        NotificationType::TodoDueNow => format!("'{}' is due now ({})", todo.title, due),
        _ => format!("'{}' was due {} and is not completed", todo.title, due),
    }
}
