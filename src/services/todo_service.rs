use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, Order, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::pagination::{apply_ordering, fetch_page, Page, PageParams};
use crate::common::{deserialize_some, BulkOutcome};
use crate::database::entities::{
    checklist_items, subtasks, todo_attachments, todo_categories, todos, wedding_members,
};
use crate::domain::progress::{apply_progress, apply_transition, ChildCounts, StatusOutcome};
use crate::domain::vocab::Priority;
use crate::domain::TodoStatus;
use crate::errors::{CoreError, CoreResult};

use super::validation::ValidationService;

const TODO_ORDERING: &[&str] = &[
    "due_date",
    "priority",
    "status",
    "title",
    "progress_percent",
    "created_at",
];

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub color: Option<Option<String>>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoInput {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub progress_percent: Option<i32>,
    pub assigned_to: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub category_id: Option<Option<i32>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_time: Option<Option<NaiveTime>>,
    pub progress_percent: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assigned_to: Option<Option<i32>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoFilter {
    pub status: Option<String>,
    pub category_id: Option<i32>,
    pub priority: Option<String>,
    pub assigned_to: Option<i32>,
    pub due_before: Option<NaiveDate>,
    pub due_after: Option<NaiveDate>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkStatusRequest {
    pub ids: Vec<i32>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChecklistInput {
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecklistPatch {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtaskInput {
    pub title: String,
    pub status: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<NaiveDate>>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodoDetail {
    #[serde(flatten)]
    pub todo: todos::Model,
    pub checklist_items: Vec<checklist_items::Model>,
    pub subtasks: Vec<subtasks::Model>,
    pub attachments: Vec<todo_attachments::Model>,
}

/// A checklist item or subtask together with its parent as recomputed
/// after the write
#[derive(Debug, Clone, Serialize)]
pub struct WithParent<T> {
    pub item: T,
    pub todo: todos::Model,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Timeline {
    pub overdue: Vec<todos::Model>,
    pub this_week: Vec<todos::Model>,
    pub this_month: Vec<todos::Model>,
    pub later: Vec<todos::Model>,
    pub unscheduled: Vec<todos::Model>,
}

#[derive(Clone)]
pub struct TodoService {
    db: DatabaseConnection,
}

impl TodoService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_categories(&self, wedding_id: i32) -> CoreResult<Vec<todo_categories::Model>> {
        Ok(todo_categories::Entity::find()
            .filter(todo_categories::Column::WeddingId.eq(wedding_id))
            .order_by_asc(todo_categories::Column::SortOrder)
            .order_by_asc(todo_categories::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn create_category(&self, wedding_id: i32, input: CategoryInput) -> CoreResult<todo_categories::Model> {
        let color = input.color.as_deref().map(ValidationService::validate_color).transpose()?;
        let category = todo_categories::ActiveModel {
            wedding_id: Set(wedding_id),
            name: Set(ValidationService::required_text("name", &input.name, 100)?),
            color: Set(color),
            sort_order: Set(input.sort_order.unwrap_or(0)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        wedding_id: i32,
        category_id: i32,
        patch: CategoryPatch,
    ) -> CoreResult<todo_categories::Model> {
        let category = find_category(&self.db, wedding_id, category_id).await?;
        let mut active = category.into_active_model();
        if let Some(name) = patch.name {
            active.name = Set(ValidationService::required_text("name", &name, 100)?);
        }
        if let Some(color) = patch.color {
            active.color = Set(color.as_deref().map(ValidationService::validate_color).transpose()?);
        }
        if let Some(sort_order) = patch.sort_order {
            active.sort_order = Set(sort_order);
        }
        Ok(active.update(&self.db).await?)
    }

    /// Todos in the category keep existing with no category
    pub async fn delete_category(&self, wedding_id: i32, category_id: i32) -> CoreResult<()> {
        let category = find_category(&self.db, wedding_id, category_id).await?;
        todo_categories::Entity::delete_by_id(category.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn list(&self, wedding_id: i32, filter: TodoFilter, params: &PageParams) -> CoreResult<Page<todos::Model>> {
        let mut select = todos::Entity::find().filter(todos::Column::WeddingId.eq(wedding_id));

        if let Some(raw) = filter.status.as_deref() {
            let status = ValidationService::parse_choice::<TodoStatus>("status", raw)?;
            select = select.filter(todos::Column::Status.eq(status.as_str()));
        }
        if let Some(raw) = filter.priority.as_deref() {
            let priority = ValidationService::parse_choice::<Priority>("priority", raw)?;
            select = select.filter(todos::Column::Priority.eq(priority.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            select = select.filter(todos::Column::CategoryId.eq(category_id));
        }
        if let Some(user_id) = filter.assigned_to {
            select = select.filter(todos::Column::AssignedTo.eq(user_id));
        }
        if let Some(date) = filter.due_before {
            select = select.filter(todos::Column::DueDate.lte(date));
        }
        if let Some(date) = filter.due_after {
            select = select.filter(todos::Column::DueDate.gte(date));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(todos::Column::Title.contains(search))
                    .add(todos::Column::Description.contains(search)),
            );
        }

        let select = apply_ordering(
            select,
            filter.ordering.as_deref(),
            TODO_ORDERING,
            (todos::Column::DueDate, Order::Asc),
            |field| match field {
                "due_date" => Some(todos::Column::DueDate),
                "priority" => Some(todos::Column::Priority),
                "status" => Some(todos::Column::Status),
                "title" => Some(todos::Column::Title),
                "progress_percent" => Some(todos::Column::ProgressPercent),
                "created_at" => Some(todos::Column::CreatedAt),
                _ => None,
            },
        )?
        .order_by_asc(todos::Column::Id);

        fetch_page(select, &self.db, params).await
    }

    pub async fn find(&self, wedding_id: i32, todo_id: i32) -> CoreResult<todos::Model> {
        find_todo(&self.db, wedding_id, todo_id).await
    }

    pub async fn get(&self, wedding_id: i32, todo_id: i32) -> CoreResult<TodoDetail> {
        let todo = self.find(wedding_id, todo_id).await?;
        let checklist_items = checklist_items::Entity::find()
            .filter(checklist_items::Column::TodoId.eq(todo.id))
            .order_by_asc(checklist_items::Column::SortOrder)
            .order_by_asc(checklist_items::Column::Id)
            .all(&self.db)
            .await?;
        let subtasks = subtasks::Entity::find()
            .filter(subtasks::Column::TodoId.eq(todo.id))
            .order_by_asc(subtasks::Column::SortOrder)
            .order_by_asc(subtasks::Column::Id)
            .all(&self.db)
            .await?;
        let attachments = todo_attachments::Entity::find()
            .filter(todo_attachments::Column::TodoId.eq(todo.id))
            .order_by_asc(todo_attachments::Column::Id)
            .all(&self.db)
            .await?;

        Ok(TodoDetail {
            todo,
            checklist_items,
            subtasks,
            attachments,
        })
    }

    pub async fn create(&self, wedding_id: i32, created_by: i32, input: TodoInput) -> CoreResult<todos::Model> {
        let now = Utc::now();
        let title = ValidationService::required_text("title", &input.title, 200)?;
        let description = ValidationService::optional_text("description", input.description, 5000)?;
        let priority = match input.priority.as_deref() {
            Some(raw) => ValidationService::parse_choice::<Priority>("priority", raw)?,
            None => Priority::Medium,
        };
        let status = match input.status.as_deref() {
            Some(raw) => ValidationService::parse_choice::<TodoStatus>("status", raw)?,
            None => TodoStatus::NotStarted,
        };
        let progress = check_progress(input.progress_percent.unwrap_or(0))?;
        if let Some(category_id) = input.category_id {
            check_category(&self.db, wedding_id, category_id).await?;
        }
        if let Some(user_id) = input.assigned_to {
            check_assignee(&self.db, wedding_id, user_id).await?;
        }

        let outcome = apply_transition(TodoStatus::NotStarted, status, None, progress, false, now)
            .map_err(|msg| CoreError::field("status", msg))?;
        let outcome = if status == TodoStatus::NotStarted {
            apply_progress(status, None, progress, now)
        } else {
            outcome
        };

        let todo = todos::ActiveModel {
            wedding_id: Set(wedding_id),
            category_id: Set(input.category_id),
            title: Set(title),
            description: Set(description),
            status: Set(outcome.status.as_str().to_string()),
            priority: Set(priority.as_str().to_string()),
            due_date: Set(input.due_date),
            due_time: Set(input.due_time),
            progress_percent: Set(outcome.progress_percent),
            assigned_to: Set(input.assigned_to),
            created_by: Set(Some(created_by)),
            completed_at: Set(outcome.completed_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(wedding_id, todo_id = todo.id, status = %todo.status, "created todo");
        Ok(todo)
    }

    /// Apply a partial update.
    ///
    /// An explicit status goes through the transition table. Without one, a
    /// progress value is applied like derived progress: 100 completes, less
    /// than 100 reopens a completed todo. Todos with checklist items or
    /// subtasks ignore incoming progress.
    pub async fn update(&self, wedding_id: i32, todo_id: i32, patch: TodoPatch) -> CoreResult<todos::Model> {
        let txn = self.db.begin().await?;
        let todo = find_todo(&txn, wedding_id, todo_id).await?;
        let counts = child_counts(&txn, todo.id).await?;
        let now = Utc::now();

        let current = StatusOutcome {
            status: todo.status(),
            completed_at: todo.completed_at,
            progress_percent: todo.progress_percent,
        };

        let requested_progress = match patch.progress_percent {
            Some(_) if counts.has_children() => {
                debug!(todo_id, "ignoring progress_percent on a todo with children");
                None
            }
            Some(value) => Some(check_progress(value)?),
            None => None,
        };

        let outcome = match patch.status.as_deref() {
            Some(raw) => {
                let to = ValidationService::parse_choice::<TodoStatus>("status", raw)?;
                apply_transition(
                    current.status,
                    to,
                    current.completed_at,
                    requested_progress.unwrap_or(current.progress_percent),
                    counts.has_children(),
                    now,
                )
                .map_err(|msg| CoreError::field("status", msg))?
            }
            None => match requested_progress {
                Some(progress) => apply_progress(current.status, current.completed_at, progress, now),
                None => current,
            },
        };

        let mut active = todo.clone().into_active_model();
        if let Some(title) = patch.title {
            active.title = Set(ValidationService::required_text("title", &title, 200)?);
        }
        if let Some(description) = patch.description {
            active.description = Set(ValidationService::optional_text("description", description, 5000)?);
        }
        if let Some(category_id) = patch.category_id {
            if let Some(id) = category_id {
                check_category(&txn, wedding_id, id).await?;
            }
            active.category_id = Set(category_id);
        }
        if let Some(raw) = patch.priority.as_deref() {
            let priority = ValidationService::parse_choice::<Priority>("priority", raw)?;
            active.priority = Set(priority.as_str().to_string());
        }
        if let Some(due_date) = patch.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(due_time) = patch.due_time {
            active.due_time = Set(due_time);
        }
        if let Some(assigned_to) = patch.assigned_to {
            if let Some(user_id) = assigned_to {
                check_assignee(&txn, wedding_id, user_id).await?;
            }
            active.assigned_to = Set(assigned_to);
        }
        write_outcome(&mut active, outcome);
        active.updated_at = Set(now);

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        if updated.status != todo.status {
            info!(
                wedding_id,
                todo_id,
                from = %todo.status,
                to = %updated.status,
                "todo status changed"
            );
        }
        Ok(updated)
    }

    pub async fn set_status(&self, wedding_id: i32, todo_id: i32, status: TodoStatus) -> CoreResult<todos::Model> {
        self.update(
            wedding_id,
            todo_id,
            TodoPatch {
                status: Some(status.as_str().to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Move a completed or cancelled todo back to in_progress
    pub async fn reopen(&self, wedding_id: i32, todo_id: i32) -> CoreResult<todos::Model> {
        let todo = self.find(wedding_id, todo_id).await?;
        if todo.status().is_active() {
            return Err(CoreError::field(
                "status",
                format!("Only completed or cancelled todos can be reopened, this one is {}", todo.status),
            ));
        }
        self.set_status(wedding_id, todo_id, TodoStatus::InProgress).await
    }

    /// Set one status on many todos; each todo succeeds or fails on its own
    pub async fn bulk_status(&self, wedding_id: i32, request: BulkStatusRequest) -> CoreResult<BulkOutcome> {
        let status = ValidationService::parse_choice::<TodoStatus>("status", &request.status)?;
        let mut outcome = BulkOutcome::default();

        for todo_id in request.ids {
            match self.set_status(wedding_id, todo_id, status).await {
                Ok(_) => outcome.success(todo_id),
                Err(err) => outcome.failure(todo_id, err.message()),
            }
        }

        info!(
            wedding_id,
            status = status.as_str(),
            updated = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk todo status"
        );
        Ok(outcome)
    }

    pub async fn delete(&self, wedding_id: i32, todo_id: i32) -> CoreResult<()> {
        let todo = self.find(wedding_id, todo_id).await?;
        todos::Entity::delete_by_id(todo.id).exec(&self.db).await?;
        info!(wedding_id, todo_id, "deleted todo");
        Ok(())
    }

    /// Active todos grouped by how soon they are due, relative to `today`
    pub async fn timeline(&self, wedding_id: i32, today: NaiveDate) -> CoreResult<Timeline> {
        let open = todos::Entity::find()
            .filter(todos::Column::WeddingId.eq(wedding_id))
            .filter(
                todos::Column::Status
                    .is_not_in([TodoStatus::Completed.as_str(), TodoStatus::Cancelled.as_str()]),
            )
            .order_by_asc(todos::Column::DueDate)
            .order_by_asc(todos::Column::DueTime)
            .order_by_asc(todos::Column::Id)
            .all(&self.db)
            .await?;

        let week_end = today + Duration::days(7);
        let month_end = today + Duration::days(30);
        let mut timeline = Timeline::default();

        for todo in open {
            match todo.due_date {
                None => timeline.unscheduled.push(todo),
                Some(due) if due < today => timeline.overdue.push(todo),
                Some(due) if due < week_end => timeline.this_week.push(todo),
                Some(due) if due < month_end => timeline.this_month.push(todo),
                Some(_) => timeline.later.push(todo),
            }
        }
        Ok(timeline)
    }

    pub async fn add_checklist_item(
        &self,
        wedding_id: i32,
        todo_id: i32,
        input: ChecklistInput,
    ) -> CoreResult<WithParent<checklist_items::Model>> {
        let txn = self.db.begin().await?;
        let todo = find_todo(&txn, wedding_id, todo_id).await?;
        let now = Utc::now();

        let sort_order = match input.sort_order {
            Some(order) => order,
            None => next_checklist_order(&txn, todo.id).await?,
        };
        let item = checklist_items::ActiveModel {
            todo_id: Set(todo.id),
            title: Set(ValidationService::required_text("title", &input.title, 200)?),
            is_completed: Set(input.is_completed),
            completed_at: Set(input.is_completed.then_some(now)),
            sort_order: Set(sort_order),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let todo = recompute_progress(&txn, todo).await?;
        txn.commit().await?;
        Ok(WithParent { item, todo })
    }

    pub async fn update_checklist_item(
        &self,
        wedding_id: i32,
        todo_id: i32,
        item_id: i32,
        patch: ChecklistPatch,
    ) -> CoreResult<WithParent<checklist_items::Model>> {
        let txn = self.db.begin().await?;
        let todo = find_todo(&txn, wedding_id, todo_id).await?;
        let item = find_checklist_item(&txn, todo.id, item_id).await?;
        let was_completed = item.is_completed;
        let mut active = item.into_active_model();

        if let Some(title) = patch.title {
            active.title = Set(ValidationService::required_text("title", &title, 200)?);
        }
        let mut completion_changed = false;
        if let Some(done) = patch.is_completed {
            active.is_completed = Set(done);
            if done != was_completed {
                active.completed_at = Set(done.then(Utc::now));
                completion_changed = true;
            }
        }
        if let Some(sort_order) = patch.sort_order {
            active.sort_order = Set(sort_order);
        }

        let item = active.update(&txn).await?;
        let todo = if completion_changed {
            recompute_progress(&txn, todo).await?
        } else {
            todo
        };
        txn.commit().await?;
        Ok(WithParent { item, todo })
    }

    pub async fn delete_checklist_item(&self, wedding_id: i32, todo_id: i32, item_id: i32) -> CoreResult<todos::Model> {
        let txn = self.db.begin().await?;
        let todo = find_todo(&txn, wedding_id, todo_id).await?;
        let item = find_checklist_item(&txn, todo.id, item_id).await?;
        checklist_items::Entity::delete_by_id(item.id).exec(&txn).await?;
        let todo = recompute_progress(&txn, todo).await?;
        txn.commit().await?;
        Ok(todo)
    }

    pub async fn add_subtask(
        &self,
        wedding_id: i32,
        todo_id: i32,
        input: SubtaskInput,
    ) -> CoreResult<WithParent<subtasks::Model>> {
        let txn = self.db.begin().await?;
        let todo = find_todo(&txn, wedding_id, todo_id).await?;
        let now = Utc::now();

        let status = match input.status.as_deref() {
            Some(raw) => ValidationService::parse_choice::<TodoStatus>("status", raw)?,
            None => TodoStatus::NotStarted,
        };
        let sort_order = match input.sort_order {
            Some(order) => order,
            None => next_subtask_order(&txn, todo.id).await?,
        };

        let item = subtasks::ActiveModel {
            todo_id: Set(todo.id),
            title: Set(ValidationService::required_text("title", &input.title, 200)?),
            status: Set(status.as_str().to_string()),
            due_date: Set(input.due_date),
            completed_at: Set((status == TodoStatus::Completed).then_some(now)),
            sort_order: Set(sort_order),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let todo = recompute_progress(&txn, todo).await?;
        txn.commit().await?;
        Ok(WithParent { item, todo })
    }

    /// Subtask statuses follow the same transition table as todos
    pub async fn update_subtask(
        &self,
        wedding_id: i32,
        todo_id: i32,
        subtask_id: i32,
        patch: SubtaskPatch,
    ) -> CoreResult<WithParent<subtasks::Model>> {
        let txn = self.db.begin().await?;
        let todo = find_todo(&txn, wedding_id, todo_id).await?;
        let subtask = find_subtask(&txn, todo.id, subtask_id).await?;
        let from: TodoStatus = subtask.status.parse().unwrap_or(TodoStatus::NotStarted);
        let mut active = subtask.into_active_model();
        let now = Utc::now();
        let mut status_changed = false;

        if let Some(title) = patch.title {
            active.title = Set(ValidationService::required_text("title", &title, 200)?);
        }
        if let Some(raw) = patch.status.as_deref() {
            let to = ValidationService::parse_choice::<TodoStatus>("status", raw)?;
            if !from.can_transition_to(to) {
                return Err(CoreError::field(
                    "status",
                    format!("Cannot change status from {} to {}", from.as_str(), to.as_str()),
                ));
            }
            if to != from {
                active.status = Set(to.as_str().to_string());
                active.completed_at = Set((to == TodoStatus::Completed).then_some(now));
                status_changed = true;
            }
        }
        if let Some(due_date) = patch.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(sort_order) = patch.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.updated_at = Set(now);

        let item = active.update(&txn).await?;
        let todo = if status_changed {
            recompute_progress(&txn, todo).await?
        } else {
            todo
        };
        txn.commit().await?;
        Ok(WithParent { item, todo })
    }

    pub async fn delete_subtask(&self, wedding_id: i32, todo_id: i32, subtask_id: i32) -> CoreResult<todos::Model> {
        let txn = self.db.begin().await?;
        let todo = find_todo(&txn, wedding_id, todo_id).await?;
        let subtask = find_subtask(&txn, todo.id, subtask_id).await?;
        subtasks::Entity::delete_by_id(subtask.id).exec(&txn).await?;
        let todo = recompute_progress(&txn, todo).await?;
        txn.commit().await?;
        Ok(todo)
    }
}

fn check_progress(value: i32) -> CoreResult<i32> {
    if !(0..=100).contains(&value) {
        return Err(CoreError::field(
            "progress_percent",
            "Progress must be between 0 and 100",
        ));
    }
    Ok(value)
}

fn write_outcome(active: &mut todos::ActiveModel, outcome: StatusOutcome) {
    active.status = Set(outcome.status.as_str().to_string());
    active.completed_at = Set(outcome.completed_at);
    active.progress_percent = Set(outcome.progress_percent);
}

pub async fn find_todo<C>(db: &C, wedding_id: i32, todo_id: i32) -> CoreResult<todos::Model>
where
    C: ConnectionTrait,
{
    todos::Entity::find_by_id(todo_id)
        .filter(todos::Column::WeddingId.eq(wedding_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Todo", todo_id.to_string()))
}

async fn find_category<C>(db: &C, wedding_id: i32, category_id: i32) -> CoreResult<todo_categories::Model>
where
    C: ConnectionTrait,
{
    todo_categories::Entity::find_by_id(category_id)
        .filter(todo_categories::Column::WeddingId.eq(wedding_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Category", category_id.to_string()))
}

async fn check_category<C>(db: &C, wedding_id: i32, category_id: i32) -> CoreResult<()>
where
    C: ConnectionTrait,
{
    find_category(db, wedding_id, category_id)
        .await
        .map(|_| ())
        .map_err(|_| CoreError::field("category_id", format!("Category {} not found", category_id)))
}

async fn check_assignee<C>(db: &C, wedding_id: i32, user_id: i32) -> CoreResult<()>
where
    C: ConnectionTrait,
{
    let member = wedding_members::Entity::find()
        .filter(wedding_members::Column::WeddingId.eq(wedding_id))
        .filter(wedding_members::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    if member == 0 {
        return Err(CoreError::field(
            "assigned_to",
            "Todos can only be assigned to members of the wedding",
        ));
    }
    Ok(())
}

async fn find_checklist_item<C>(db: &C, todo_id: i32, item_id: i32) -> CoreResult<checklist_items::Model>
where
    C: ConnectionTrait,
{
    checklist_items::Entity::find_by_id(item_id)
        .filter(checklist_items::Column::TodoId.eq(todo_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Checklist item", item_id.to_string()))
}

async fn find_subtask<C>(db: &C, todo_id: i32, subtask_id: i32) -> CoreResult<subtasks::Model>
where
    C: ConnectionTrait,
{
    subtasks::Entity::find_by_id(subtask_id)
        .filter(subtasks::Column::TodoId.eq(todo_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Subtask", subtask_id.to_string()))
}

async fn next_checklist_order<C>(db: &C, todo_id: i32) -> CoreResult<i32>
where
    C: ConnectionTrait,
{
    let count = checklist_items::Entity::find()
        .filter(checklist_items::Column::TodoId.eq(todo_id))
        .count(db)
        .await?;
    Ok(count as i32)
}

async fn next_subtask_order<C>(db: &C, todo_id: i32) -> CoreResult<i32>
where
    C: ConnectionTrait,
{
    let count = subtasks::Entity::find()
        .filter(subtasks::Column::TodoId.eq(todo_id))
        .count(db)
        .await?;
    Ok(count as i32)
}

/// Completion counts of a todo's checklist items and non-cancelled subtasks
pub async fn child_counts<C>(db: &C, todo_id: i32) -> CoreResult<ChildCounts>
where
    C: ConnectionTrait,
{
    let checklist_total = checklist_items::Entity::find()
        .filter(checklist_items::Column::TodoId.eq(todo_id))
        .count(db)
        .await?;
    let checklist_completed = checklist_items::Entity::find()
        .filter(checklist_items::Column::TodoId.eq(todo_id))
        .filter(checklist_items::Column::IsCompleted.eq(true))
        .count(db)
        .await?;
    let subtasks_total = subtasks::Entity::find()
        .filter(subtasks::Column::TodoId.eq(todo_id))
        .filter(subtasks::Column::Status.ne(TodoStatus::Cancelled.as_str()))
        .count(db)
        .await?;
    let subtasks_completed = subtasks::Entity::find()
        .filter(subtasks::Column::TodoId.eq(todo_id))
        .filter(subtasks::Column::Status.eq(TodoStatus::Completed.as_str()))
        .count(db)
        .await?;

    Ok(ChildCounts {
        checklist_total,
        checklist_completed,
        subtasks_total,
        subtasks_completed,
    })
}

/// Re-derive a todo's progress from its children and persist any change.
/// Runs when a child is added or deleted or its completion state changes.
/// A todo left without children keeps its last progress.
async fn recompute_progress<C>(db: &C, todo: todos::Model) -> CoreResult<todos::Model>
where
    C: ConnectionTrait,
{
    let counts = child_counts(db, todo.id).await?;
    let Some(percent) = counts.percent() else {
        return Ok(todo);
    };

    let now: DateTime<Utc> = Utc::now();
    let outcome = apply_progress(todo.status(), todo.completed_at, percent, now);
    if outcome.status == todo.status()
        && outcome.progress_percent == todo.progress_percent
        && outcome.completed_at == todo.completed_at
    {
        return Ok(todo);
    }

    let previous = todo.status.clone();
    let todo_id = todo.id;
    let mut active = todo.into_active_model();
    write_outcome(&mut active, outcome);
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    debug!(
        todo_id,
        progress = updated.progress_percent,
        from = %previous,
        to = %updated.status,
        "recomputed todo progress"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::services::test_support::{create_todo, create_user, create_wedding};

    fn item(title: &str) -> ChecklistInput {
        ChecklistInput {
            title: title.to_string(),
            is_completed: false,
            sort_order: None,
        }
    }

    fn done() -> ChecklistPatch {
        ChecklistPatch {
            is_completed: Some(true),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn checklist_drives_progress_and_completion() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let todo = create_todo(&db, wedding.id, "Book venue", None, None).await;
        let service = TodoService::new(db.clone());

        let mut ids = Vec::new();
        for title in ["Shortlist", "Visit", "Sign"] {
            ids.push(service.add_checklist_item(wedding.id, todo.id, item(title)).await.unwrap().item.id);
        }

        let step = service
            .update_checklist_item(wedding.id, todo.id, ids[0], done())
            .await
            .unwrap();
        assert_eq!(step.todo.progress_percent, 33);
        assert_eq!(step.todo.status, "not_started");

        service
            .update_checklist_item(wedding.id, todo.id, ids[1], done())
            .await
            .unwrap();
        let last = service
            .update_checklist_item(wedding.id, todo.id, ids[2], done())
            .await
            .unwrap();
        assert_eq!(last.todo.progress_percent, 100);
        assert_eq!(last.todo.status, "completed");
        assert!(last.todo.completed_at.is_some());

        // Adding an open item drops progress and reopens
        let reopened = service
            .add_checklist_item(wedding.id, todo.id, item("Pay deposit"))
            .await
            .unwrap();
        assert_eq!(reopened.todo.progress_percent, 75);
        assert_eq!(reopened.todo.status, "in_progress");
        assert!(reopened.todo.completed_at.is_none());
    }

    #[tokio::test]
    async fn cancelled_subtasks_do_not_count() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let todo = create_todo(&db, wedding.id, "Music", None, None).await;
        let service = TodoService::new(db.clone());

        service.add_checklist_item(wedding.id, todo.id, item("Playlist")).await.unwrap();
        let subtask = service
            .add_subtask(
                wedding.id,
                todo.id,
                SubtaskInput {
                    title: "Book DJ".into(),
                    status: Some("completed".into()),
                    due_date: None,
                    sort_order: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(subtask.todo.progress_percent, 50);

        let cancelled = service
            .add_subtask(
                wedding.id,
                todo.id,
                SubtaskInput {
                    title: "Band".into(),
                    status: Some("cancelled".into()),
                    due_date: None,
                    sort_order: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(cancelled.todo.progress_percent, 50);
    }

    #[tokio::test]
    async fn transitions_follow_the_table() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let todo = create_todo(&db, wedding.id, "Cake", None, None).await;
        let service = TodoService::new(db.clone());

        let completed = service
            .set_status(wedding.id, todo.id, TodoStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.progress_percent, 100);
        assert!(completed.completed_at.is_some());

        let err = service
            .set_status(wedding.id, todo.id, TodoStatus::Waiting)
            .await
            .unwrap_err();
        assert!(err.message().contains("completed"));
        assert!(err.message().contains("waiting"));

        let reopened = service.reopen(wedding.id, todo.id).await.unwrap();
        assert_eq!(reopened.status, "in_progress");
        assert!(reopened.completed_at.is_none());
        assert_eq!(reopened.progress_percent, 100);

        assert!(service.reopen(wedding.id, todo.id).await.is_err());

        let restarted = service
            .set_status(wedding.id, todo.id, TodoStatus::NotStarted)
            .await
            .unwrap();
        assert_eq!(restarted.progress_percent, 0);
    }

    #[tokio::test]
    async fn restart_with_children_keeps_derived_progress() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let todo = create_todo(&db, wedding.id, "Invitations", None, None).await;
        let service = TodoService::new(db.clone());

        for title in ["Design", "Print"] {
            let added = service.add_checklist_item(wedding.id, todo.id, item(title)).await.unwrap();
            service
                .update_checklist_item(wedding.id, todo.id, added.item.id, done())
                .await
                .unwrap();
        }
        assert_eq!(service.find(wedding.id, todo.id).await.unwrap().status, "completed");

        let restarted = service
            .set_status(wedding.id, todo.id, TodoStatus::NotStarted)
            .await
            .unwrap();
        let derived = child_counts(&db, todo.id).await.unwrap().percent();
        assert_eq!(restarted.status, "not_started");
        assert!(restarted.completed_at.is_none());
        assert_eq!(Some(restarted.progress_percent), derived);
        assert_eq!(restarted.progress_percent, 100);
    }

    #[tokio::test]
    async fn renaming_children_does_not_undo_a_reopen() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let todo = create_todo(&db, wedding.id, "Seating plan", None, None).await;
        let service = TodoService::new(db.clone());

        let checklist = service.add_checklist_item(wedding.id, todo.id, item("Draft")).await.unwrap();
        service
            .update_checklist_item(wedding.id, todo.id, checklist.item.id, done())
            .await
            .unwrap();
        let subtask = service
            .add_subtask(
                wedding.id,
                todo.id,
                SubtaskInput {
                    title: "Confirm with venue".into(),
                    status: Some("completed".into()),
                    due_date: None,
                    sort_order: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(subtask.todo.status, "completed");

        let reopened = service.reopen(wedding.id, todo.id).await.unwrap();
        assert_eq!(reopened.status, "in_progress");

        let renamed = service
            .update_checklist_item(
                wedding.id,
                todo.id,
                checklist.item.id,
                ChecklistPatch {
                    title: Some("Final draft".into()),
                    sort_order: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.item.title, "Final draft");
        assert_eq!(renamed.todo.status, "in_progress");
        assert!(renamed.todo.completed_at.is_none());

        let retitled = service
            .update_subtask(
                wedding.id,
                todo.id,
                subtask.item.id,
                SubtaskPatch {
                    title: Some("Confirm layout with venue".into()),
                    status: Some("completed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(retitled.todo.status, "in_progress");
        assert_eq!(retitled.todo.progress_percent, 100);
    }

    #[tokio::test]
    async fn manual_progress_only_without_children() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let plain = create_todo(&db, wedding.id, "Rings", None, None).await;
        let service = TodoService::new(db.clone());

        let full = service
            .update(
                wedding.id,
                plain.id,
                TodoPatch {
                    progress_percent: Some(100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(full.status, "completed");

        let with_children = create_todo(&db, wedding.id, "Flowers", None, None).await;
        service
            .add_checklist_item(wedding.id, with_children.id, item("Pick"))
            .await
            .unwrap();
        let ignored = service
            .update(
                wedding.id,
                with_children.id,
                TodoPatch {
                    progress_percent: Some(90),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(ignored.progress_percent, 0);

        assert!(service
            .update(
                wedding.id,
                plain.id,
                TodoPatch {
                    progress_percent: Some(101),
                    ..Default::default()
                },
            )
            .await
            .is_err());
    }

    #[tokio::test]
    async fn bulk_status_reports_each_todo() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = TodoService::new(db.clone());
        let open = create_todo(&db, wedding.id, "Invites", None, None).await;
        let done = create_todo(&db, wedding.id, "Dress", None, None).await;
        service.set_status(wedding.id, done.id, TodoStatus::Completed).await.unwrap();

        let outcome = service
            .bulk_status(
                wedding.id,
                BulkStatusRequest {
                    ids: vec![open.id, done.id, 4242],
                    status: "waiting".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, vec![open.id]);
        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(service.find(wedding.id, open.id).await.unwrap().status, "waiting");
    }

    #[tokio::test]
    async fn timeline_buckets_by_due_date() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let today = NaiveDate::from_ymd_opt(2027, 3, 1).unwrap();
        let days = |n: i64| Some(today + Duration::days(n));

        create_todo(&db, wedding.id, "late", days(-1), None).await;
        create_todo(&db, wedding.id, "soon", days(3), None).await;
        create_todo(&db, wedding.id, "month", days(20), None).await;
        create_todo(&db, wedding.id, "far", days(90), None).await;
        create_todo(&db, wedding.id, "whenever", None, None).await;
        let finished = create_todo(&db, wedding.id, "finished", days(-5), None).await;
        let service = TodoService::new(db.clone());
        service
            .set_status(wedding.id, finished.id, TodoStatus::Completed)
            .await
            .unwrap();

        let timeline = service.timeline(wedding.id, today).await.unwrap();
        assert_eq!(timeline.overdue.len(), 1);
        assert_eq!(timeline.overdue[0].title, "late");
        assert_eq!(timeline.this_week[0].title, "soon");
        assert_eq!(timeline.this_month[0].title, "month");
        assert_eq!(timeline.later[0].title, "far");
        assert_eq!(timeline.unscheduled[0].title, "whenever");
    }

    #[tokio::test]
    async fn list_filters_by_status_and_search() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = TodoService::new(db.clone());
        let a = create_todo(&db, wedding.id, "Order flowers", None, None).await;
        create_todo(&db, wedding.id, "Hire photographer", None, None).await;
        service.set_status(wedding.id, a.id, TodoStatus::InProgress).await.unwrap();

        let page = service
            .list(
                wedding.id,
                TodoFilter {
                    status: Some("in_progress".into()),
                    ..Default::default()
                },
                &PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.count, 1);

        let page = service
            .list(
                wedding.id,
                TodoFilter {
                    search: Some("photo".into()),
                    ordering: Some("-title".into()),
                    ..Default::default()
                },
                &PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.results[0].title, "Hire photographer");
    }

    #[tokio::test]
    async fn assignee_must_be_member() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let stranger = create_user(&db, "stranger").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = TodoService::new(db.clone());

        let err = service
            .create(
                wedding.id,
                owner.id,
                TodoInput {
                    title: "Seating".into(),
                    assigned_to: Some(stranger.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.fields().unwrap().contains_key("assigned_to"));

        let todo = service
            .create(
                wedding.id,
                owner.id,
                TodoInput {
                    title: "Seating".into(),
                    assigned_to: Some(owner.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(todo.created_by, Some(owner.id));
    }
}
