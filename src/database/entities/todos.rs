use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::TodoStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "todos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub wedding_id: i32,
    pub category_id: Option<i32>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub due_date: Option<ChronoDate>,
    pub due_time: Option<ChronoTime>,
    pub progress_percent: i32,
    pub assigned_to: Option<i32>,
    pub created_by: Option<i32>,
    pub completed_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::weddings::Entity",
        from = "Column::WeddingId",
        to = "super::weddings::Column::Id",
        on_delete = "Cascade"
    )]
    Weddings,
    #[sea_orm(
        belongs_to = "super::todo_categories::Entity",
        from = "Column::CategoryId",
        to = "super::todo_categories::Column::Id",
        on_delete = "SetNull"
    )]
    Categories,
    #[sea_orm(has_many = "super::checklist_items::Entity")]
    ChecklistItems,
    #[sea_orm(has_many = "super::subtasks::Entity")]
    Subtasks,
    #[sea_orm(has_many = "super::todo_attachments::Entity")]
    Attachments,
}

impl Related<super::weddings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Weddings.def()
    }
}

impl Related<super::todo_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::checklist_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChecklistItems.def()
    }
}

impl Related<super::subtasks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subtasks.def()
    }
}

impl Related<super::todo_attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Stored status; unknown values read as not_started
    pub fn status(&self) -> TodoStatus {
        self.status.parse().unwrap_or(TodoStatus::NotStarted)
    }
}
