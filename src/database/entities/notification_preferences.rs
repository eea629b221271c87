use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::NotificationType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_preferences")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_serializing)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub todo_due_soon: bool,
    pub todo_due_now: bool,
    pub todo_overdue: bool,
    pub rsvp_accepted: bool,
    pub rsvp_declined: bool,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the user wants notifications of this type. General
    /// notifications cannot be switched off.
    pub fn allows(&self, notification_type: NotificationType) -> bool {
        match notification_type {
            NotificationType::TodoDueSoon => self.todo_due_soon,
            NotificationType::TodoDueNow => self.todo_due_now,
            NotificationType::TodoOverdue => self.todo_overdue,
            NotificationType::RsvpAccepted => self.rsvp_accepted,
            NotificationType::RsvpDeclined => self.rsvp_declined,
            NotificationType::General => true,
        }
    }
}
