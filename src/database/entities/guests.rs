use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::AttendanceStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub wedding_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub side: Option<String>,
    pub group_name: Option<String>,
    /// Public RSVP key handed out in invitations
    #[sea_orm(unique)]
    pub user_code: String,
    pub attendance_status: String,
    pub plus_one_allowed: bool,
    pub plus_one_name: Option<String>,
    pub plus_one_attending: bool,
    pub meal_choice: Option<String>,
    pub plus_one_meal_choice: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub notes: Option<String>,
    pub invitation_sent_at: Option<ChronoDateTimeUtc>,
    pub last_reminder_at: Option<ChronoDateTimeUtc>,
    pub rsvp_responded_at: Option<ChronoDateTimeUtc>,
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
    #[sea_orm(has_many = "super::guest_children::Entity")]
    Children,
    #[sea_orm(has_many = "super::seating_assignments::Entity")]
    SeatingAssignments,
}

impl Related<super::weddings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Weddings.def()
    }
}

impl Related<super::guest_children::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Children.def()
    }
}

impl Related<super::seating_assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeatingAssignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Stored status; unknown values read as pending
    pub fn attendance(&self) -> AttendanceStatus {
        self.attendance_status
            .parse()
            .unwrap_or(AttendanceStatus::Pending)
    }

    pub fn plus_one_display_name(&self) -> String {
        match &self.plus_one_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("Guest of {}", self.full_name()),
        }
    }
}
