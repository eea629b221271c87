use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One seated attendee. Uniqueness of the attendee and of the seat is
/// enforced by partial indexes created in the seating migration.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seating_assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub wedding_id: i32,
    pub table_id: i32,
    pub guest_id: i32,
    pub attendee_type: String,
    pub child_id: Option<i32>,
    pub seat_number: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::seating_tables::Entity",
        from = "Column::TableId",
        to = "super::seating_tables::Column::Id",
        on_delete = "Cascade"
    )]
    Tables,
    #[sea_orm(
        belongs_to = "super::guests::Entity",
        from = "Column::GuestId",
        to = "super::guests::Column::Id",
        on_delete = "Cascade"
    )]
    Guests,
    #[sea_orm(
        belongs_to = "super::guest_children::Entity",
        from = "Column::ChildId",
        to = "super::guest_children::Column::Id",
        on_delete = "Cascade"
    )]
    Children,
}

impl Related<super::seating_tables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tables.def()
    }
}

impl Related<super::guests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guests.def()
    }
}

impl Related<super::guest_children::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Children.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
