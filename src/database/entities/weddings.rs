use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tenant root: nearly every other row hangs off a wedding
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weddings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub owner_id: i32,
    pub title: String,
    pub partner_one_name: Option<String>,
    pub partner_two_name: Option<String>,
    pub wedding_date: Option<ChronoDate>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub rsvp_deadline: Option<ChronoDate>,
    pub currency: String,
    pub total_budget_cents: i64,
    #[sea_orm(unique)]
    pub public_code: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(has_many = "super::wedding_members::Entity")]
    Members,
    #[sea_orm(has_many = "super::guests::Entity")]
    Guests,
    #[sea_orm(has_many = "super::seating_tables::Entity")]
    Tables,
    #[sea_orm(has_many = "super::todos::Entity")]
    Todos,
}

impl Related<super::wedding_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::guests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guests.def()
    }
}

impl Related<super::seating_tables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tables.def()
    }
}

impl Related<super::todos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Todos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// RSVP deadline has passed (the deadline day itself is still open)
    pub fn rsvp_closed(&self, today: chrono::NaiveDate) -> bool {
        self.rsvp_deadline.map(|d| today > d).unwrap_or(false)
    }
}
