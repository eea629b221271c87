use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registry_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub wedding_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub price_cents: Option<i64>,
    pub is_claimed: bool,
    pub is_available: bool,
    pub claimed_by_name: Option<String>,
    #[serde(skip_serializing)]
    pub claimed_by_email: Option<String>,
    pub claimed_at: Option<ChronoDateTimeUtc>,
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
}

impl Related<super::weddings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Weddings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
