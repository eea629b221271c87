use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::common::deserialize_some;
use crate::database::entities::{users, wedding_members, weddings};
use crate::errors::{CoreError, CoreResult};

use super::authorization::{WeddingAccess, WeddingRole};
use super::validation::ValidationService;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWeddingRequest {
    pub title: String,
    pub partner_one_name: Option<String>,
    pub partner_two_name: Option<String>,
    pub wedding_date: Option<NaiveDate>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub rsvp_deadline: Option<NaiveDate>,
    pub currency: Option<String>,
    #[serde(default)]
    pub total_budget_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWeddingRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub partner_one_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub partner_two_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub wedding_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub venue_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub venue_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub rsvp_deadline: Option<Option<NaiveDate>>,
    pub currency: Option<String>,
    pub total_budget_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeddingWithRole {
    #[serde(flatten)]
    pub wedding: weddings::Model,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberInfo {
    pub user_id: i32,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub joined_at: chrono::DateTime<Utc>,
}

#[derive(Clone)]
pub struct WeddingService {
    db: DatabaseConnection,
}

impl WeddingService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_for_user(&self, user_id: i32) -> CoreResult<Vec<WeddingWithRole>> {
        let rows = wedding_members::Entity::find()
            .filter(wedding_members::Column::UserId.eq(user_id))
            .find_also_related(weddings::Entity)
            .order_by_asc(wedding_members::Column::WeddingId)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(member, wedding)| {
                wedding.map(|wedding| WeddingWithRole {
                    wedding,
                    role: member.role,
                })
            })
            .collect())
    }

    /// Create a wedding and make the creator its owner
    pub async fn create(&self, owner_id: i32, request: CreateWeddingRequest) -> CoreResult<weddings::Model> {
        let title = ValidationService::required_text("title", &request.title, 200)?;
        let currency = normalise_currency(request.currency.as_deref().unwrap_or("USD"))?;
        let total_budget_cents =
            ValidationService::non_negative_cents("total_budget_cents", request.total_budget_cents)?;
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let wedding = weddings::ActiveModel {
            owner_id: Set(owner_id),
            title: Set(title),
            partner_one_name: Set(ValidationService::optional_text(
                "partner_one_name",
                request.partner_one_name,
                100,
            )?),
            partner_two_name: Set(ValidationService::optional_text(
                "partner_two_name",
                request.partner_two_name,
                100,
            )?),
            wedding_date: Set(request.wedding_date),
            venue_name: Set(ValidationService::optional_text("venue_name", request.venue_name, 200)?),
            venue_address: Set(ValidationService::optional_text(
                "venue_address",
                request.venue_address,
                500,
            )?),
            rsvp_deadline: Set(request.rsvp_deadline),
            currency: Set(currency),
            total_budget_cents: Set(total_budget_cents),
            public_code: Set(Uuid::new_v4().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        wedding_members::ActiveModel {
            wedding_id: Set(wedding.id),
            user_id: Set(owner_id),
            role: Set(WeddingRole::Owner.as_str().to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(wedding_id = wedding.id, owner_id, "created wedding");
        Ok(wedding)
    }

    pub async fn update(&self, access: &WeddingAccess, request: UpdateWeddingRequest) -> CoreResult<weddings::Model> {
        let mut active = access.wedding.clone().into_active_model();

        if let Some(title) = request.title {
            active.title = Set(ValidationService::required_text("title", &title, 200)?);
        }
        if let Some(name) = request.partner_one_name {
            active.partner_one_name = Set(ValidationService::optional_text("partner_one_name", name, 100)?);
        }
        if let Some(name) = request.partner_two_name {
            active.partner_two_name = Set(ValidationService::optional_text("partner_two_name", name, 100)?);
        }
        if let Some(date) = request.wedding_date {
            active.wedding_date = Set(date);
        }
        if let Some(venue) = request.venue_name {
            active.venue_name = Set(ValidationService::optional_text("venue_name", venue, 200)?);
        }
        if let Some(address) = request.venue_address {
            active.venue_address = Set(ValidationService::optional_text("venue_address", address, 500)?);
        }
        if let Some(deadline) = request.rsvp_deadline {
            active.rsvp_deadline = Set(deadline);
        }
        if let Some(currency) = request.currency {
            active.currency = Set(normalise_currency(&currency)?);
        }
        if let Some(cents) = request.total_budget_cents {
            active.total_budget_cents = Set(ValidationService::non_negative_cents("total_budget_cents", cents)?);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, access: WeddingAccess) -> CoreResult<()> {
        let wedding_id = access.wedding.id;
        access.wedding.delete(&self.db).await?;
        info!(wedding_id, "deleted wedding");
        Ok(())
    }

    pub async fn regenerate_public_code(&self, access: &WeddingAccess) -> CoreResult<weddings::Model> {
        let mut active = access.wedding.clone().into_active_model();
        active.public_code = Set(Uuid::new_v4().to_string());
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    pub async fn find_by_public_code(&self, code: &str) -> CoreResult<weddings::Model> {
        weddings::Entity::find()
            .filter(weddings::Column::PublicCode.eq(code))
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Wedding", code))
    }

    pub async fn list_members(&self, wedding_id: i32) -> CoreResult<Vec<MemberInfo>> {
        let rows = wedding_members::Entity::find()
            .filter(wedding_members::Column::WeddingId.eq(wedding_id))
            .find_also_related(users::Entity)
            .order_by_asc(wedding_members::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(member, user)| {
                user.map(|user| MemberInfo {
                    user_id: user.id,
                    email: user.email,
                    username: user.username,
                    display_name: user.display_name,
                    role: member.role,
                    joined_at: member.created_at,
                })
            })
            .collect())
    }

    /// Add an existing account to the wedding as planner or viewer
    pub async fn add_member(&self, wedding_id: i32, email: &str, role: &str) -> CoreResult<MemberInfo> {
        let email = ValidationService::validate_email("email", email)?;
        let role = ValidationService::parse_choice::<WeddingRole>("role", role)?;
        if role == WeddingRole::Owner {
            return Err(CoreError::field("role", "A wedding has exactly one owner"));
        }

        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::field("email", "No account with this email"))?;

        let existing = wedding_members::Entity::find()
            .filter(wedding_members::Column::WeddingId.eq(wedding_id))
            .filter(wedding_members::Column::UserId.eq(user.id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(CoreError::conflict("User is already a member of this wedding"));
        }

        let member = wedding_members::ActiveModel {
            wedding_id: Set(wedding_id),
            user_id: Set(user.id),
            role: Set(role.as_str().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(wedding_id, user_id = user.id, role = role.as_str(), "added wedding member");
        Ok(MemberInfo {
            user_id: user.id,
            email: user.email,
            username: user.username,
            display_name: user.display_name,
            role: member.role,
            joined_at: member.created_at,
        })
    }

    pub async fn remove_member(&self, access: &WeddingAccess, user_id: i32) -> CoreResult<()> {
        if user_id == access.wedding.owner_id {
            return Err(CoreError::validation("The owner cannot be removed from a wedding"));
        }

        let result = wedding_members::Entity::delete_many()
            .filter(wedding_members::Column::WeddingId.eq(access.wedding.id))
            .filter(wedding_members::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CoreError::not_found("Member", user_id.to_string()));
        }
        Ok(())
    }
}

fn normalise_currency(code: &str) -> CoreResult<String> {
    let code = code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::field("currency", "Currency must be a 3-letter ISO code"));
    }
    Ok(code)
}
