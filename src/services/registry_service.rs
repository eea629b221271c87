use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::deserialize_some;
use crate::database::entities::{registry_items, weddings};
use crate::errors::{CoreError, CoreResult};

use super::validation::ValidationService;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryItemInput {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub price_cents: Option<i64>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryItemPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub price_cents: Option<Option<i64>>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnclaimRequest {
    pub email: String,
}

/// Registry item as shown to guests; claimant details stay private
#[derive(Debug, Clone, Serialize)]
pub struct PublicRegistryItem {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub price_cents: Option<i64>,
    pub is_claimed: bool,
    pub is_available: bool,
}

impl From<registry_items::Model> for PublicRegistryItem {
    fn from(item: registry_items::Model) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            url: item.url,
            image_url: item.image_url,
            price_cents: item.price_cents,
            is_claimed: item.is_claimed,
            is_available: item.is_available,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicRegistry {
    pub title: String,
    pub currency: String,
    pub items: Vec<PublicRegistryItem>,
}

#[derive(Clone)]
pub struct RegistryService {
    db: DatabaseConnection,
}

impl RegistryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self, wedding_id: i32) -> CoreResult<Vec<registry_items::Model>> {
        Ok(registry_items::Entity::find()
            .filter(registry_items::Column::WeddingId.eq(wedding_id))
            .order_by_asc(registry_items::Column::Name)
            .order_by_asc(registry_items::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get(&self, wedding_id: i32, item_id: i32) -> CoreResult<registry_items::Model> {
        find_item(&self.db, wedding_id, item_id).await
    }

    pub async fn create(&self, wedding_id: i32, input: RegistryItemInput) -> CoreResult<registry_items::Model> {
        let now = Utc::now();
        let item = registry_items::ActiveModel {
            wedding_id: Set(wedding_id),
            name: Set(ValidationService::required_text("name", &input.name, 200)?),
            description: Set(ValidationService::optional_text("description", input.description, 2000)?),
            url: Set(optional_url("url", input.url)?),
            image_url: Set(optional_url("image_url", input.image_url)?),
            price_cents: Set(optional_price(input.price_cents)?),
            is_claimed: Set(false),
            is_available: Set(input.is_available),
            claimed_by_name: Set(None),
            claimed_by_email: Set(None),
            claimed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(item)
    }

    pub async fn update(&self, wedding_id: i32, item_id: i32, patch: RegistryItemPatch) -> CoreResult<registry_items::Model> {
        let item = self.get(wedding_id, item_id).await?;
        let claimed = item.is_claimed;
        let mut active = item.into_active_model();

        if let Some(name) = patch.name {
            active.name = Set(ValidationService::required_text("name", &name, 200)?);
        }
        if let Some(description) = patch.description {
            active.description = Set(ValidationService::optional_text("description", description, 2000)?);
        }
        if let Some(url) = patch.url {
            active.url = Set(optional_url("url", url)?);
        }
        if let Some(image_url) = patch.image_url {
            active.image_url = Set(optional_url("image_url", image_url)?);
        }
        if let Some(price) = patch.price_cents {
            active.price_cents = Set(optional_price(price)?);
        }
        if let Some(available) = patch.is_available {
            if available && claimed {
                return Err(CoreError::field(
                    "is_available",
                    "A claimed item cannot be made available; unclaim it first",
                ));
            }
            active.is_available = Set(available);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, wedding_id: i32, item_id: i32) -> CoreResult<()> {
        let item = self.get(wedding_id, item_id).await?;
        registry_items::Entity::delete_by_id(item.id).exec(&self.db).await?;
        Ok(())
    }

    /// Clear the claim from the couple's side
    pub async fn unclaim(&self, wedding_id: i32, item_id: i32) -> CoreResult<registry_items::Model> {
        let txn = self.db.begin().await?;
        let item = find_item(&txn, wedding_id, item_id).await?;
        let item = release(&txn, item).await?;
        txn.commit().await?;
        Ok(item)
    }

    pub async fn public_list(&self, public_code: &str) -> CoreResult<PublicRegistry> {
        let wedding = find_wedding(&self.db, public_code).await?;
        let items = self.list(wedding.id).await?;
        Ok(PublicRegistry {
            title: wedding.title,
            currency: wedding.currency,
            items: items.into_iter().map(PublicRegistryItem::from).collect(),
        })
    }

    /// Claim an item for a guest.
    ///
    /// The claim is a conditional update on `is_claimed = false AND
    /// is_available = true`, so two guests racing for the same item cannot
    /// both win.
    pub async fn claim(&self, public_code: &str, item_id: i32, request: ClaimRequest) -> CoreResult<PublicRegistryItem> {
        let name = ValidationService::required_text("name", &request.name, 200)?;
        let email = ValidationService::validate_email("email", &request.email)?;

        let txn = self.db.begin().await?;
        let wedding = find_wedding(&txn, public_code).await?;
        let item = find_item(&txn, wedding.id, item_id).await?;

        if item.is_claimed {
            return Err(CoreError::validation(format!("'{}' has already been claimed", item.name)));
        }
        if !item.is_available {
            return Err(CoreError::validation(format!("'{}' is not available", item.name)));
        }

        let now = Utc::now();
        let updated = registry_items::Entity::update_many()
            .col_expr(registry_items::Column::IsClaimed, Expr::value(true))
            .col_expr(registry_items::Column::IsAvailable, Expr::value(false))
            .col_expr(registry_items::Column::ClaimedByName, Expr::value(name))
            .col_expr(registry_items::Column::ClaimedByEmail, Expr::value(email))
            .col_expr(registry_items::Column::ClaimedAt, Expr::value(now))
            .col_expr(registry_items::Column::UpdatedAt, Expr::value(now))
            .filter(registry_items::Column::Id.eq(item.id))
            .filter(registry_items::Column::IsClaimed.eq(false))
            .filter(registry_items::Column::IsAvailable.eq(true))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(CoreError::validation(format!("'{}' has already been claimed", item.name)));
        }

        let item = find_item(&txn, wedding.id, item_id).await?;
        txn.commit().await?;

        info!(wedding_id = wedding.id, item_id, "registry item claimed");
        Ok(item.into())
    }

    /// Release a claim from the public page; the email must match the claimant
    pub async fn public_unclaim(
        &self,
        public_code: &str,
        item_id: i32,
        request: UnclaimRequest,
    ) -> CoreResult<PublicRegistryItem> {
        let email = ValidationService::validate_email("email", &request.email)?;

        let txn = self.db.begin().await?;
        let wedding = find_wedding(&txn, public_code).await?;
        let item = find_item(&txn, wedding.id, item_id).await?;

        if item.claimed_by_email.as_deref() != Some(email.as_str()) {
            return Err(CoreError::forbidden("Only the guest who claimed this item can release it"));
        }

        let item = release(&txn, item).await?;
        txn.commit().await?;
        Ok(item.into())
    }
}

async fn release<C>(db: &C, item: registry_items::Model) -> CoreResult<registry_items::Model>
where
    C: ConnectionTrait,
{
    if !item.is_claimed {
        return Err(CoreError::validation(format!("'{}' is not claimed", item.name)));
    }

    let item_id = item.id;
    let wedding_id = item.wedding_id;
    let mut active = item.into_active_model();
    active.is_claimed = Set(false);
    active.is_available = Set(true);
    active.claimed_by_name = Set(None);
    active.claimed_by_email = Set(None);
    active.claimed_at = Set(None);
    active.updated_at = Set(Utc::now());
    let item = active.update(db).await?;

    info!(wedding_id, item_id, "registry item released");
    Ok(item)
}

async fn find_item<C>(db: &C, wedding_id: i32, item_id: i32) -> CoreResult<registry_items::Model>
where
    C: ConnectionTrait,
{
    registry_items::Entity::find_by_id(item_id)
        .filter(registry_items::Column::WeddingId.eq(wedding_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Registry item", item_id.to_string()))
}

async fn find_wedding<C>(db: &C, public_code: &str) -> CoreResult<weddings::Model>
where
    C: ConnectionTrait,
{
    weddings::Entity::find()
        .filter(weddings::Column::PublicCode.eq(public_code))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Wedding", public_code))
}

fn optional_url(field: &str, url: Option<String>) -> CoreResult<Option<String>> {
    match url {
        Some(url) if !url.trim().is_empty() => ValidationService::validate_url(field, &url).map(Some),
        _ => Ok(None),
    }
}

fn optional_price(cents: Option<i64>) -> CoreResult<Option<i64>> {
    cents
        .map(|c| ValidationService::non_negative_cents("price_cents", c))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::errors::CoreErrorKind;
    use crate::services::test_support::{create_user, create_wedding};

    fn toaster() -> RegistryItemInput {
        RegistryItemInput {
            name: "Toaster".into(),
            description: None,
            url: Some("https://shop.example/toaster".into()),
            image_url: None,
            price_cents: Some(4_999),
            is_available: true,
        }
    }

    fn claim_as(name: &str) -> ClaimRequest {
        ClaimRequest {
            name: name.to_string(),
            email: format!("{}@guests.test", name.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn second_claim_is_rejected() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = RegistryService::new(db.clone());
        let item = service.create(wedding.id, toaster()).await.unwrap();

        let claimed = service
            .claim(&wedding.public_code, item.id, claim_as("Ann"))
            .await
            .unwrap();
        assert!(claimed.is_claimed);
        assert!(!claimed.is_available);

        let err = service
            .claim(&wedding.public_code, item.id, claim_as("Bob"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);

        let stored = service.get(wedding.id, item.id).await.unwrap();
        assert_eq!(stored.claimed_by_name.as_deref(), Some("Ann"));
    }

    #[tokio::test]
    async fn unclaim_restores_availability() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = RegistryService::new(db.clone());
        let item = service.create(wedding.id, toaster()).await.unwrap();
        service
            .claim(&wedding.public_code, item.id, claim_as("Ann"))
            .await
            .unwrap();

        let wrong = service
            .public_unclaim(
                &wedding.public_code,
                item.id,
                UnclaimRequest {
                    email: "bob@guests.test".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(wrong.kind(), CoreErrorKind::Forbidden);

        let released = service
            .public_unclaim(
                &wedding.public_code,
                item.id,
                UnclaimRequest {
                    email: "ANN@guests.test".into(),
                },
            )
            .await
            .unwrap();
        assert!(!released.is_claimed);
        assert!(released.is_available);

        let stored = service.get(wedding.id, item.id).await.unwrap();
        assert!(stored.claimed_by_email.is_none());
        assert!(service.unclaim(wedding.id, item.id).await.is_err());
    }

    #[tokio::test]
    async fn unavailable_items_cannot_be_claimed() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = RegistryService::new(db.clone());
        let mut input = toaster();
        input.is_available = false;
        let item = service.create(wedding.id, input).await.unwrap();

        assert!(service
            .claim(&wedding.public_code, item.id, claim_as("Ann"))
            .await
            .is_err());

        let listing = service.public_list(&wedding.public_code).await.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert!(!listing.items[0].is_available);
        assert!(service.public_list("no-such-code").await.is_err());
    }
}
