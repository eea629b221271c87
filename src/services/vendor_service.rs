use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    Order, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use crate::common::deserialize_some;
use crate::common::pagination::{apply_ordering, fetch_page, Page, PageParams};
use crate::database::entities::vendors;
use crate::domain::vocab::VendorStatus;
use crate::errors::{CoreError, CoreResult};

use super::validation::ValidationService;

const VENDOR_ORDERING: &[&str] = &["name", "category", "status", "quoted_cents", "created_at"];

#[derive(Debug, Clone, Deserialize)]
pub struct VendorInput {
    pub name: String,
    pub category: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub status: Option<String>,
    pub quoted_cents: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub website: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub quoted_cents: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorFilter {
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Clone)]
pub struct VendorService {
    db: DatabaseConnection,
}

impl VendorService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self, wedding_id: i32, filter: VendorFilter, params: &PageParams) -> CoreResult<Page<vendors::Model>> {
        let mut select = vendors::Entity::find().filter(vendors::Column::WeddingId.eq(wedding_id));
        if let Some(category) = filter.category.as_deref() {
            select = select.filter(vendors::Column::Category.eq(category));
        }
        if let Some(raw) = filter.status.as_deref() {
            let status = ValidationService::parse_choice::<VendorStatus>("status", raw)?;
            select = select.filter(vendors::Column::Status.eq(status.as_str()));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(vendors::Column::Name.contains(search))
                    .add(vendors::Column::ContactName.contains(search))
                    .add(vendors::Column::Notes.contains(search)),
            );
        }

        let select = apply_ordering(
            select,
            filter.ordering.as_deref(),
            VENDOR_ORDERING,
            (vendors::Column::Name, Order::Asc),
            |field| match field {
                "name" => Some(vendors::Column::Name),
                "category" => Some(vendors::Column::Category),
                "status" => Some(vendors::Column::Status),
                "quoted_cents" => Some(vendors::Column::QuotedCents),
                "created_at" => Some(vendors::Column::CreatedAt),
                _ => None,
            },
        )?
        .order_by_asc(vendors::Column::Id);

        fetch_page(select, &self.db, params).await
    }

    pub async fn get(&self, wedding_id: i32, vendor_id: i32) -> CoreResult<vendors::Model> {
        vendors::Entity::find_by_id(vendor_id)
            .filter(vendors::Column::WeddingId.eq(wedding_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Vendor", vendor_id.to_string()))
    }

    pub async fn create(&self, wedding_id: i32, input: VendorInput) -> CoreResult<vendors::Model> {
        let status = match input.status.as_deref() {
            Some(raw) => ValidationService::parse_choice::<VendorStatus>("status", raw)?,
            None => VendorStatus::Researching,
        };
        let now = Utc::now();

        let vendor = vendors::ActiveModel {
            wedding_id: Set(wedding_id),
            name: Set(ValidationService::required_text("name", &input.name, 200)?),
            category: Set(ValidationService::required_text("category", &input.category, 100)?),
            contact_name: Set(ValidationService::optional_text("contact_name", input.contact_name, 200)?),
            email: Set(optional_email(input.email)?),
            phone: Set(ValidationService::optional_text("phone", input.phone, 30)?),
            website: Set(optional_url(input.website)?),
            status: Set(status.as_str().to_string()),
            quoted_cents: Set(optional_cents(input.quoted_cents)?),
            notes: Set(ValidationService::optional_text("notes", input.notes, 2000)?),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(vendor)
    }

    pub async fn update(&self, wedding_id: i32, vendor_id: i32, patch: VendorPatch) -> CoreResult<vendors::Model> {
        let vendor = self.get(wedding_id, vendor_id).await?;
        let mut active = vendor.into_active_model();

        if let Some(name) = patch.name {
            active.name = Set(ValidationService::required_text("name", &name, 200)?);
        }
        if let Some(category) = patch.category {
            active.category = Set(ValidationService::required_text("category", &category, 100)?);
        }
        if let Some(contact_name) = patch.contact_name {
            active.contact_name = Set(ValidationService::optional_text("contact_name", contact_name, 200)?);
        }
        if let Some(email) = patch.email {
            active.email = Set(optional_email(email)?);
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(ValidationService::optional_text("phone", phone, 30)?);
        }
        if let Some(website) = patch.website {
            active.website = Set(optional_url(website)?);
        }
        if let Some(raw) = patch.status.as_deref() {
            let status = ValidationService::parse_choice::<VendorStatus>("status", raw)?;
            active.status = Set(status.as_str().to_string());
        }
        if let Some(quoted) = patch.quoted_cents {
            active.quoted_cents = Set(optional_cents(quoted)?);
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(ValidationService::optional_text("notes", notes, 2000)?);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, wedding_id: i32, vendor_id: i32) -> CoreResult<()> {
        let vendor = self.get(wedding_id, vendor_id).await?;
        vendors::Entity::delete_by_id(vendor.id).exec(&self.db).await?;
        Ok(())
    }
}

fn optional_email(email: Option<String>) -> CoreResult<Option<String>> {
    match email {
        Some(email) if !email.trim().is_empty() => ValidationService::validate_email("email", &email).map(Some),
        _ => Ok(None),
    }
}

fn optional_url(url: Option<String>) -> CoreResult<Option<String>> {
    match url {
        Some(url) if !url.trim().is_empty() => ValidationService::validate_url("website", &url).map(Some),
        _ => Ok(None),
    }
}

fn optional_cents(cents: Option<i64>) -> CoreResult<Option<i64>> {
    cents
        .map(|c| ValidationService::non_negative_cents("quoted_cents", c))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::services::test_support::{create_user, create_wedding};

    fn vendor(name: &str, category: &str, status: Option<&str>) -> VendorInput {
        VendorInput {
            name: name.to_string(),
            category: category.to_string(),
            contact_name: None,
            email: None,
            phone: None,
            website: None,
            status: status.map(str::to_string),
            quoted_cents: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn filters_by_status_and_category() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = VendorService::new(db.clone());

        service.create(wedding.id, vendor("Bloom", "florist", Some("booked"))).await.unwrap();
        service.create(wedding.id, vendor("Petals", "florist", None)).await.unwrap();
        service.create(wedding.id, vendor("Snap", "photography", None)).await.unwrap();

        let florists = service
            .list(
                wedding.id,
                VendorFilter {
                    category: Some("florist".into()),
                    ordering: Some("-name".into()),
                    ..Default::default()
                },
                &PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(florists.count, 2);
        assert_eq!(florists.results[0].name, "Petals");

        let booked = service
            .list(
                wedding.id,
                VendorFilter {
                    status: Some("booked".into()),
                    ..Default::default()
                },
                &PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(booked.results.len(), 1);
        assert_eq!(booked.results[0].name, "Bloom");
    }

    #[tokio::test]
    async fn invalid_values_are_field_errors() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = VendorService::new(db.clone());

        let err = service
            .create(wedding.id, vendor("Bloom", "florist", Some("hired")))
            .await
            .unwrap_err();
        assert!(err.fields().unwrap().contains_key("status"));

        let mut bad_site = vendor("Bloom", "florist", None);
        bad_site.website = Some("bloom.example".into());
        let err = service.create(wedding.id, bad_site).await.unwrap_err();
        assert!(err.fields().unwrap().contains_key("website"));
    }
}
