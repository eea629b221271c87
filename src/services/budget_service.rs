use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::common::deserialize_some;
use crate::database::entities::{budget_categories, expenses, vendors, weddings};
use crate::errors::{CoreError, CoreResult};

use super::validation::ValidationService;

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetCategoryInput {
    pub name: String,
    #[serde(default)]
    pub allocated_cents: i64,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetCategoryPatch {
    pub name: Option<String>,
    pub allocated_cents: Option<i64>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    pub category_id: Option<i32>,
    pub vendor_id: Option<i32>,
    pub description: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub paid_cents: i64,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpensePatch {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub category_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub vendor_id: Option<Option<i32>>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub paid_cents: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseFilter {
    pub category_id: Option<i32>,
    pub vendor_id: Option<i32>,
    pub unpaid: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategorySummary {
    pub category_id: Option<i32>,
    pub name: String,
    pub allocated_cents: i64,
    pub spent_cents: i64,
    pub paid_cents: i64,
    pub remaining_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub currency: String,
    pub total_budget_cents: i64,
    pub allocated_cents: i64,
    pub unallocated_cents: i64,
    pub spent_cents: i64,
    pub paid_cents: i64,
    pub outstanding_cents: i64,
    pub remaining_cents: i64,
    pub categories: Vec<CategorySummary>,
}

#[derive(Clone)]
pub struct BudgetService {
    db: DatabaseConnection,
}

impl BudgetService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_categories(&self, wedding_id: i32) -> CoreResult<Vec<budget_categories::Model>> {
        Ok(budget_categories::Entity::find()
            .filter(budget_categories::Column::WeddingId.eq(wedding_id))
            .order_by_asc(budget_categories::Column::SortOrder)
            .order_by_asc(budget_categories::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn create_category(&self, wedding_id: i32, input: BudgetCategoryInput) -> CoreResult<budget_categories::Model> {
        let now = Utc::now();
        let category = budget_categories::ActiveModel {
            wedding_id: Set(wedding_id),
            name: Set(ValidationService::required_text("name", &input.name, 100)?),
            allocated_cents: Set(ValidationService::non_negative_cents(
                "allocated_cents",
                input.allocated_cents,
            )?),
            sort_order: Set(input.sort_order.unwrap_or(0)),
            created_at: Set(now),
            updated_at: Set(now),
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
        patch: BudgetCategoryPatch,
    ) -> CoreResult<budget_categories::Model> {
        let category = find_category(&self.db, wedding_id, category_id).await?;
        let mut active = category.into_active_model();
        if let Some(name) = patch.name {
            active.name = Set(ValidationService::required_text("name", &name, 100)?);
        }
        if let Some(cents) = patch.allocated_cents {
            active.allocated_cents = Set(ValidationService::non_negative_cents("allocated_cents", cents)?);
        }
        if let Some(sort_order) = patch.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    /// Expenses in the category are kept uncategorised
    pub async fn delete_category(&self, wedding_id: i32, category_id: i32) -> CoreResult<()> {
        let category = find_category(&self.db, wedding_id, category_id).await?;
        budget_categories::Entity::delete_by_id(category.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn list_expenses(&self, wedding_id: i32, filter: ExpenseFilter) -> CoreResult<Vec<expenses::Model>> {
        let mut select = expenses::Entity::find().filter(expenses::Column::WeddingId.eq(wedding_id));
        if let Some(category_id) = filter.category_id {
            select = select.filter(expenses::Column::CategoryId.eq(category_id));
        }
        if let Some(vendor_id) = filter.vendor_id {
            select = select.filter(expenses::Column::VendorId.eq(vendor_id));
        }

        let mut rows = select
            .order_by_asc(expenses::Column::DueDate)
            .order_by_asc(expenses::Column::Id)
            .all(&self.db)
            .await?;
        if let Some(unpaid) = filter.unpaid {
            rows.retain(|e| (e.paid_cents < e.amount_cents) == unpaid);
        }
        Ok(rows)
    }

    pub async fn get_expense(&self, wedding_id: i32, expense_id: i32) -> CoreResult<expenses::Model> {
        find_expense(&self.db, wedding_id, expense_id).await
    }

    pub async fn create_expense(&self, wedding_id: i32, input: ExpenseInput) -> CoreResult<expenses::Model> {
        let amount = ValidationService::non_negative_cents("amount_cents", input.amount_cents)?;
        let paid = check_paid(amount, input.paid_cents)?;
        if let Some(category_id) = input.category_id {
            check_category(&self.db, wedding_id, category_id).await?;
        }
        if let Some(vendor_id) = input.vendor_id {
            check_vendor(&self.db, wedding_id, vendor_id).await?;
        }

        let now = Utc::now();
        let expense = expenses::ActiveModel {
            wedding_id: Set(wedding_id),
            category_id: Set(input.category_id),
            vendor_id: Set(input.vendor_id),
            description: Set(ValidationService::required_text("description", &input.description, 200)?),
            amount_cents: Set(amount),
            paid_cents: Set(paid),
            due_date: Set(input.due_date),
            notes: Set(ValidationService::optional_text("notes", input.notes, 2000)?),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(expense)
    }

    pub async fn update_expense(&self, wedding_id: i32, expense_id: i32, patch: ExpensePatch) -> CoreResult<expenses::Model> {
        let expense = find_expense(&self.db, wedding_id, expense_id).await?;
        let amount = match patch.amount_cents {
            Some(cents) => ValidationService::non_negative_cents("amount_cents", cents)?,
            None => expense.amount_cents,
        };
        let paid = check_paid(amount, patch.paid_cents.unwrap_or(expense.paid_cents))?;

        let mut active = expense.into_active_model();
        if let Some(category_id) = patch.category_id {
            if let Some(id) = category_id {
                check_category(&self.db, wedding_id, id).await?;
            }
            active.category_id = Set(category_id);
        }
        if let Some(vendor_id) = patch.vendor_id {
            if let Some(id) = vendor_id {
                check_vendor(&self.db, wedding_id, id).await?;
            }
            active.vendor_id = Set(vendor_id);
        }
        if let Some(description) = patch.description {
            active.description = Set(ValidationService::required_text("description", &description, 200)?);
        }
        if let Some(due_date) = patch.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(ValidationService::optional_text("notes", notes, 2000)?);
        }
        active.amount_cents = Set(amount);
        active.paid_cents = Set(paid);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    pub async fn delete_expense(&self, wedding_id: i32, expense_id: i32) -> CoreResult<()> {
        let expense = find_expense(&self.db, wedding_id, expense_id).await?;
        expenses::Entity::delete_by_id(expense.id).exec(&self.db).await?;
        Ok(())
    }

    /// Allocation and spending per category and for the whole wedding.
    /// Uncategorised expenses are reported under a category without id.
    pub async fn summary(&self, wedding: &weddings::Model) -> CoreResult<BudgetSummary> {
        let categories = self.list_categories(wedding.id).await?;
        let expenses = self.list_expenses(wedding.id, ExpenseFilter::default()).await?;

        let mut spent: HashMap<Option<i32>, (i64, i64)> = HashMap::new();
        for expense in &expenses {
            let entry = spent.entry(expense.category_id).or_insert((0, 0));
            entry.0 += expense.amount_cents;
            entry.1 += expense.paid_cents;
        }

        let mut rows: Vec<CategorySummary> = categories
            .iter()
            .map(|category| {
                let (spent_cents, paid_cents) = spent.get(&Some(category.id)).copied().unwrap_or((0, 0));
                CategorySummary {
                    category_id: Some(category.id),
                    name: category.name.clone(),
                    allocated_cents: category.allocated_cents,
                    spent_cents,
                    paid_cents,
                    remaining_cents: category.allocated_cents - spent_cents,
                }
            })
            .collect();
        if let Some(&(spent_cents, paid_cents)) = spent.get(&None) {
            rows.push(CategorySummary {
                category_id: None,
                name: "Uncategorized".to_string(),
                allocated_cents: 0,
                spent_cents,
                paid_cents,
                remaining_cents: -spent_cents,
            });
        }

        let allocated_cents: i64 = categories.iter().map(|c| c.allocated_cents).sum();
        let spent_cents: i64 = expenses.iter().map(|e| e.amount_cents).sum();
        let paid_cents: i64 = expenses.iter().map(|e| e.paid_cents).sum();

        Ok(BudgetSummary {
            currency: wedding.currency.clone(),
            total_budget_cents: wedding.total_budget_cents,
            allocated_cents,
            unallocated_cents: wedding.total_budget_cents - allocated_cents,
            spent_cents,
            paid_cents,
            outstanding_cents: spent_cents - paid_cents,
            remaining_cents: wedding.total_budget_cents - spent_cents,
            categories: rows,
        })
    }
}

fn check_paid(amount: i64, paid: i64) -> CoreResult<i64> {
    let paid = ValidationService::non_negative_cents("paid_cents", paid)?;
    if paid > amount {
        return Err(CoreError::field(
            "paid_cents",
            "Paid amount cannot exceed the expense amount",
        ));
    }
    Ok(paid)
}

async fn find_category<C>(db: &C, wedding_id: i32, category_id: i32) -> CoreResult<budget_categories::Model>
where
    C: ConnectionTrait,
{
    budget_categories::Entity::find_by_id(category_id)
        .filter(budget_categories::Column::WeddingId.eq(wedding_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Budget category", category_id.to_string()))
}

async fn find_expense<C>(db: &C, wedding_id: i32, expense_id: i32) -> CoreResult<expenses::Model>
where
    C: ConnectionTrait,
{
    expenses::Entity::find_by_id(expense_id)
        .filter(expenses::Column::WeddingId.eq(wedding_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Expense", expense_id.to_string()))
}

async fn check_category<C>(db: &C, wedding_id: i32, category_id: i32) -> CoreResult<()>
where
    C: ConnectionTrait,
{
    find_category(db, wedding_id, category_id)
        .await
        .map(|_| ())
        .map_err(|_| CoreError::field("category_id", format!("Budget category {} not found", category_id)))
}

async fn check_vendor<C>(db: &C, wedding_id: i32, vendor_id: i32) -> CoreResult<()>
where
    C: ConnectionTrait,
{
    let found = vendors::Entity::find_by_id(vendor_id)
        .filter(vendors::Column::WeddingId.eq(wedding_id))
        .one(db)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(CoreError::field("vendor_id", format!("Vendor {} not found", vendor_id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::services::test_support::{create_user, create_wedding};

    fn expense(category_id: Option<i32>, amount: i64, paid: i64) -> ExpenseInput {
        ExpenseInput {
            category_id,
            vendor_id: None,
            description: "Deposit".into(),
            amount_cents: amount,
            paid_cents: paid,
            due_date: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn summary_totals_per_category() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let mut active = wedding.clone().into_active_model();
        active.total_budget_cents = Set(2_000_000);
        let wedding = active.update(&db).await.unwrap();
        let service = BudgetService::new(db.clone());

        let venue = service
            .create_category(
                wedding.id,
                BudgetCategoryInput {
                    name: "Venue".into(),
                    allocated_cents: 1_000_000,
                    sort_order: None,
                },
            )
            .await
            .unwrap();
        service.create_expense(wedding.id, expense(Some(venue.id), 600_000, 200_000)).await.unwrap();
        service.create_expense(wedding.id, expense(None, 50_000, 50_000)).await.unwrap();

        let summary = service.summary(&wedding).await.unwrap();
        assert_eq!(summary.allocated_cents, 1_000_000);
        assert_eq!(summary.unallocated_cents, 1_000_000);
        assert_eq!(summary.spent_cents, 650_000);
        assert_eq!(summary.paid_cents, 250_000);
        assert_eq!(summary.outstanding_cents, 400_000);
        assert_eq!(summary.remaining_cents, 1_350_000);
        assert_eq!(summary.categories[0].remaining_cents, 400_000);
        assert_eq!(summary.categories[1].category_id, None);
    }

    #[tokio::test]
    async fn paid_cannot_exceed_amount() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = BudgetService::new(db.clone());

        assert!(service.create_expense(wedding.id, expense(None, 100, 101)).await.is_err());
        assert!(service.create_expense(wedding.id, expense(None, -1, 0)).await.is_err());

        let created = service.create_expense(wedding.id, expense(None, 100, 100)).await.unwrap();
        let err = service
            .update_expense(
                wedding.id,
                created.id,
                ExpensePatch {
                    amount_cents: Some(50),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.fields().unwrap().contains_key("paid_cents"));
    }

    #[tokio::test]
    async fn categories_from_other_weddings_are_rejected() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let mine = create_wedding(&db, owner.id).await;
        let other = create_wedding(&db, owner.id).await;
        let service = BudgetService::new(db.clone());
        let foreign = service
            .create_category(
                other.id,
                BudgetCategoryInput {
                    name: "Catering".into(),
                    allocated_cents: 0,
                    sort_order: None,
                },
            )
            .await
            .unwrap();

        let err = service
            .create_expense(mine.id, expense(Some(foreign.id), 10, 0))
            .await
            .unwrap_err();
        assert!(err.fields().unwrap().contains_key("category_id"));
    }
}
