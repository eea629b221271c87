use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, Order, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::common::pagination::{apply_ordering, fetch_page, Page, PageParams};
use crate::common::{deserialize_some, BulkOutcome};
use crate::database::entities::{guest_children, guests, seating_assignments, weddings};
use crate::domain::attendance::rsvp_notification;
use crate::domain::vocab::GuestSide;
use crate::domain::{AttendanceStatus, AttendeeType};
use crate::errors::{CoreError, CoreResult};

use super::notification_service::notify_rsvp;
use super::validation::ValidationService;

const GUEST_ORDERING: &[&str] = &[
    "first_name",
    "last_name",
    "group_name",
    "attendance_status",
    "created_at",
];

#[derive(Debug, Clone, Deserialize)]
pub struct GuestInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub side: Option<String>,
    pub group_name: Option<String>,
    pub attendance_status: Option<String>,
    #[serde(default)]
    pub plus_one_allowed: bool,
    pub plus_one_name: Option<String>,
    #[serde(default)]
    pub plus_one_attending: bool,
    pub meal_choice: Option<String>,
    pub plus_one_meal_choice: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuestPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub side: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub group_name: Option<Option<String>>,
    pub attendance_status: Option<String>,
    pub plus_one_allowed: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub plus_one_name: Option<Option<String>>,
    pub plus_one_attending: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub meal_choice: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub plus_one_meal_choice: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub dietary_restrictions: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
}

/// An invitation answer, from the couple's side or the public RSVP page
#[derive(Debug, Clone, Deserialize)]
pub struct RsvpRequest {
    pub attendance_status: String,
    pub plus_one_attending: Option<bool>,
    pub plus_one_name: Option<String>,
    pub meal_choice: Option<String>,
    pub plus_one_meal_choice: Option<String>,
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub children: Vec<ChildRsvp>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChildRsvp {
    pub id: i32,
    pub is_attending: bool,
    pub meal_choice: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChildInput {
    pub name: String,
    pub age: Option<i32>,
    pub meal_choice: Option<String>,
    #[serde(default = "default_true")]
    pub is_attending: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChildPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub age: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub meal_choice: Option<Option<String>>,
    pub is_attending: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuestFilter {
    pub attendance_status: Option<String>,
    pub side: Option<String>,
    pub group_name: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestDetail {
    #[serde(flatten)]
    pub guest: guests::Model,
    pub children: Vec<guest_children::Model>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GuestSummary {
    pub total: u64,
    pub attending: u64,
    pub declined: u64,
    pub pending: u64,
    pub plus_ones_attending: u64,
    pub children_attending: u64,
    pub expected_headcount: u64,
    pub invitations_sent: u64,
    pub meal_choices: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicWedding {
    pub title: String,
    pub partner_one_name: Option<String>,
    pub partner_two_name: Option<String>,
    pub wedding_date: Option<NaiveDate>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub rsvp_deadline: Option<NaiveDate>,
}

impl From<&weddings::Model> for PublicWedding {
    fn from(wedding: &weddings::Model) -> Self {
        Self {
            title: wedding.title.clone(),
            partner_one_name: wedding.partner_one_name.clone(),
            partner_two_name: wedding.partner_two_name.clone(),
            wedding_date: wedding.wedding_date,
            venue_name: wedding.venue_name.clone(),
            venue_address: wedding.venue_address.clone(),
            rsvp_deadline: wedding.rsvp_deadline,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicChild {
    pub id: i32,
    pub name: String,
    pub is_attending: bool,
    pub meal_choice: Option<String>,
}

/// What a guest sees on the public RSVP page
#[derive(Debug, Clone, Serialize)]
pub struct PublicInvitation {
    pub first_name: String,
    pub last_name: String,
    pub attendance_status: String,
    pub plus_one_allowed: bool,
    pub plus_one_name: Option<String>,
    pub plus_one_attending: bool,
    pub meal_choice: Option<String>,
    pub plus_one_meal_choice: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub children: Vec<PublicChild>,
    pub wedding: PublicWedding,
    pub rsvp_open: bool,
}

#[derive(Clone)]
pub struct GuestService {
    db: DatabaseConnection,
}

impl GuestService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        wedding_id: i32,
        filter: GuestFilter,
        params: &PageParams,
    ) -> CoreResult<Page<guests::Model>> {
        let mut select = guests::Entity::find().filter(guests::Column::WeddingId.eq(wedding_id));

        if let Some(raw) = filter.attendance_status.as_deref() {
            let status = ValidationService::parse_choice::<AttendanceStatus>("attendance_status", raw)?;
            select = select.filter(guests::Column::AttendanceStatus.eq(status.as_str()));
        }
        if let Some(raw) = filter.side.as_deref() {
            let side = ValidationService::parse_choice::<GuestSide>("side", raw)?;
            select = select.filter(guests::Column::Side.eq(side.as_str()));
        }
        if let Some(group) = filter.group_name.as_deref() {
            select = select.filter(guests::Column::GroupName.eq(group));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(guests::Column::FirstName.contains(search))
                    .add(guests::Column::LastName.contains(search))
                    .add(guests::Column::Email.contains(search)),
            );
        }

        let select = apply_ordering(
            select,
            filter.ordering.as_deref(),
            GUEST_ORDERING,
            (guests::Column::LastName, Order::Asc),
            |field| match field {
                "first_name" => Some(guests::Column::FirstName),
                "last_name" => Some(guests::Column::LastName),
                "group_name" => Some(guests::Column::GroupName),
                "attendance_status" => Some(guests::Column::AttendanceStatus),
                "created_at" => Some(guests::Column::CreatedAt),
                _ => None,
            },
        )?
        .order_by_asc(guests::Column::Id);

        fetch_page(select, &self.db, params).await
    }

    pub async fn find(&self, wedding_id: i32, guest_id: i32) -> CoreResult<guests::Model> {
        find_guest(&self.db, wedding_id, guest_id).await
    }

    pub async fn get(&self, wedding_id: i32, guest_id: i32) -> CoreResult<GuestDetail> {
        let guest = self.find(wedding_id, guest_id).await?;
        let children = children_of(&self.db, guest.id).await?;
        Ok(GuestDetail { guest, children })
    }

    pub async fn create(&self, wedding: &weddings::Model, input: GuestInput) -> CoreResult<guests::Model> {
        let now = Utc::now();
        let status = match input.attendance_status.as_deref() {
            Some(raw) => ValidationService::parse_choice::<AttendanceStatus>("attendance_status", raw)?,
            None => AttendanceStatus::Pending,
        };

        let draft = guests::Model {
            id: 0,
            wedding_id: wedding.id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            side: input.side,
            group_name: input.group_name,
            user_code: Uuid::new_v4().to_string(),
            attendance_status: status.as_str().to_string(),
            plus_one_allowed: input.plus_one_allowed,
            plus_one_name: input.plus_one_name,
            plus_one_attending: input.plus_one_attending,
            meal_choice: input.meal_choice,
            plus_one_meal_choice: input.plus_one_meal_choice,
            dietary_restrictions: input.dietary_restrictions,
            notes: input.notes,
            invitation_sent_at: None,
            last_reminder_at: None,
            rsvp_responded_at: status.has_responded().then_some(now),
            created_at: now,
            updated_at: now,
        };
        let draft = clean_guest(draft)?;

        let guest = guest_columns(draft).insert(&self.db).await?;

        info!(wedding_id = wedding.id, guest_id = guest.id, "created guest");
        Ok(guest)
    }

    pub async fn update(&self, wedding: &weddings::Model, guest_id: i32, patch: GuestPatch) -> CoreResult<guests::Model> {
        let txn = self.db.begin().await?;
        let old = find_guest(&txn, wedding.id, guest_id).await?;

        let mut draft = old.clone();
        if let Some(value) = patch.first_name {
            draft.first_name = value;
        }
        if let Some(value) = patch.last_name {
            draft.last_name = value;
        }
        if let Some(value) = patch.email {
            draft.email = value;
        }
        if let Some(value) = patch.phone {
            draft.phone = value;
        }
        if let Some(value) = patch.side {
            draft.side = value;
        }
        if let Some(value) = patch.group_name {
            draft.group_name = value;
        }
        if let Some(raw) = patch.attendance_status.as_deref() {
            let status = ValidationService::parse_choice::<AttendanceStatus>("attendance_status", raw)?;
            draft.attendance_status = status.as_str().to_string();
        }
        if let Some(value) = patch.plus_one_allowed {
            draft.plus_one_allowed = value;
        }
        if let Some(value) = patch.plus_one_name {
            draft.plus_one_name = value;
        }
        if let Some(value) = patch.plus_one_attending {
            draft.plus_one_attending = value;
        }
        if let Some(value) = patch.meal_choice {
            draft.meal_choice = value;
        }
        if let Some(value) = patch.plus_one_meal_choice {
            draft.plus_one_meal_choice = value;
        }
        if let Some(value) = patch.dietary_restrictions {
            draft.dietary_restrictions = value;
        }
        if let Some(value) = patch.notes {
            draft.notes = value;
        }

        let guest = save_guest(&txn, wedding, &old, draft).await?;
        txn.commit().await?;
        Ok(guest)
    }

    pub async fn delete(&self, wedding_id: i32, guest_id: i32) -> CoreResult<()> {
        let guest = self.find(wedding_id, guest_id).await?;
        guests::Entity::delete_by_id(guest.id).exec(&self.db).await?;
        info!(wedding_id, guest_id, "deleted guest");
        Ok(())
    }

    /// RSVP on behalf of a guest from the couple's side
    pub async fn rsvp(&self, wedding: &weddings::Model, guest_id: i32, request: RsvpRequest) -> CoreResult<guests::Model> {
        let txn = self.db.begin().await?;
        let old = find_guest(&txn, wedding.id, guest_id).await?;
        let guest = apply_rsvp(&txn, wedding, old, request).await?;
        txn.commit().await?;
        Ok(guest)
    }

    pub async fn public_invitation(&self, user_code: &str, today: NaiveDate) -> CoreResult<PublicInvitation> {
        let (guest, wedding) = find_by_code(&self.db, user_code).await?;
        let children = children_of(&self.db, guest.id).await?;

        Ok(PublicInvitation {
            first_name: guest.first_name,
            last_name: guest.last_name,
            attendance_status: guest.attendance_status,
            plus_one_allowed: guest.plus_one_allowed,
            plus_one_name: guest.plus_one_name,
            plus_one_attending: guest.plus_one_attending,
            meal_choice: guest.meal_choice,
            plus_one_meal_choice: guest.plus_one_meal_choice,
            dietary_restrictions: guest.dietary_restrictions,
            children: children
                .into_iter()
                .map(|child| PublicChild {
                    id: child.id,
                    name: child.name,
                    is_attending: child.is_attending,
                    meal_choice: child.meal_choice,
                })
                .collect(),
            rsvp_open: !wedding.rsvp_closed(today),
            wedding: PublicWedding::from(&wedding),
        })
    }

    /// RSVP from the public page, keyed by the guest's invitation code
    pub async fn public_rsvp(&self, user_code: &str, request: RsvpRequest, today: NaiveDate) -> CoreResult<PublicInvitation> {
        let txn = self.db.begin().await?;
        let (old, wedding) = find_by_code(&txn, user_code).await?;
        if wedding.rsvp_closed(today) {
            return Err(CoreError::validation("The RSVP deadline for this wedding has passed"));
        }
        apply_rsvp(&txn, &wedding, old, request).await?;
        txn.commit().await?;

        self.public_invitation(user_code, today).await
    }

    pub async fn add_child(&self, wedding_id: i32, guest_id: i32, input: ChildInput) -> CoreResult<guest_children::Model> {
        let guest = self.find(wedding_id, guest_id).await?;
        let child = guest_children::ActiveModel {
            guest_id: Set(guest.id),
            wedding_id: Set(wedding_id),
            name: Set(ValidationService::required_text("name", &input.name, 100)?),
            age: Set(validate_age(input.age)?),
            meal_choice: Set(ValidationService::optional_text("meal_choice", input.meal_choice, 100)?),
            is_attending: Set(input.is_attending),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(child)
    }

    pub async fn update_child(
        &self,
        wedding_id: i32,
        guest_id: i32,
        child_id: i32,
        patch: ChildPatch,
    ) -> CoreResult<guest_children::Model> {
        let txn = self.db.begin().await?;
        let child = find_child(&txn, wedding_id, guest_id, child_id).await?;
        let mut active = child.into_active_model();

        if let Some(name) = patch.name {
            active.name = Set(ValidationService::required_text("name", &name, 100)?);
        }
        if let Some(age) = patch.age {
            active.age = Set(validate_age(age)?);
        }
        if let Some(meal) = patch.meal_choice {
            active.meal_choice = Set(ValidationService::optional_text("meal_choice", meal, 100)?);
        }
        if let Some(is_attending) = patch.is_attending {
            active.is_attending = Set(is_attending);
            if !is_attending {
                unseat_child(&txn, child_id).await?;
            }
        }

        let child = active.update(&txn).await?;
        txn.commit().await?;
        Ok(child)
    }

    pub async fn delete_child(&self, wedding_id: i32, guest_id: i32, child_id: i32) -> CoreResult<()> {
        let child = find_child(&self.db, wedding_id, guest_id, child_id).await?;
        guest_children::Entity::delete_by_id(child.id).exec(&self.db).await?;
        Ok(())
    }

    /// Stamp `last_reminder_at` on each guest that still owes an answer
    pub async fn send_reminders(&self, wedding_id: i32, guest_ids: &[i32]) -> CoreResult<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        for &guest_id in guest_ids {
            let guest = match find_guest(&self.db, wedding_id, guest_id).await {
                Ok(guest) => guest,
                Err(err) => {
                    outcome.failure(guest_id, err.message());
                    continue;
                }
            };
            if guest.email.is_none() {
                outcome.failure(guest_id, "Guest has no email address");
                continue;
            }
            if guest.attendance().has_responded() {
                outcome.failure(guest_id, "Guest has already responded");
                continue;
            }

            let mut active = guest.into_active_model();
            active.last_reminder_at = Set(Some(Utc::now()));
            match active.update(&self.db).await {
                Ok(_) => outcome.success(guest_id),
                Err(err) => outcome.failure(guest_id, err.to_string()),
            }
        }

        info!(
            wedding_id,
            sent = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "rsvp reminders"
        );
        Ok(outcome)
    }

    /// Stamp `invitation_sent_at` on each guest with an email address
    pub async fn mark_invitations_sent(&self, wedding_id: i32, guest_ids: &[i32]) -> CoreResult<BulkOutcome> {
        let mut outcome = BulkOutcome::default();
        for &guest_id in guest_ids {
            let guest = match find_guest(&self.db, wedding_id, guest_id).await {
                Ok(guest) => guest,
                Err(err) => {
                    outcome.failure(guest_id, err.message());
                    continue;
                }
            };
            if guest.email.is_none() {
                outcome.failure(guest_id, "Guest has no email address");
                continue;
            }

            let mut active = guest.into_active_model();
            active.invitation_sent_at = Set(Some(Utc::now()));
            match active.update(&self.db).await {
                Ok(_) => outcome.success(guest_id),
                Err(err) => outcome.failure(guest_id, err.to_string()),
            }
        }
        Ok(outcome)
    }

    pub async fn summary(&self, wedding_id: i32) -> CoreResult<GuestSummary> {
        let guests = guests::Entity::find()
            .filter(guests::Column::WeddingId.eq(wedding_id))
            .all(&self.db)
            .await?;
        let children = guest_children::Entity::find()
            .filter(guest_children::Column::WeddingId.eq(wedding_id))
            .all(&self.db)
            .await?;

        let mut summary = GuestSummary {
            total: guests.len() as u64,
            ..Default::default()
        };
        let mut attending_ids = Vec::new();

        for guest in &guests {
            if guest.invitation_sent_at.is_some() {
                summary.invitations_sent += 1;
            }
            match guest.attendance() {
                AttendanceStatus::Pending => summary.pending += 1,
                AttendanceStatus::No => summary.declined += 1,
                AttendanceStatus::Yes => {
                    summary.attending += 1;
                    attending_ids.push(guest.id);
                    tally(&mut summary.meal_choices, guest.meal_choice.as_deref());
                    if guest.plus_one_allowed && guest.plus_one_attending {
                        summary.plus_ones_attending += 1;
                        tally(&mut summary.meal_choices, guest.plus_one_meal_choice.as_deref());
                    }
                }
            }
        }

        for child in children
            .iter()
            .filter(|c| c.is_attending && attending_ids.contains(&c.guest_id))
        {
            summary.children_attending += 1;
            tally(&mut summary.meal_choices, child.meal_choice.as_deref());
        }

        summary.expected_headcount =
            summary.attending + summary.plus_ones_attending + summary.children_attending;
        Ok(summary)
    }
}

fn tally(counts: &mut BTreeMap<String, u64>, meal: Option<&str>) {
    let key = meal.unwrap_or("unspecified").to_string();
    *counts.entry(key).or_insert(0) += 1;
}

fn validate_age(age: Option<i32>) -> CoreResult<Option<i32>> {
    match age {
        Some(age) if !(0..=17).contains(&age) => {
            Err(CoreError::field("age", "Child age must be between 0 and 17"))
        }
        other => Ok(other),
    }
}

pub async fn find_guest<C>(db: &C, wedding_id: i32, guest_id: i32) -> CoreResult<guests::Model>
where
    C: ConnectionTrait,
{
    guests::Entity::find_by_id(guest_id)
        .filter(guests::Column::WeddingId.eq(wedding_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Guest", guest_id.to_string()))
}

async fn find_child<C>(db: &C, wedding_id: i32, guest_id: i32, child_id: i32) -> CoreResult<guest_children::Model>
where
    C: ConnectionTrait,
{
    guest_children::Entity::find_by_id(child_id)
        .filter(guest_children::Column::WeddingId.eq(wedding_id))
        .filter(guest_children::Column::GuestId.eq(guest_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Child", child_id.to_string()))
}

async fn children_of<C>(db: &C, guest_id: i32) -> CoreResult<Vec<guest_children::Model>>
where
    C: ConnectionTrait,
{
    Ok(guest_children::Entity::find()
        .filter(guest_children::Column::GuestId.eq(guest_id))
        .order_by_asc(guest_children::Column::Id)
        .all(db)
        .await?)
}

async fn find_by_code<C>(db: &C, user_code: &str) -> CoreResult<(guests::Model, weddings::Model)>
where
    C: ConnectionTrait,
{
    let found = guests::Entity::find()
        .filter(guests::Column::UserCode.eq(user_code))
        .find_also_related(weddings::Entity)
        .one(db)
        .await?;

    match found {
        Some((guest, Some(wedding))) => Ok((guest, wedding)),
        _ => Err(CoreError::not_found("Invitation", user_code)),
    }
}

/// Trim and check a guest row before it is written
fn clean_guest(mut guest: guests::Model) -> CoreResult<guests::Model> {
    guest.first_name = ValidationService::required_text("first_name", &guest.first_name, 100)?;
    guest.last_name = ValidationService::required_text("last_name", &guest.last_name, 100)?;
    guest.email = match guest.email.take() {
        Some(email) if !email.trim().is_empty() => {
            Some(ValidationService::validate_email("email", &email)?)
        }
        _ => None,
    };
    guest.phone = ValidationService::optional_text("phone", guest.phone.take(), 30)?;
    guest.side = match guest.side.take() {
        Some(side) if !side.trim().is_empty() => Some(
            ValidationService::parse_choice::<GuestSide>("side", side.trim())?
                .as_str()
                .to_string(),
        ),
        _ => None,
    };
    guest.group_name = ValidationService::optional_text("group_name", guest.group_name.take(), 100)?;
    guest.plus_one_name = ValidationService::optional_text("plus_one_name", guest.plus_one_name.take(), 100)?;
    guest.meal_choice = ValidationService::optional_text("meal_choice", guest.meal_choice.take(), 100)?;
    guest.plus_one_meal_choice =
        ValidationService::optional_text("plus_one_meal_choice", guest.plus_one_meal_choice.take(), 100)?;
    guest.dietary_restrictions =
        ValidationService::optional_text("dietary_restrictions", guest.dietary_restrictions.take(), 500)?;
    guest.notes = ValidationService::optional_text("notes", guest.notes.take(), 2000)?;

    if !guest.plus_one_allowed {
        if guest.plus_one_attending {
            return Err(CoreError::field(
                "plus_one_attending",
                "This guest is not allowed a plus-one",
            ));
        }
        if guest.plus_one_name.is_some() {
            return Err(CoreError::field(
                "plus_one_name",
                "This guest is not allowed a plus-one",
            ));
        }
    }
    Ok(guest)
}

/// Every column of `guest` as a write; the id is left for the database
fn guest_columns(guest: guests::Model) -> guests::ActiveModel {
    guests::ActiveModel {
        id: ActiveValue::NotSet,
        wedding_id: Set(guest.wedding_id),
        first_name: Set(guest.first_name),
        last_name: Set(guest.last_name),
        email: Set(guest.email),
        phone: Set(guest.phone),
        side: Set(guest.side),
        group_name: Set(guest.group_name),
        user_code: Set(guest.user_code),
        attendance_status: Set(guest.attendance_status),
        plus_one_allowed: Set(guest.plus_one_allowed),
        plus_one_name: Set(guest.plus_one_name),
        plus_one_attending: Set(guest.plus_one_attending),
        meal_choice: Set(guest.meal_choice),
        plus_one_meal_choice: Set(guest.plus_one_meal_choice),
        dietary_restrictions: Set(guest.dietary_restrictions),
        notes: Set(guest.notes),
        invitation_sent_at: Set(guest.invitation_sent_at),
        last_reminder_at: Set(guest.last_reminder_at),
        rsvp_responded_at: Set(guest.rsvp_responded_at),
        created_at: Set(guest.created_at),
        updated_at: Set(guest.updated_at),
    }
}

async fn apply_rsvp<C>(
    db: &C,
    wedding: &weddings::Model,
    old: guests::Model,
    request: RsvpRequest,
) -> CoreResult<guests::Model>
where
    C: ConnectionTrait,
{
    let status =
        ValidationService::parse_choice::<AttendanceStatus>("attendance_status", &request.attendance_status)?;
    if !status.has_responded() {
        return Err(CoreError::field("attendance_status", "Answer yes or no"));
    }

    let mut draft = old.clone();
    draft.attendance_status = status.as_str().to_string();
    if let Some(attending) = request.plus_one_attending {
        draft.plus_one_attending = attending;
    }
    if request.plus_one_name.is_some() {
        draft.plus_one_name = request.plus_one_name;
    }
    if request.meal_choice.is_some() {
        draft.meal_choice = request.meal_choice;
    }
    if request.plus_one_meal_choice.is_some() {
        draft.plus_one_meal_choice = request.plus_one_meal_choice;
    }
    if request.dietary_restrictions.is_some() {
        draft.dietary_restrictions = request.dietary_restrictions;
    }
    if status == AttendanceStatus::No {
        draft.plus_one_attending = false;
    }
    // Answering always counts as a response, even when unchanged
    draft.rsvp_responded_at = Some(Utc::now());

    let guest = save_guest(db, wedding, &old, draft).await?;

    for answer in request.children {
        let child = guest_children::Entity::find_by_id(answer.id)
            .filter(guest_children::Column::GuestId.eq(guest.id))
            .one(db)
            .await?
            .ok_or_else(|| CoreError::field("children", format!("Unknown child {}", answer.id)))?;

        let attending = answer.is_attending && status == AttendanceStatus::Yes;
        let mut active = child.into_active_model();
        active.is_attending = Set(attending);
        if answer.meal_choice.is_some() {
            active.meal_choice = Set(ValidationService::optional_text("meal_choice", answer.meal_choice, 100)?);
        }
        active.update(db).await?;
        if !attending {
            unseat_child(db, answer.id).await?;
        }
    }

    Ok(guest)
}

/// Persist a guest edit, diffing the attendance status against the row as
/// it was read inside the same transaction.
///
/// A change to yes or no stamps `rsvp_responded_at` and notifies the
/// wedding's members. A decline releases the party's seats, and withdrawing
/// the plus-one releases the plus-one's seat.
async fn save_guest<C>(
    db: &C,
    wedding: &weddings::Model,
    old: &guests::Model,
    draft: guests::Model,
) -> CoreResult<guests::Model>
where
    C: ConnectionTrait,
{
    let mut draft = clean_guest(draft)?;
    let previous = old.attendance();
    let next = draft.attendance();
    let now = Utc::now();

    if previous != next && next.has_responded() {
        draft.rsvp_responded_at = Some(now);
    }
    draft.updated_at = now;

    let mut active = guest_columns(draft);
    active.id = ActiveValue::Unchanged(old.id);
    active.wedding_id = ActiveValue::Unchanged(old.wedding_id);
    active.user_code = ActiveValue::Unchanged(old.user_code.clone());
    active.created_at = ActiveValue::Unchanged(old.created_at);
    let guest = active.update(db).await?;

    if next == AttendanceStatus::No {
        let released = seating_assignments::Entity::delete_many()
            .filter(seating_assignments::Column::GuestId.eq(guest.id))
            .exec(db)
            .await?;
        if released.rows_affected > 0 {
            info!(guest_id = guest.id, released = released.rows_affected, "released seats of declined guest");
        }
    } else if plus_one_withdrawn(old, &guest) {
        seating_assignments::Entity::delete_many()
            .filter(seating_assignments::Column::GuestId.eq(guest.id))
            .filter(seating_assignments::Column::AttendeeType.eq(AttendeeType::PlusOne.as_str()))
            .exec(db)
            .await?;
    }

    if let Some(notification_type) = rsvp_notification(previous, next) {
        info!(
            wedding_id = wedding.id,
            guest_id = guest.id,
            from = previous.as_str(),
            to = next.as_str(),
            "rsvp changed"
        );
        notify_rsvp(db, wedding, &guest, notification_type).await?;
    }

    Ok(guest)
}

/// The plus-one lost its invitation or stopped attending in this edit
fn plus_one_withdrawn(old: &guests::Model, new: &guests::Model) -> bool {
    (old.plus_one_allowed && !new.plus_one_allowed)
        || (old.plus_one_attending && !new.plus_one_attending)
}

async fn unseat_child<C>(db: &C, child_id: i32) -> CoreResult<()>
where
    C: ConnectionTrait,
{
    seating_assignments::Entity::delete_many()
        .filter(seating_assignments::Column::ChildId.eq(child_id))
        .exec(db)
        .await?;
    Ok(())
}
