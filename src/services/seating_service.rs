use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::db_errors::is_unique_violation;
use crate::common::deserialize_some;
use crate::database::entities::{guest_children, guests, seating_assignments, seating_tables};
use crate::domain::seating::{check_capacity, check_seat_number, check_table_capacity};
use crate::domain::{AttendanceStatus, AttendeeType};
use crate::errors::{CoreError, CoreResult};

use super::guest_service::find_guest;
use super::validation::ValidationService;

#[derive(Debug, Clone, Deserialize)]
pub struct TableInput {
    pub name: String,
    pub table_number: Option<i32>,
    pub capacity: i32,
    pub shape: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TablePatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub table_number: Option<Option<i32>>,
    pub capacity: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub shape: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRequest {
    pub table_id: i32,
    pub guest_id: i32,
    #[serde(default = "default_attendee_type")]
    pub attendee_type: String,
    pub child_id: Option<i32>,
    pub seat_number: Option<i32>,
}

fn default_attendee_type() -> String {
    AttendeeType::Guest.as_str().to_string()
}

/// Move an assignment to another table and/or seat
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoveRequest {
    pub table_id: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub seat_number: Option<Option<i32>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableWithCounts {
    #[serde(flatten)]
    pub table: seating_tables::Model,
    pub seats_taken: u64,
    pub seats_available: u64,
}

impl TableWithCounts {
    fn new(table: seating_tables::Model, seats_taken: u64) -> Self {
        let seats_available = (table.capacity.max(0) as u64).saturating_sub(seats_taken);
        Self {
            table,
            seats_taken,
            seats_available,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Occupant {
    pub assignment_id: i32,
    pub guest_id: i32,
    pub attendee_type: String,
    pub child_id: Option<i32>,
    pub seat_number: Option<i32>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartTable {
    #[serde(flatten)]
    pub table: TableWithCounts,
    pub occupants: Vec<Occupant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnassignedAttendee {
    pub guest_id: i32,
    pub attendee_type: String,
    pub child_id: Option<i32>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatingChart {
    pub tables: Vec<ChartTable>,
    pub unassigned: Vec<UnassignedAttendee>,
    pub total_capacity: u64,
    pub total_seated: u64,
}

#[derive(Clone)]
pub struct SeatingService {
    db: DatabaseConnection,
}

impl SeatingService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_tables(&self, wedding_id: i32) -> CoreResult<Vec<TableWithCounts>> {
        let tables = seating_tables::Entity::find()
            .filter(seating_tables::Column::WeddingId.eq(wedding_id))
            .order_by_asc(seating_tables::Column::TableNumber)
            .order_by_asc(seating_tables::Column::Name)
            .all(&self.db)
            .await?;

        let counts = seat_counts(&self.db, wedding_id).await?;
        Ok(tables
            .into_iter()
            .map(|table| {
                let taken = counts.get(&table.id).copied().unwrap_or(0);
                TableWithCounts::new(table, taken)
            })
            .collect())
    }

    pub async fn get_table(&self, wedding_id: i32, table_id: i32) -> CoreResult<TableWithCounts> {
        let table = find_table(&self.db, wedding_id, table_id).await?;
        let taken = seats_taken(&self.db, table.id).await?;
        Ok(TableWithCounts::new(table, taken))
    }

    pub async fn create_table(&self, wedding_id: i32, input: TableInput) -> CoreResult<TableWithCounts> {
        check_table_capacity(input.capacity).map_err(|msg| CoreError::field("capacity", msg))?;
        let now = Utc::now();

        let table = seating_tables::ActiveModel {
            wedding_id: Set(wedding_id),
            name: Set(ValidationService::required_text("name", &input.name, 100)?),
            table_number: Set(input.table_number),
            capacity: Set(input.capacity),
            shape: Set(ValidationService::optional_text("shape", input.shape, 30)?),
            notes: Set(ValidationService::optional_text("notes", input.notes, 1000)?),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(wedding_id, table_id = table.id, capacity = table.capacity, "created table");
        Ok(TableWithCounts::new(table, 0))
    }

    /// Edit a table. Capacity may not drop below the seats already taken or
    /// below the highest numbered seat in use.
    pub async fn update_table(&self, wedding_id: i32, table_id: i32, patch: TablePatch) -> CoreResult<TableWithCounts> {
        let txn = self.db.begin().await?;
        let table = find_table(&txn, wedding_id, table_id).await?;
        let taken = seats_taken(&txn, table.id).await?;
        let name = table.name.clone();
        let mut active = table.into_active_model();

        if let Some(value) = patch.name {
            active.name = Set(ValidationService::required_text("name", &value, 100)?);
        }
        if let Some(value) = patch.table_number {
            active.table_number = Set(value);
        }
        if let Some(capacity) = patch.capacity {
            check_table_capacity(capacity).map_err(|msg| CoreError::field("capacity", msg))?;
            if (capacity as u64) < taken {
                return Err(CoreError::field(
                    "capacity",
                    format!(
                        "Table '{}' already seats {} attendees; capacity cannot be reduced to {}",
                        name, taken, capacity
                    ),
                ));
            }
            let highest_seat = seating_assignments::Entity::find()
                .filter(seating_assignments::Column::TableId.eq(table_id))
                .filter(seating_assignments::Column::SeatNumber.gt(capacity))
                .count(&txn)
                .await?;
            if highest_seat > 0 {
                return Err(CoreError::field(
                    "capacity",
                    format!("Table '{}' has numbered seats above {}", name, capacity),
                ));
            }
            active.capacity = Set(capacity);
        }
        if let Some(value) = patch.shape {
            active.shape = Set(ValidationService::optional_text("shape", value, 30)?);
        }
        if let Some(value) = patch.notes {
            active.notes = Set(ValidationService::optional_text("notes", value, 1000)?);
        }
        active.updated_at = Set(Utc::now());

        let table = active.update(&txn).await?;
        txn.commit().await?;
        Ok(TableWithCounts::new(table, taken))
    }

    pub async fn delete_table(&self, wedding_id: i32, table_id: i32) -> CoreResult<()> {
        let table = find_table(&self.db, wedding_id, table_id).await?;
        seating_tables::Entity::delete_by_id(table.id).exec(&self.db).await?;
        info!(wedding_id, table_id, "deleted table");
        Ok(())
    }

    pub async fn list_assignments(&self, wedding_id: i32, table_id: Option<i32>) -> CoreResult<Vec<seating_assignments::Model>> {
        let mut select = seating_assignments::Entity::find()
            .filter(seating_assignments::Column::WeddingId.eq(wedding_id));
        if let Some(table_id) = table_id {
            select = select.filter(seating_assignments::Column::TableId.eq(table_id));
        }
        Ok(select
            .order_by_asc(seating_assignments::Column::TableId)
            .order_by_asc(seating_assignments::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Seat one attendee.
    ///
    /// The transaction takes the write lock on the table before anything is
    /// read, so concurrent assignments to one table run one after another
    /// and the loser sees the full table. The partial unique indexes reject
    /// duplicate attendees and seats.
    pub async fn assign(&self, wedding_id: i32, request: AssignRequest) -> CoreResult<seating_assignments::Model> {
        let attendee_type =
            ValidationService::parse_choice::<AttendeeType>("attendee_type", &request.attendee_type)?;

        let txn = self.db.begin().await?;
        lock_table(&txn, wedding_id, request.table_id).await?;
        let table = find_table(&txn, wedding_id, request.table_id).await?;
        let guest = find_guest(&txn, wedding_id, request.guest_id)
            .await
            .map_err(|_| CoreError::field("guest_id", format!("Guest {} not found", request.guest_id)))?;

        let child_id = check_attendee(&txn, &guest, attendee_type, request.child_id).await?;

        let existing = find_attendee_seat(&txn, guest.id, attendee_type, child_id).await?;
        if let Some(existing) = existing {
            let at = seating_tables::Entity::find_by_id(existing.table_id)
                .one(&txn)
                .await?
                .map(|t| t.name)
                .unwrap_or_default();
            return Err(CoreError::validation(format!(
                "This {} is already seated at table '{}'",
                attendee_type.as_str().replace('_', "-"),
                at
            )));
        }

        let taken = seats_taken(&txn, table.id).await?;
        check_capacity(&table.name, table.capacity, taken).map_err(|msg| CoreError::field("table_id", msg))?;

        if let Some(seat) = request.seat_number {
            check_seat(&txn, &table, seat, None).await?;
        }

        let inserted = seating_assignments::ActiveModel {
            wedding_id: Set(wedding_id),
            table_id: Set(table.id),
            guest_id: Set(guest.id),
            attendee_type: Set(attendee_type.as_str().to_string()),
            child_id: Set(child_id),
            seat_number: Set(request.seat_number),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(seat_conflict)?;

        txn.commit().await?;

        info!(
            wedding_id,
            table_id = table.id,
            guest_id = guest.id,
            attendee_type = attendee_type.as_str(),
            seats_taken = taken + 1,
            "seated attendee"
        );
        Ok(inserted)
    }

    pub async fn move_assignment(
        &self,
        wedding_id: i32,
        assignment_id: i32,
        request: MoveRequest,
    ) -> CoreResult<seating_assignments::Model> {
        let txn = self.db.begin().await?;
        if let Some(table_id) = request.table_id {
            lock_table(&txn, wedding_id, table_id).await?;
        }
        let assignment = find_assignment(&txn, wedding_id, assignment_id).await?;

        let target_id = request.table_id.unwrap_or(assignment.table_id);
        let target = find_table(&txn, wedding_id, target_id).await?;
        let changing_table = target.id != assignment.table_id;

        if changing_table {
            let taken = seats_taken(&txn, target.id).await?;
            check_capacity(&target.name, target.capacity, taken)
                .map_err(|msg| CoreError::field("table_id", msg))?;
        }

        let seat_number = match request.seat_number {
            Some(seat) => seat,
            // A seat number only means something at the table it was picked for
            None if changing_table => None,
            None => assignment.seat_number,
        };
        if let Some(seat) = seat_number {
            check_seat(&txn, &target, seat, Some(assignment.id)).await?;
        }

        let mut active = assignment.into_active_model();
        active.table_id = Set(target.id);
        active.seat_number = Set(seat_number);
        let moved = active.update(&txn).await.map_err(seat_conflict)?;
        txn.commit().await?;

        debug!(wedding_id, assignment_id, table_id = target.id, "moved assignment");
        Ok(moved)
    }

    pub async fn unassign(&self, wedding_id: i32, assignment_id: i32) -> CoreResult<()> {
        let assignment = find_assignment(&self.db, wedding_id, assignment_id).await?;
        seating_assignments::Entity::delete_by_id(assignment.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Every table with its occupants, plus the attendees still without a seat.
    ///
    /// Pending and attending guests count as attendees; declined guests and
    /// their party do not.
    pub async fn chart(&self, wedding_id: i32) -> CoreResult<SeatingChart> {
        let tables = self.list_tables(wedding_id).await?;
        let assignments = self.list_assignments(wedding_id, None).await?;
        let guests = guests::Entity::find()
            .filter(guests::Column::WeddingId.eq(wedding_id))
            .order_by_asc(guests::Column::LastName)
            .order_by_asc(guests::Column::FirstName)
            .all(&self.db)
            .await?;
        let children = guest_children::Entity::find()
            .filter(guest_children::Column::WeddingId.eq(wedding_id))
            .order_by_asc(guest_children::Column::Id)
            .all(&self.db)
            .await?;

        let guests_by_id: HashMap<i32, &guests::Model> = guests.iter().map(|g| (g.id, g)).collect();
        let children_by_id: HashMap<i32, &guest_children::Model> =
            children.iter().map(|c| (c.id, c)).collect();

        let mut seated: HashSet<(i32, AttendeeType, Option<i32>)> = HashSet::new();
        let mut occupants: HashMap<i32, Vec<Occupant>> = HashMap::new();
        for assignment in &assignments {
            let Ok(kind) = assignment.attendee_type.parse::<AttendeeType>() else {
                continue;
            };
            seated.insert((assignment.guest_id, kind, assignment.child_id));

            let name = match (kind, guests_by_id.get(&assignment.guest_id)) {
                (AttendeeType::Child, _) => assignment
                    .child_id
                    .and_then(|id| children_by_id.get(&id))
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
                (AttendeeType::PlusOne, Some(guest)) => guest.plus_one_display_name(),
                (AttendeeType::Guest, Some(guest)) => guest.full_name(),
                (_, None) => String::new(),
            };

            occupants.entry(assignment.table_id).or_default().push(Occupant {
                assignment_id: assignment.id,
                guest_id: assignment.guest_id,
                attendee_type: assignment.attendee_type.clone(),
                child_id: assignment.child_id,
                seat_number: assignment.seat_number,
                name,
            });
        }

        let mut unassigned = Vec::new();
        for guest in guests.iter().filter(|g| g.attendance() != AttendanceStatus::No) {
            if !seated.contains(&(guest.id, AttendeeType::Guest, None)) {
                unassigned.push(UnassignedAttendee {
                    guest_id: guest.id,
                    attendee_type: AttendeeType::Guest.as_str().to_string(),
                    child_id: None,
                    name: guest.full_name(),
                });
            }
            if guest.plus_one_allowed
                && guest.plus_one_attending
                && !seated.contains(&(guest.id, AttendeeType::PlusOne, None))
            {
                unassigned.push(UnassignedAttendee {
                    guest_id: guest.id,
                    attendee_type: AttendeeType::PlusOne.as_str().to_string(),
                    child_id: None,
                    name: guest.plus_one_display_name(),
                });
            }
            for child in children
                .iter()
                .filter(|c| c.guest_id == guest.id && c.is_attending)
            {
                if !seated.contains(&(guest.id, AttendeeType::Child, Some(child.id))) {
                    unassigned.push(UnassignedAttendee {
                        guest_id: guest.id,
                        attendee_type: AttendeeType::Child.as_str().to_string(),
                        child_id: Some(child.id),
                        name: child.name.clone(),
                    });
                }
            }
        }

        let total_capacity = tables.iter().map(|t| t.table.capacity.max(0) as u64).sum();
        let total_seated = assignments.len() as u64;
        let tables = tables
            .into_iter()
            .map(|table| {
                let mut seated_here = occupants.remove(&table.table.id).unwrap_or_default();
                seated_here.sort_by_key(|o| (o.seat_number.is_none(), o.seat_number, o.assignment_id));
                ChartTable {
                    table,
                    occupants: seated_here,
                }
            })
            .collect();

        Ok(SeatingChart {
            tables,
            unassigned,
            total_capacity,
            total_seated,
        })
    }
}

pub async fn seats_taken<C>(db: &C, table_id: i32) -> CoreResult<u64>
where
    C: ConnectionTrait,
{
    Ok(seating_assignments::Entity::find()
        .filter(seating_assignments::Column::TableId.eq(table_id))
        .count(db)
        .await?)
}

async fn seat_counts<C>(db: &C, wedding_id: i32) -> CoreResult<HashMap<i32, u64>>
where
    C: ConnectionTrait,
{
    let assignments = seating_assignments::Entity::find()
        .filter(seating_assignments::Column::WeddingId.eq(wedding_id))
        .all(db)
        .await?;

    let mut counts = HashMap::new();
    for assignment in assignments {
        *counts.entry(assignment.table_id).or_insert(0) += 1;
    }
    Ok(counts)
}

async fn find_table<C>(db: &C, wedding_id: i32, table_id: i32) -> CoreResult<seating_tables::Model>
where
    C: ConnectionTrait,
{
    seating_tables::Entity::find_by_id(table_id)
        .filter(seating_tables::Column::WeddingId.eq(wedding_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Table", table_id.to_string()))
}

/// Write to the table row as the transaction's first statement.
///
/// SQLite waits on its busy timeout for a lock taken by a transaction's
/// first write, but fails at once when a transaction that already read
/// tries to upgrade.
async fn lock_table<C>(db: &C, wedding_id: i32, table_id: i32) -> CoreResult<()>
where
    C: ConnectionTrait,
{
    seating_tables::Entity::update_many()
        .col_expr(
            seating_tables::Column::Capacity,
            Expr::col(seating_tables::Column::Capacity).into(),
        )
        .filter(seating_tables::Column::Id.eq(table_id))
        .filter(seating_tables::Column::WeddingId.eq(wedding_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn find_assignment<C>(db: &C, wedding_id: i32, assignment_id: i32) -> CoreResult<seating_assignments::Model>
where
    C: ConnectionTrait,
{
    seating_assignments::Entity::find_by_id(assignment_id)
        .filter(seating_assignments::Column::WeddingId.eq(wedding_id))
        .one(db)
        .await?
        .ok_or_else(|| CoreError::not_found("Assignment", assignment_id.to_string()))
}

/// Check that the attendee exists in the guest's party and may be seated.
/// Returns the child id to store.
async fn check_attendee<C>(
    db: &C,
    guest: &guests::Model,
    attendee_type: AttendeeType,
    child_id: Option<i32>,
) -> CoreResult<Option<i32>>
where
    C: ConnectionTrait,
{
    if guest.attendance() == AttendanceStatus::No {
        return Err(CoreError::field(
            "guest_id",
            format!("{} declined the invitation and cannot be seated", guest.full_name()),
        ));
    }

    match attendee_type {
        AttendeeType::Guest | AttendeeType::PlusOne if child_id.is_some() => Err(CoreError::field(
            "child_id",
            "child_id is only valid for child assignments",
        )),
        AttendeeType::Guest => Ok(None),
        AttendeeType::PlusOne => {
            if !guest.plus_one_allowed {
                return Err(CoreError::field(
                    "attendee_type",
                    format!("{} is not allowed a plus-one", guest.full_name()),
                ));
            }
            Ok(None)
        }
        AttendeeType::Child => {
            let child_id = child_id
                .ok_or_else(|| CoreError::field("child_id", "child_id is required for child assignments"))?;
            let child = guest_children::Entity::find_by_id(child_id)
                .filter(guest_children::Column::GuestId.eq(guest.id))
                .one(db)
                .await?
                .ok_or_else(|| {
                    CoreError::field(
                        "child_id",
                        format!("Child {} does not belong to {}", child_id, guest.full_name()),
                    )
                })?;
            if !child.is_attending {
                return Err(CoreError::field(
                    "child_id",
                    format!("{} is not attending", child.name),
                ));
            }
            Ok(Some(child.id))
        }
    }
}

async fn find_attendee_seat<C>(
    db: &C,
    guest_id: i32,
    attendee_type: AttendeeType,
    child_id: Option<i32>,
) -> CoreResult<Option<seating_assignments::Model>>
where
    C: ConnectionTrait,
{
    let select = match child_id {
        Some(child_id) => seating_assignments::Entity::find()
            .filter(seating_assignments::Column::ChildId.eq(child_id)),
        None => seating_assignments::Entity::find()
            .filter(seating_assignments::Column::GuestId.eq(guest_id))
            .filter(seating_assignments::Column::AttendeeType.eq(attendee_type.as_str()))
            .filter(seating_assignments::Column::ChildId.is_null()),
    };
    Ok(select.one(db).await?)
}

async fn check_seat<C>(db: &C, table: &seating_tables::Model, seat: i32, ignore: Option<i32>) -> CoreResult<()>
where
    C: ConnectionTrait,
{
    check_seat_number(&table.name, table.capacity, seat).map_err(|msg| CoreError::field("seat_number", msg))?;

    let mut select = seating_assignments::Entity::find()
        .filter(seating_assignments::Column::TableId.eq(table.id))
        .filter(seating_assignments::Column::SeatNumber.eq(seat));
    if let Some(id) = ignore {
        select = select.filter(seating_assignments::Column::Id.ne(id));
    }
    if select.count(db).await? > 0 {
        return Err(CoreError::field(
            "seat_number",
            format!("Seat {} at table '{}' is already taken", seat, table.name),
        ));
    }
    Ok(())
}

/// Unique index violations on assignments are client errors, not conflicts
fn seat_conflict(err: sea_orm::DbErr) -> CoreError {
    if is_unique_violation(&err) {
        CoreError::validation("This attendee or seat is already assigned").with_source(err)
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::errors::CoreErrorKind;
    use crate::services::guest_service::{ChildInput, GuestPatch, GuestService};
    use crate::services::test_support::{create_guest, create_user, create_wedding};

    fn table(name: &str, capacity: i32) -> TableInput {
        TableInput {
            name: name.to_string(),
            table_number: None,
            capacity,
            shape: None,
            notes: None,
        }
    }

    fn seat(table_id: i32, guest_id: i32) -> AssignRequest {
        AssignRequest {
            table_id,
            guest_id,
            attendee_type: "guest".into(),
            child_id: None,
            seat_number: None,
        }
    }

    #[tokio::test]
    async fn full_table_rejects_with_its_name() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = SeatingService::new(db.clone());
        let head = service.create_table(wedding.id, table("Head Table", 2)).await.unwrap();

        for name in ["Amy", "Bob"] {
            let guest = create_guest(&db, wedding.id, name, false).await;
            service.assign(wedding.id, seat(head.table.id, guest.id)).await.unwrap();
        }
        let third = create_guest(&db, wedding.id, "Cid", false).await;
        let err = service
            .assign(wedding.id, seat(head.table.id, third.id))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), CoreErrorKind::Validation);
        assert!(err.message().contains("Head Table"));

        let counted = service.get_table(wedding.id, head.table.id).await.unwrap();
        assert_eq!(counted.seats_taken, 2);
        assert_eq!(counted.seats_available, 0);
    }

    #[tokio::test]
    async fn same_attendee_cannot_be_seated_twice() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = SeatingService::new(db.clone());
        let one = service.create_table(wedding.id, table("One", 8)).await.unwrap();
        let two = service.create_table(wedding.id, table("Two", 8)).await.unwrap();
        let guest = create_guest(&db, wedding.id, "Dee", true).await;

        service.assign(wedding.id, seat(one.table.id, guest.id)).await.unwrap();
        let err = service
            .assign(wedding.id, seat(two.table.id, guest.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
        assert!(err.message().contains("One"));

        // The plus-one is a different attendee
        let mut plus_one = seat(two.table.id, guest.id);
        plus_one.attendee_type = "plus_one".into();
        service.assign(wedding.id, plus_one).await.unwrap();
    }

    #[tokio::test]
    async fn attendee_rules() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = SeatingService::new(db.clone());
        let t = service.create_table(wedding.id, table("Kids", 8)).await.unwrap();
        let solo = create_guest(&db, wedding.id, "Eli", false).await;
        let parent = create_guest(&db, wedding.id, "Flo", false).await;
        let child = GuestService::new(db.clone())
            .add_child(
                wedding.id,
                parent.id,
                ChildInput {
                    name: "Gia".into(),
                    age: Some(4),
                    meal_choice: None,
                    is_attending: true,
                },
            )
            .await
            .unwrap();

        let mut plus_one = seat(t.table.id, solo.id);
        plus_one.attendee_type = "plus_one".into();
        let err = service.assign(wedding.id, plus_one).await.unwrap_err();
        assert!(err.fields().unwrap().contains_key("attendee_type"));

        let mut wrong_parent = seat(t.table.id, solo.id);
        wrong_parent.attendee_type = "child".into();
        wrong_parent.child_id = Some(child.id);
        assert!(service.assign(wedding.id, wrong_parent).await.is_err());

        let mut guest_with_child = seat(t.table.id, parent.id);
        guest_with_child.child_id = Some(child.id);
        assert!(service.assign(wedding.id, guest_with_child).await.is_err());

        let mut ok = seat(t.table.id, parent.id);
        ok.attendee_type = "child".into();
        ok.child_id = Some(child.id);
        let assignment = service.assign(wedding.id, ok).await.unwrap();
        assert_eq!(assignment.child_id, Some(child.id));
    }

    #[tokio::test]
    async fn seat_numbers_are_checked() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = SeatingService::new(db.clone());
        let t = service.create_table(wedding.id, table("Garden", 4)).await.unwrap();
        let a = create_guest(&db, wedding.id, "Hal", false).await;
        let b = create_guest(&db, wedding.id, "Ivy", false).await;

        let mut first = seat(t.table.id, a.id);
        first.seat_number = Some(2);
        service.assign(wedding.id, first).await.unwrap();

        let mut taken = seat(t.table.id, b.id);
        taken.seat_number = Some(2);
        assert!(service.assign(wedding.id, taken).await.is_err());

        let mut out_of_range = seat(t.table.id, b.id);
        out_of_range.seat_number = Some(5);
        assert!(service.assign(wedding.id, out_of_range).await.is_err());
    }

    #[tokio::test]
    async fn moving_respects_target_capacity() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = SeatingService::new(db.clone());
        let small = service.create_table(wedding.id, table("Small", 1)).await.unwrap();
        let big = service.create_table(wedding.id, table("Big", 10)).await.unwrap();
        let a = create_guest(&db, wedding.id, "Jon", false).await;
        let b = create_guest(&db, wedding.id, "Kay", false).await;

        service.assign(wedding.id, seat(small.table.id, a.id)).await.unwrap();
        let moving = service.assign(wedding.id, seat(big.table.id, b.id)).await.unwrap();

        let err = service
            .move_assignment(
                wedding.id,
                moving.id,
                MoveRequest {
                    table_id: Some(small.table.id),
                    seat_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.message().contains("Small"));

        let moved = service
            .move_assignment(
                wedding.id,
                moving.id,
                MoveRequest {
                    table_id: None,
                    seat_number: Some(Some(3)),
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.seat_number, Some(3));
    }

    #[tokio::test]
    async fn capacity_cannot_shrink_below_occupancy() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = SeatingService::new(db.clone());
        let t = service.create_table(wedding.id, table("Lake", 4)).await.unwrap();
        for name in ["Lea", "Max"] {
            let guest = create_guest(&db, wedding.id, name, false).await;
            service.assign(wedding.id, seat(t.table.id, guest.id)).await.unwrap();
        }

        let shrink = |capacity| TablePatch {
            capacity: Some(capacity),
            ..Default::default()
        };
        assert!(service.update_table(wedding.id, t.table.id, shrink(1)).await.is_err());
        let updated = service.update_table(wedding.id, t.table.id, shrink(2)).await.unwrap();
        assert_eq!(updated.seats_available, 0);
    }

    #[tokio::test]
    async fn declining_releases_seat_and_chart_lists_unassigned() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = SeatingService::new(db.clone());
        let t = service.create_table(wedding.id, table("Oak", 6)).await.unwrap();
        let seated = create_guest(&db, wedding.id, "Ned", false).await;
        let waiting = create_guest(&db, wedding.id, "Ola", false).await;
        service.assign(wedding.id, seat(t.table.id, seated.id)).await.unwrap();

        let chart = service.chart(wedding.id).await.unwrap();
        assert_eq!(chart.total_seated, 1);
        assert_eq!(chart.tables[0].occupants[0].name, "Ned Guest");
        assert_eq!(chart.unassigned.len(), 1);
        assert_eq!(chart.unassigned[0].guest_id, waiting.id);

        GuestService::new(db.clone())
            .update(
                &wedding,
                seated.id,
                GuestPatch {
                    attendance_status: Some("no".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let chart = service.chart(wedding.id).await.unwrap();
        assert_eq!(chart.total_seated, 0);
        assert_eq!(chart.tables[0].table.seats_taken, 0);
        assert_eq!(chart.unassigned.len(), 1);
    }

    #[tokio::test]
    async fn plus_one_seat_survives_unrelated_guest_edits() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = SeatingService::new(db.clone());
        let guests = GuestService::new(db.clone());
        let t = service.create_table(wedding.id, table("Elm", 6)).await.unwrap();
        let guest = create_guest(&db, wedding.id, "Pia", true).await;

        let mut plus_one = seat(t.table.id, guest.id);
        plus_one.attendee_type = "plus_one".into();
        service.assign(wedding.id, plus_one).await.unwrap();

        guests
            .update(
                &wedding,
                guest.id,
                GuestPatch {
                    notes: Some(Some("Prefers window seat".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let kept = service.get_table(wedding.id, t.table.id).await.unwrap();
        assert_eq!(kept.seats_taken, 1);

        guests
            .update(
                &wedding,
                guest.id,
                GuestPatch {
                    plus_one_allowed: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let released = service.get_table(wedding.id, t.table.id).await.unwrap();
        assert_eq!(released.seats_taken, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_assignments_never_overfill_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seating.db");
        let url = crate::database::get_database_url(path.to_str());
        let db = crate::database::establish_connection(&url).await.unwrap();
        crate::database::setup_database(&db).await.unwrap();

        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let service = SeatingService::new(db.clone());
        let t = service.create_table(wedding.id, table("Rush", 2)).await.unwrap();

        let mut handles = Vec::new();
        for name in ["Ada", "Ben", "Cai", "Dot", "Eve", "Fox"] {
            let guest = create_guest(&db, wedding.id, name, false).await;
            let service = service.clone();
            let request = seat(t.table.id, guest.id);
            let wedding_id = wedding.id;
            handles.push(tokio::spawn(async move { service.assign(wedding_id, request).await }));
        }

        let mut seated = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => seated += 1,
                Err(err) => {
                    assert_eq!(err.kind(), CoreErrorKind::Validation, "{}", err);
                    assert!(err.message().contains("Rush"));
                }
            }
        }
        assert_eq!(seated, 2);

        let counted = service.get_table(wedding.id, t.table.id).await.unwrap();
        assert_eq!(counted.seats_taken, 2);
    }
}
