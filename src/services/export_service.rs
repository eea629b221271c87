use std::collections::HashMap;

use csv::Writer;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::database::entities::{guest_children, guests, seating_assignments, seating_tables, weddings};
use crate::domain::{AttendanceStatus, AttendeeType};
use crate::errors::{CoreError, CoreResult};

use super::seating_service::{SeatingChart, SeatingService};

const GUEST_CSV_HEADERS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "phone",
    "side",
    "group_name",
    "attendance_status",
    "plus_one_allowed",
    "plus_one_name",
    "plus_one_attending",
    "meal_choice",
    "plus_one_meal_choice",
    "dietary_restrictions",
    "children",
    "table",
    "invitation_sent_at",
    "rsvp_responded_at",
];

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const LINE_HEIGHT: f32 = 6.0;

/// One plate on the caterer's meal list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealLine {
    pub name: String,
    pub attendee_type: AttendeeType,
    pub meal_choice: Option<String>,
    pub dietary: Option<String>,
    pub table: Option<String>,
}

pub struct ExportService {
    db: DatabaseConnection,
}

impl ExportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Guest list as CSV, one row per invited guest
    pub async fn guest_csv(&self, wedding_id: i32) -> CoreResult<Vec<u8>> {
        let party = Party::load(&self.db, wedding_id).await?;

        export_to_csv(&party.guests, GUEST_CSV_HEADERS, |guest| {
            let children = party
                .children_of(guest.id)
                .map(|child| child.name.clone())
                .collect::<Vec<_>>()
                .join("; ");
            vec![
                guest.first_name.clone(),
                guest.last_name.clone(),
                guest.email.clone().unwrap_or_default(),
                guest.phone.clone().unwrap_or_default(),
                guest.side.clone().unwrap_or_default(),
                guest.group_name.clone().unwrap_or_default(),
                guest.attendance_status.clone(),
                guest.plus_one_allowed.to_string(),
                guest.plus_one_name.clone().unwrap_or_default(),
                guest.plus_one_attending.to_string(),
                guest.meal_choice.clone().unwrap_or_default(),
                guest.plus_one_meal_choice.clone().unwrap_or_default(),
                guest.dietary_restrictions.clone().unwrap_or_default(),
                children,
                party
                    .table_of(guest.id, AttendeeType::Guest, None)
                    .unwrap_or_default(),
                guest
                    .invitation_sent_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                guest
                    .rsvp_responded_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            ]
        })
    }

    /// Printable report with the meal list followed by the seating chart
    pub async fn guest_report_pdf(&self, wedding: &weddings::Model) -> CoreResult<Vec<u8>> {
        let party = Party::load(&self.db, wedding.id).await?;
        let meals = party.meal_lines();
        let chart = SeatingService::new(self.db.clone()).chart(wedding.id).await?;

        render_report(wedding, &meals, &chart)
    }
}

/// Guests, children and seats of one wedding, loaded once per export
struct Party {
    guests: Vec<guests::Model>,
    children: Vec<guest_children::Model>,
    seats: HashMap<(i32, AttendeeType, Option<i32>), String>,
}

impl Party {
    async fn load(db: &DatabaseConnection, wedding_id: i32) -> CoreResult<Self> {
        let guests = guests::Entity::find()
            .filter(guests::Column::WeddingId.eq(wedding_id))
            .order_by_asc(guests::Column::LastName)
            .order_by_asc(guests::Column::FirstName)
            .all(db)
            .await?;
        let children = guest_children::Entity::find()
            .filter(guest_children::Column::WeddingId.eq(wedding_id))
            .order_by_asc(guest_children::Column::Id)
            .all(db)
            .await?;
        let seated = seating_assignments::Entity::find()
            .filter(seating_assignments::Column::WeddingId.eq(wedding_id))
            .find_also_related(seating_tables::Entity)
            .all(db)
            .await?;

        let mut seats = HashMap::new();
        for (assignment, table) in seated {
            let (Ok(kind), Some(table)) = (assignment.attendee_type.parse::<AttendeeType>(), table) else {
                continue;
            };
            seats.insert((assignment.guest_id, kind, assignment.child_id), table.name);
        }

        Ok(Self {
            guests,
            children,
            seats,
        })
    }

    fn children_of(&self, guest_id: i32) -> impl Iterator<Item = &guest_children::Model> {
        self.children.iter().filter(move |c| c.guest_id == guest_id)
    }

    fn table_of(&self, guest_id: i32, kind: AttendeeType, child_id: Option<i32>) -> Option<String> {
        self.seats.get(&(guest_id, kind, child_id)).cloned()
    }

    /// Everyone expected to eat: attending guests, their attending plus-ones
    /// and attending children
    fn meal_lines(&self) -> Vec<MealLine> {
        let mut lines = Vec::new();
        for guest in self.guests.iter().filter(|g| g.attendance() == AttendanceStatus::Yes) {
            lines.push(MealLine {
                name: guest.full_name(),
                attendee_type: AttendeeType::Guest,
                meal_choice: guest.meal_choice.clone(),
                dietary: guest.dietary_restrictions.clone(),
                table: self.table_of(guest.id, AttendeeType::Guest, None),
            });
            if guest.plus_one_allowed && guest.plus_one_attending {
                lines.push(MealLine {
                    name: guest.plus_one_display_name(),
                    attendee_type: AttendeeType::PlusOne,
                    meal_choice: guest.plus_one_meal_choice.clone(),
                    dietary: None,
                    table: self.table_of(guest.id, AttendeeType::PlusOne, None),
                });
            }
            for child in self.children_of(guest.id).filter(|c| c.is_attending) {
                lines.push(MealLine {
                    name: child.name.clone(),
                    attendee_type: AttendeeType::Child,
                    meal_choice: child.meal_choice.clone(),
                    dietary: None,
                    table: self.table_of(guest.id, AttendeeType::Child, Some(child.id)),
                });
            }
        }
        lines
    }
}

/// Write a header row and one row per item
pub fn export_to_csv<T, F>(items: &[T], headers: &[&str], row_fn: F) -> CoreResult<Vec<u8>>
where
    F: Fn(&T) -> Vec<String>,
{
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(headers).map_err(csv_error)?;
    for item in items {
        wtr.write_record(&row_fn(item)).map_err(csv_error)?;
    }
    wtr.into_inner()
        .map_err(|e| CoreError::internal(format!("CSV export failed: {}", e)))
}

fn csv_error(err: csv::Error) -> CoreError {
    CoreError::internal(format!("CSV export failed: {}", err))
}

fn pdf_error<E: std::fmt::Debug>(err: E) -> CoreError {
    CoreError::internal(format!("PDF rendering failed: {:?}", err))
}

/// Top-down text cursor that starts a new A4 page when the current one is full
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter {
    fn new(title: &str) -> CoreResult<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn title(&mut self, text: &str) {
        self.ensure_room(LINE_HEIGHT * 3.0);
        self.layer.use_text(text, 18.0, Mm(MARGIN), Mm(self.y), &self.bold);
        self.y -= LINE_HEIGHT * 2.0;
    }

    fn heading(&mut self, text: &str) {
        self.ensure_room(LINE_HEIGHT * 3.0);
        self.y -= LINE_HEIGHT * 0.5;
        self.layer.use_text(text, 13.0, Mm(MARGIN), Mm(self.y), &self.bold);
        self.y -= LINE_HEIGHT * 1.5;
    }

    /// One row of cells at the given x offsets
    fn row(&mut self, cells: &[(f32, String)]) {
        self.ensure_room(LINE_HEIGHT);
        for (x, text) in cells {
            self.layer
                .use_text(truncate(text, 40), 10.0, Mm(MARGIN + x), Mm(self.y), &self.regular);
        }
        self.y -= LINE_HEIGHT;
    }

    fn line(&mut self, text: &str) {
        self.row(&[(0.0, text.to_string())]);
    }

    fn finish(self) -> CoreResult<Vec<u8>> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max - 1).collect();
        cut.push('~');
        cut
    }
}

fn render_report(wedding: &weddings::Model, meals: &[MealLine], chart: &SeatingChart) -> CoreResult<Vec<u8>> {
    let mut pdf = PageWriter::new(&wedding.title)?;
    pdf.title(&format!("{}: guest report", wedding.title));
    if let Some(date) = wedding.wedding_date {
        pdf.line(&format!("Date: {}", date.format("%Y-%m-%d")));
    }
    if let Some(venue) = &wedding.venue_name {
        pdf.line(&format!("Venue: {}", venue));
    }

    pdf.heading(&format!("Meal list ({} plates)", meals.len()));
    pdf.row(&[
        (0.0, "Name".to_string()),
        (60.0, "Meal".to_string()),
        (100.0, "Dietary notes".to_string()),
        (150.0, "Table".to_string()),
    ]);
    for meal in meals {
        let name = match meal.attendee_type {
            AttendeeType::Guest => meal.name.clone(),
            AttendeeType::PlusOne => format!("{} (+1)", meal.name),
            AttendeeType::Child => format!("{} (child)", meal.name),
        };
        pdf.row(&[
            (0.0, name),
            (60.0, meal.meal_choice.clone().unwrap_or_else(|| "-".to_string())),
            (100.0, meal.dietary.clone().unwrap_or_default()),
            (150.0, meal.table.clone().unwrap_or_default()),
        ]);
    }

    let mut tallies: Vec<(String, usize)> = Vec::new();
    for meal in meals {
        let key = meal.meal_choice.clone().unwrap_or_else(|| "unspecified".to_string());
        match tallies.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => tallies.push((key, 1)),
        }
    }
    tallies.sort();
    pdf.heading("Meal totals");
    for (meal, count) in tallies {
        pdf.line(&format!("{}: {}", meal, count));
    }

    pdf.heading(&format!(
        "Seating chart ({} of {} seats filled)",
        chart.total_seated, chart.total_capacity
    ));
    for table in &chart.tables {
        pdf.heading(&format!(
            "{} ({}/{})",
            table.table.table.name, table.table.seats_taken, table.table.table.capacity
        ));
        for occupant in &table.occupants {
            let seat = occupant
                .seat_number
                .map(|n| format!("Seat {}", n))
                .unwrap_or_default();
            pdf.row(&[(0.0, seat), (20.0, occupant.name.clone())]);
        }
    }
    if !chart.unassigned.is_empty() {
        pdf.heading(&format!("Not yet seated ({})", chart.unassigned.len()));
        for attendee in &chart.unassigned {
            pdf.line(&attendee.name);
        }
    }

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::services::guest_service::{GuestPatch, GuestService};
    use crate::services::seating_service::{AssignRequest, TableInput};
    use crate::services::test_support::{create_guest, create_user, create_wedding};

    #[tokio::test]
    async fn csv_has_header_and_table_column() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let guest = create_guest(&db, wedding.id, "Ana", false).await;
        create_guest(&db, wedding.id, "Ben", false).await;
        let seating = SeatingService::new(db.clone());
        let table = seating
            .create_table(
                wedding.id,
                TableInput {
                    name: "Rose".into(),
                    table_number: Some(1),
                    capacity: 8,
                    shape: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        seating
            .assign(
                wedding.id,
                AssignRequest {
                    table_id: table.table.id,
                    guest_id: guest.id,
                    attendee_type: "guest".into(),
                    child_id: None,
                    seat_number: None,
                },
            )
            .await
            .unwrap();

        let bytes = ExportService::new(db.clone()).guest_csv(wedding.id).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("first_name,last_name,email"));
        assert!(lines[1].starts_with("Ana,Guest,ana@guests.test"));
        assert!(lines[1].contains(",Rose,"));
    }

    #[tokio::test]
    async fn meal_list_only_counts_attendees() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let coming = create_guest(&db, wedding.id, "Cy", true).await;
        create_guest(&db, wedding.id, "Di", false).await;
        GuestService::new(db.clone())
            .update(
                &wedding,
                coming.id,
                GuestPatch {
                    attendance_status: Some("yes".into()),
                    plus_one_attending: Some(true),
                    meal_choice: Some(Some("fish".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let party = Party::load(&db, wedding.id).await.unwrap();
        let meals = party.meal_lines();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0].meal_choice.as_deref(), Some("fish"));
        assert_eq!(meals[1].attendee_type, AttendeeType::PlusOne);
        assert_eq!(meals[1].name, "Guest of Cy Guest");
    }

    #[tokio::test]
    async fn report_is_a_pdf() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        for n in 0..80 {
            create_guest(&db, wedding.id, &format!("G{}", n), false).await;
        }

        let bytes = ExportService::new(db.clone())
            .guest_report_pdf(&wedding)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_cells_are_truncated() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd~");
    }
}
