use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SeatingTables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SeatingTables::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SeatingTables::WeddingId).integer().not_null())
                    .col(ColumnDef::new(SeatingTables::Name).string().not_null())
                    .col(ColumnDef::new(SeatingTables::TableNumber).integer())
                    .col(
                        ColumnDef::new(SeatingTables::Capacity)
                            .integer()
                            .not_null()
                            .default(8),
                    )
                    .col(ColumnDef::new(SeatingTables::Shape).string())
                    .col(ColumnDef::new(SeatingTables::Notes).text())
                    .col(
                        ColumnDef::new(SeatingTables::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SeatingTables::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seating_tables_wedding_id")
                            .from(SeatingTables::Table, SeatingTables::WeddingId)
                            .to(Weddings::Table, Weddings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SeatingAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SeatingAssignments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SeatingAssignments::WeddingId).integer().not_null())
                    .col(ColumnDef::new(SeatingAssignments::TableId).integer().not_null())
                    .col(ColumnDef::new(SeatingAssignments::GuestId).integer().not_null())
                    .col(
                        ColumnDef::new(SeatingAssignments::AttendeeType)
                            .string()
                            .not_null()
                            .default("guest"),
                    )
                    .col(ColumnDef::new(SeatingAssignments::ChildId).integer())
                    .col(ColumnDef::new(SeatingAssignments::SeatNumber).integer())
                    .col(
                        ColumnDef::new(SeatingAssignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seating_assignments_table_id")
                            .from(SeatingAssignments::Table, SeatingAssignments::TableId)
                            .to(SeatingTables::Table, SeatingTables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seating_assignments_guest_id")
                            .from(SeatingAssignments::Table, SeatingAssignments::GuestId)
                            .to(Guests::Table, Guests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seating_assignments_child_id")
                            .from(SeatingAssignments::Table, SeatingAssignments::ChildId)
                            .to(GuestChildren::Table, GuestChildren::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_seating_assignments_table_id")
                    .table(SeatingAssignments::Table)
                    .col(SeatingAssignments::TableId)
                    .to_owned(),
            )
            .await?;

        // Partial unique indexes are not expressible through the index builder
        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_seating_attendee \
             ON seating_assignments (guest_id, attendee_type) WHERE child_id IS NULL",
        )
        .await?;

        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_seating_child \
             ON seating_assignments (child_id) WHERE child_id IS NOT NULL",
        )
        .await?;

        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_seating_seat \
             ON seating_assignments (table_id, seat_number) WHERE seat_number IS NOT NULL",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SeatingAssignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SeatingTables::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum SeatingTables {
    Table,
    Id,
    WeddingId,
    Name,
    TableNumber,
    Capacity,
    Shape,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SeatingAssignments {
    Table,
    Id,
    WeddingId,
    TableId,
    GuestId,
    AttendeeType,
    ChildId,
    SeatNumber,
    CreatedAt,
}

#[derive(Iden)]
enum Weddings {
    Table,
    Id,
}

#[derive(Iden)]
enum Guests {
    Table,
    Id,
}

#[derive(Iden)]
enum GuestChildren {
    Table,
    Id,
}
