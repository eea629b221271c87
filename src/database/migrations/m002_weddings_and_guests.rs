use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Weddings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Weddings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Weddings::OwnerId).integer().not_null())
                    .col(ColumnDef::new(Weddings::Title).string().not_null())
                    .col(ColumnDef::new(Weddings::PartnerOneName).string())
                    .col(ColumnDef::new(Weddings::PartnerTwoName).string())
                    .col(ColumnDef::new(Weddings::WeddingDate).date())
                    .col(ColumnDef::new(Weddings::VenueName).string())
                    .col(ColumnDef::new(Weddings::VenueAddress).text())
                    .col(ColumnDef::new(Weddings::RsvpDeadline).date())
                    .col(
                        ColumnDef::new(Weddings::Currency)
                            .string()
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Weddings::TotalBudgetCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Weddings::PublicCode)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Weddings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Weddings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_weddings_owner_id")
                            .from(Weddings::Table, Weddings::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WeddingMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WeddingMembers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WeddingMembers::WeddingId).integer().not_null())
                    .col(ColumnDef::new(WeddingMembers::UserId).integer().not_null())
                    .col(ColumnDef::new(WeddingMembers::Role).string().not_null())
                    .col(
                        ColumnDef::new(WeddingMembers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wedding_members_wedding_id")
                            .from(WeddingMembers::Table, WeddingMembers::WeddingId)
                            .to(Weddings::Table, Weddings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wedding_members_user_id")
                            .from(WeddingMembers::Table, WeddingMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wedding_members_unique")
                    .table(WeddingMembers::Table)
                    .col(WeddingMembers::WeddingId)
                    .col(WeddingMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Guests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Guests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Guests::WeddingId).integer().not_null())
                    .col(ColumnDef::new(Guests::FirstName).string().not_null())
                    .col(ColumnDef::new(Guests::LastName).string().not_null())
                    .col(ColumnDef::new(Guests::Email).string())
                    .col(ColumnDef::new(Guests::Phone).string())
                    .col(ColumnDef::new(Guests::Side).string())
                    .col(ColumnDef::new(Guests::GroupName).string())
                    .col(
                        ColumnDef::new(Guests::UserCode)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Guests::AttendanceStatus)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Guests::PlusOneAllowed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Guests::PlusOneName).string())
                    .col(
                        ColumnDef::new(Guests::PlusOneAttending)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Guests::MealChoice).string())
                    .col(ColumnDef::new(Guests::PlusOneMealChoice).string())
                    .col(ColumnDef::new(Guests::DietaryRestrictions).text())
                    .col(ColumnDef::new(Guests::Notes).text())
                    .col(ColumnDef::new(Guests::InvitationSentAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Guests::LastReminderAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Guests::RsvpRespondedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Guests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Guests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_guests_wedding_id")
                            .from(Guests::Table, Guests::WeddingId)
                            .to(Weddings::Table, Weddings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_guests_wedding_id")
                    .table(Guests::Table)
                    .col(Guests::WeddingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GuestChildren::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GuestChildren::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GuestChildren::GuestId).integer().not_null())
                    .col(ColumnDef::new(GuestChildren::WeddingId).integer().not_null())
                    .col(ColumnDef::new(GuestChildren::Name).string().not_null())
                    .col(ColumnDef::new(GuestChildren::Age).integer())
                    .col(ColumnDef::new(GuestChildren::MealChoice).string())
                    .col(
                        ColumnDef::new(GuestChildren::IsAttending)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GuestChildren::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_guest_children_guest_id")
                            .from(GuestChildren::Table, GuestChildren::GuestId)
                            .to(Guests::Table, Guests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GuestChildren::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Guests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WeddingMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Weddings::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Weddings {
    Table,
    Id,
    OwnerId,
    Title,
    PartnerOneName,
    PartnerTwoName,
    WeddingDate,
    VenueName,
    VenueAddress,
    RsvpDeadline,
    Currency,
    TotalBudgetCents,
    PublicCode,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum WeddingMembers {
    Table,
    Id,
    WeddingId,
    UserId,
    Role,
    CreatedAt,
}

#[derive(Iden)]
enum Guests {
    Table,
    Id,
    WeddingId,
    FirstName,
    LastName,
    Email,
    Phone,
    Side,
    GroupName,
    UserCode,
    AttendanceStatus,
    PlusOneAllowed,
    PlusOneName,
    PlusOneAttending,
    MealChoice,
    PlusOneMealChoice,
    DietaryRestrictions,
    Notes,
    InvitationSentAt,
    LastReminderAt,
    RsvpRespondedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum GuestChildren {
    Table,
    Id,
    GuestId,
    WeddingId,
    Name,
    Age,
    MealChoice,
    IsAttending,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
