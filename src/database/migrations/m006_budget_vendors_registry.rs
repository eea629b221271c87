use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vendors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vendors::WeddingId).integer().not_null())
                    .col(ColumnDef::new(Vendors::Name).string().not_null())
                    .col(ColumnDef::new(Vendors::Category).string().not_null())
                    .col(ColumnDef::new(Vendors::ContactName).string())
                    .col(ColumnDef::new(Vendors::Email).string())
                    .col(ColumnDef::new(Vendors::Phone).string())
                    .col(ColumnDef::new(Vendors::Website).string())
                    .col(
                        ColumnDef::new(Vendors::Status)
                            .string()
                            .not_null()
                            .default("researching"),
                    )
                    .col(ColumnDef::new(Vendors::QuotedCents).big_integer())
                    .col(ColumnDef::new(Vendors::Notes).text())
                    .col(
                        ColumnDef::new(Vendors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vendors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendors_wedding_id")
                            .from(Vendors::Table, Vendors::WeddingId)
                            .to(Weddings::Table, Weddings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BudgetCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetCategories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetCategories::WeddingId).integer().not_null())
                    .col(ColumnDef::new(BudgetCategories::Name).string().not_null())
                    .col(
                        ColumnDef::new(BudgetCategories::AllocatedCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_categories_wedding_id")
                            .from(BudgetCategories::Table, BudgetCategories::WeddingId)
                            .to(Weddings::Table, Weddings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::WeddingId).integer().not_null())
                    .col(ColumnDef::new(Expenses::CategoryId).integer())
                    .col(ColumnDef::new(Expenses::VendorId).integer())
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(ColumnDef::new(Expenses::AmountCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(Expenses::PaidCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Expenses::DueDate).date())
                    .col(ColumnDef::new(Expenses::Notes).text())
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Expenses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_wedding_id")
                            .from(Expenses::Table, Expenses::WeddingId)
                            .to(Weddings::Table, Weddings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_category_id")
                            .from(Expenses::Table, Expenses::CategoryId)
                            .to(BudgetCategories::Table, BudgetCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_vendor_id")
                            .from(Expenses::Table, Expenses::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RegistryItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RegistryItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RegistryItems::WeddingId).integer().not_null())
                    .col(ColumnDef::new(RegistryItems::Name).string().not_null())
                    .col(ColumnDef::new(RegistryItems::Description).text())
                    .col(ColumnDef::new(RegistryItems::Url).string())
                    .col(ColumnDef::new(RegistryItems::ImageUrl).string())
                    .col(ColumnDef::new(RegistryItems::PriceCents).big_integer())
                    .col(
                        ColumnDef::new(RegistryItems::IsClaimed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RegistryItems::IsAvailable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(RegistryItems::ClaimedByName).string())
                    .col(ColumnDef::new(RegistryItems::ClaimedByEmail).string())
                    .col(ColumnDef::new(RegistryItems::ClaimedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(RegistryItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RegistryItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_registry_items_wedding_id")
                            .from(RegistryItems::Table, RegistryItems::WeddingId)
                            .to(Weddings::Table, Weddings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RegistryItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vendors::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Vendors {
    Table,
    Id,
    WeddingId,
    Name,
    Category,
    ContactName,
    Email,
    Phone,
    Website,
    Status,
    QuotedCents,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum BudgetCategories {
    Table,
    Id,
    WeddingId,
    Name,
    AllocatedCents,
    SortOrder,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    WeddingId,
    CategoryId,
    VendorId,
    Description,
    AmountCents,
    PaidCents,
    DueDate,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum RegistryItems {
    Table,
    Id,
    WeddingId,
    Name,
    Description,
    Url,
    ImageUrl,
    PriceCents,
    IsClaimed,
    IsAvailable,
    ClaimedByName,
    ClaimedByEmail,
    ClaimedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Weddings {
    Table,
    Id,
}
