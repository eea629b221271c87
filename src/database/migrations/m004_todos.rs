use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TodoCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TodoCategories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TodoCategories::WeddingId).integer().not_null())
                    .col(ColumnDef::new(TodoCategories::Name).string().not_null())
                    .col(ColumnDef::new(TodoCategories::Color).string())
                    .col(
                        ColumnDef::new(TodoCategories::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TodoCategories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_todo_categories_wedding_id")
                            .from(TodoCategories::Table, TodoCategories::WeddingId)
                            .to(Weddings::Table, Weddings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Todos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Todos::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Todos::WeddingId).integer().not_null())
                    .col(ColumnDef::new(Todos::CategoryId).integer())
                    .col(ColumnDef::new(Todos::Title).string().not_null())
                    .col(ColumnDef::new(Todos::Description).text())
                    .col(
                        ColumnDef::new(Todos::Status)
                            .string()
                            .not_null()
                            .default("not_started"),
                    )
                    .col(
                        ColumnDef::new(Todos::Priority)
                            .string()
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(Todos::DueDate).date())
                    .col(ColumnDef::new(Todos::DueTime).time())
                    .col(
                        ColumnDef::new(Todos::ProgressPercent)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Todos::AssignedTo).integer())
                    .col(ColumnDef::new(Todos::CreatedBy).integer())
                    .col(ColumnDef::new(Todos::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Todos::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Todos::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_todos_wedding_id")
                            .from(Todos::Table, Todos::WeddingId)
                            .to(Weddings::Table, Weddings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_todos_category_id")
                            .from(Todos::Table, Todos::CategoryId)
                            .to(TodoCategories::Table, TodoCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_todos_assigned_to")
                            .from(Todos::Table, Todos::AssignedTo)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_todos_created_by")
                            .from(Todos::Table, Todos::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_todos_wedding_status")
                    .table(Todos::Table)
                    .col(Todos::WeddingId)
                    .col(Todos::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChecklistItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChecklistItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChecklistItems::TodoId).integer().not_null())
                    .col(ColumnDef::new(ChecklistItems::Title).string().not_null())
                    .col(
                        ColumnDef::new(ChecklistItems::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ChecklistItems::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ChecklistItems::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChecklistItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checklist_items_todo_id")
                            .from(ChecklistItems::Table, ChecklistItems::TodoId)
                            .to(Todos::Table, Todos::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subtasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subtasks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subtasks::TodoId).integer().not_null())
                    .col(ColumnDef::new(Subtasks::Title).string().not_null())
                    .col(
                        ColumnDef::new(Subtasks::Status)
                            .string()
                            .not_null()
                            .default("not_started"),
                    )
                    .col(ColumnDef::new(Subtasks::DueDate).date())
                    .col(ColumnDef::new(Subtasks::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Subtasks::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subtasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subtasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subtasks_todo_id")
                            .from(Subtasks::Table, Subtasks::TodoId)
                            .to(Todos::Table, Todos::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TodoAttachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TodoAttachments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TodoAttachments::TodoId).integer().not_null())
                    .col(ColumnDef::new(TodoAttachments::OriginalName).string().not_null())
                    .col(ColumnDef::new(TodoAttachments::StoredName).string().not_null())
                    .col(ColumnDef::new(TodoAttachments::ContentType).string().not_null())
                    .col(ColumnDef::new(TodoAttachments::SizeBytes).big_integer().not_null())
                    .col(ColumnDef::new(TodoAttachments::Checksum).string().not_null())
                    .col(ColumnDef::new(TodoAttachments::UploadedBy).integer())
                    .col(
                        ColumnDef::new(TodoAttachments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_todo_attachments_todo_id")
                            .from(TodoAttachments::Table, TodoAttachments::TodoId)
                            .to(Todos::Table, Todos::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TodoAttachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subtasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChecklistItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Todos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TodoCategories::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum TodoCategories {
    Table,
    Id,
    WeddingId,
    Name,
    Color,
    SortOrder,
    CreatedAt,
}

#[derive(Iden)]
enum Todos {
    Table,
    Id,
    WeddingId,
    CategoryId,
    Title,
    Description,
    Status,
    Priority,
    DueDate,
    DueTime,
    ProgressPercent,
    AssignedTo,
    CreatedBy,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ChecklistItems {
    Table,
    Id,
    TodoId,
    Title,
    IsCompleted,
    CompletedAt,
    SortOrder,
    CreatedAt,
}

#[derive(Iden)]
enum Subtasks {
    Table,
    Id,
    TodoId,
    Title,
    Status,
    DueDate,
    CompletedAt,
    SortOrder,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TodoAttachments {
    Table,
    Id,
    TodoId,
    OriginalName,
    StoredName,
    ContentType,
    SizeBytes,
    Checksum,
    UploadedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Weddings {
    Table,
    Id,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
