use sea_orm_migration::prelude::*;

mod m001_accounts;
mod m002_weddings_and_guests;
mod m003_seating;
mod m004_todos;
mod m005_notifications;
mod m006_budget_vendors_registry;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_accounts::Migration),
            Box::new(m002_weddings_and_guests::Migration),
            Box::new(m003_seating::Migration),
            Box::new(m004_todos::Migration),
            Box::new(m005_notifications::Migration),
            Box::new(m006_budget_vendors_registry::Migration),
        ]
    }
}
