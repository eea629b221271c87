use sea_orm::{Database, DatabaseConnection};

/// In-memory SQLite database with every migration applied.
///
/// A single pooled connection keeps the in-memory database alive for the
/// whole test.
pub async fn setup_test_db() -> DatabaseConnection {
    let mut opt = sea_orm::ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("Failed to connect to test database");

    super::setup_database(&db)
        .await
        .expect("Failed to run migrations");

    db
}
