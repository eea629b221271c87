pub mod app;
pub mod error;
pub mod handlers;

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::database::{connection::*, migrations::Migrator};
use crate::services::notification_service::SweepReport;
use crate::services::NotificationService;

#[derive(Subcommand, Debug)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

pub async fn start_server(port: u16, database_path: &str, cors_origin: Option<&str>) -> Result<()> {
    let config = AppConfig::from_env()?;
    info!(environment = ?config.environment, "Loaded configuration");

    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    if config.sweep_interval_secs > 0 {
        spawn_sweeper(db.clone(), Duration::from_secs(config.sweep_interval_secs));
    } else {
        info!("Background due-date sweep disabled");
    }

    let app = app::create_app(db, config, cors_origin).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically raise due-date notifications for every wedding
fn spawn_sweeper(db: DatabaseConnection, every: Duration) {
    info!(interval_secs = every.as_secs(), "Starting background due-date sweep");
    tokio::spawn(async move {
        let service = NotificationService::new(db);
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(err) = service.sweep_all(Utc::now()).await {
                warn!(error = %err, "background sweep failed");
            }
        }
    });
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                              - Health check");
    info!("  /api/v1/auth/*                       - Registration, login, tokens");
    info!("  /api/v1/weddings/*                   - Weddings, guests, seating, todos, budget, vendors, registry, exports");
    info!("  /api/v1/notifications/*              - Notifications, preferences, event stream");
    info!("  /api/v1/public/*                     - Public RSVP and registry pages");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}

/// One-off due-date sweep, for a single wedding or all of them
pub async fn sweep_notifications(database_path: &str, wedding_id: Option<i32>) -> Result<SweepReport> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;
    setup_database(&db).await?;

    let service = NotificationService::new(db);
    let now = Utc::now();
    let report = match wedding_id {
        Some(id) => service.sweep_wedding(id, now).await?,
        None => service.sweep_all(now).await?,
    };

    info!(
        todos_checked = report.todos_checked,
        created = report.created,
        "Sweep completed"
    );
    Ok(report)
}
