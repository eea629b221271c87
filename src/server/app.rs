use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::JwtService;
use crate::config::AppConfig;

use super::handlers::{
    auth, budget, exports, guests, health, notifications, public, registry, seating, todos,
    vendors, weddings,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt: JwtService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            jwt: JwtService::new(config.jwt.clone()),
            config: Arc::new(config),
        }
    }
}

pub async fn create_app(
    db: DatabaseConnection,
    config: AppConfig,
    cors_origin: Option<&str>,
) -> Result<Router> {
    // Multipart framing on top of the largest accepted file
    let body_limit = config.uploads.max_bytes + 64 * 1024;
    let state = AppState::new(db, config);

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin '{}'", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/token", post(auth::issue_token).delete(auth::revoke_tokens))
        .route("/auth/me", get(auth::me))

        // Weddings and members
        .route("/weddings", get(weddings::list_weddings).post(weddings::create_wedding))
        .route(
            "/weddings/:wedding_id",
            get(weddings::get_wedding)
                .patch(weddings::update_wedding)
                .delete(weddings::delete_wedding),
        )
        .route("/weddings/:wedding_id/public-code", post(weddings::regenerate_public_code))
        .route(
            "/weddings/:wedding_id/members",
            get(weddings::list_members).post(weddings::add_member),
        )
        .route(
            "/weddings/:wedding_id/members/:user_id",
            axum::routing::delete(weddings::remove_member),
        )

        // Guests
        .route(
            "/weddings/:wedding_id/guests",
            get(guests::list_guests).post(guests::create_guest),
        )
        .route("/weddings/:wedding_id/guests/summary", get(guests::guest_summary))
        .route("/weddings/:wedding_id/guests/reminders", post(guests::send_reminders))
        .route(
            "/weddings/:wedding_id/guests/invitations-sent",
            post(guests::mark_invitations_sent),
        )
        .route(
            "/weddings/:wedding_id/guests/:guest_id",
            get(guests::get_guest)
                .patch(guests::update_guest)
                .delete(guests::delete_guest),
        )
        .route("/weddings/:wedding_id/guests/:guest_id/rsvp", post(guests::rsvp))
        .route(
            "/weddings/:wedding_id/guests/:guest_id/children",
            post(guests::add_child),
        )
        .route(
            "/weddings/:wedding_id/guests/:guest_id/children/:child_id",
            patch(guests::update_child).delete(guests::delete_child),
        )

        // Seating
        .route(
            "/weddings/:wedding_id/tables",
            get(seating::list_tables).post(seating::create_table),
        )
        .route(
            "/weddings/:wedding_id/tables/:table_id",
            get(seating::get_table)
                .patch(seating::update_table)
                .delete(seating::delete_table),
        )
        .route(
            "/weddings/:wedding_id/seating/assignments",
            get(seating::list_assignments).post(seating::assign),
        )
        .route(
            "/weddings/:wedding_id/seating/assignments/:assignment_id",
            patch(seating::move_assignment).delete(seating::unassign),
        )
        .route("/weddings/:wedding_id/seating/chart", get(seating::chart))

        // Todos
        .route(
            "/weddings/:wedding_id/categories",
            get(todos::list_categories).post(todos::create_category),
        )
        .route(
            "/weddings/:wedding_id/categories/:category_id",
            patch(todos::update_category).delete(todos::delete_category),
        )
        .route(
            "/weddings/:wedding_id/todos",
            get(todos::list_todos).post(todos::create_todo),
        )
        .route("/weddings/:wedding_id/todos/timeline", get(todos::timeline))
        .route("/weddings/:wedding_id/todos/bulk-status", post(todos::bulk_status))
        .route(
            "/weddings/:wedding_id/todos/:todo_id",
            get(todos::get_todo)
                .patch(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route("/weddings/:wedding_id/todos/:todo_id/status", post(todos::set_status))
        .route("/weddings/:wedding_id/todos/:todo_id/reopen", post(todos::reopen))
        .route(
            "/weddings/:wedding_id/todos/:todo_id/checklist",
            post(todos::add_checklist_item),
        )
        .route(
            "/weddings/:wedding_id/todos/:todo_id/checklist/:item_id",
            patch(todos::update_checklist_item).delete(todos::delete_checklist_item),
        )
        .route(
            "/weddings/:wedding_id/todos/:todo_id/subtasks",
            post(todos::add_subtask),
        )
        .route(
            "/weddings/:wedding_id/todos/:todo_id/subtasks/:subtask_id",
            patch(todos::update_subtask).delete(todos::delete_subtask),
        )
        .route(
            "/weddings/:wedding_id/todos/:todo_id/attachments",
            get(todos::list_attachments).post(todos::upload_attachment),
        )
        .route(
            "/weddings/:wedding_id/todos/:todo_id/attachments/:attachment_id",
            get(todos::download_attachment).delete(todos::delete_attachment),
        )

        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/mark-all-read", post(notifications::mark_all_read))
        .route(
            "/notifications/preferences",
            get(notifications::get_preferences).patch(notifications::update_preferences),
        )
        .route("/notifications/stream", get(notifications::stream))
        .route("/notifications/:notification_id/read", post(notifications::mark_read))
        .route(
            "/notifications/:notification_id",
            axum::routing::delete(notifications::delete_notification),
        )
        .route(
            "/weddings/:wedding_id/notifications/sweep",
            post(notifications::sweep_wedding),
        )

        // Budget
        .route(
            "/weddings/:wedding_id/budget/categories",
            get(budget::list_categories).post(budget::create_category),
        )
        .route(
            "/weddings/:wedding_id/budget/categories/:category_id",
            patch(budget::update_category).delete(budget::delete_category),
        )
        .route(
            "/weddings/:wedding_id/budget/expenses",
            get(budget::list_expenses).post(budget::create_expense),
        )
        .route(
            "/weddings/:wedding_id/budget/expenses/:expense_id",
            get(budget::get_expense)
                .patch(budget::update_expense)
                .delete(budget::delete_expense),
        )
        .route("/weddings/:wedding_id/budget/summary", get(budget::summary))

        // Vendors
        .route(
            "/weddings/:wedding_id/vendors",
            get(vendors::list_vendors).post(vendors::create_vendor),
        )
        .route(
            "/weddings/:wedding_id/vendors/:vendor_id",
            get(vendors::get_vendor)
                .patch(vendors::update_vendor)
                .delete(vendors::delete_vendor),
        )

        // Registry
        .route(
            "/weddings/:wedding_id/registry",
            get(registry::list_items).post(registry::create_item),
        )
        .route(
            "/weddings/:wedding_id/registry/:item_id",
            get(registry::get_item)
                .patch(registry::update_item)
                .delete(registry::delete_item),
        )
        .route(
            "/weddings/:wedding_id/registry/:item_id/unclaim",
            post(registry::unclaim_item),
        )

        // Exports
        .route(
            "/weddings/:wedding_id/exports/guest-report.pdf",
            get(exports::guest_report_pdf),
        )
        .route("/weddings/:wedding_id/exports/guests.csv", get(exports::guests_csv))

        // Public pages, keyed by invitation or wedding codes
        .route(
            "/public/invitations/:user_code",
            get(public::get_invitation).post(public::submit_rsvp),
        )
        .route("/public/registry/:public_code", get(public::get_registry))
        .route(
            "/public/registry/:public_code/items/:item_id/claim",
            post(public::claim_item),
        )
        .route(
            "/public/registry/:public_code/items/:item_id/unclaim",
            post(public::unclaim_item),
        )
}
