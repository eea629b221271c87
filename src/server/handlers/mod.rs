pub mod auth;
pub mod budget;
pub mod exports;
pub mod guests;
pub mod health;
pub mod notifications;
pub mod public;
pub mod registry;
pub mod seating;
pub mod todos;
pub mod vendors;
pub mod weddings;

use crate::errors::CoreResult;
use crate::server::app::AppState;
use crate::services::{check_wedding_access, Access, WeddingAccess};
use crate::auth::AuthUser;

/// Resolve the wedding in the path through the caller's membership
pub(crate) async fn wedding_access(
    state: &AppState,
    user: &AuthUser,
    wedding_id: i32,
    access: Access,
) -> CoreResult<WeddingAccess> {
    check_wedding_access(&state.db, user.id(), wedding_id, access).await
}
