//! Error types shared by the services and the HTTP layer
//!
//! Services return [`CoreError`], a kind-tagged error carrying a user-facing
//! message and optional per-field messages. The server maps the kind onto an
//! HTTP status; see `server::error`.
//!
//! # Examples
//!
//! ```rust
//! use weddingdesk::errors::{CoreError, CoreErrorKind};
//!
//! let err = CoreError::validation("Table 'Family' is at capacity (8)")
//!     .with_field("table_id", "Table is full");
//! assert_eq!(err.kind(), CoreErrorKind::Validation);
//! ```

pub mod auth;
pub mod core_error;

pub use auth::AuthError;
pub use core_error::{CoreError, CoreErrorKind};

/// Result type alias for service operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_result_alias() {
        let result: CoreResult<i32> = Err(CoreError::not_found("Guest", "42"));
        assert!(result.is_err());
    }

    #[test]
    fn test_auth_error_converts_to_unauthorized() {
        let err: CoreError = AuthError::InvalidCredentials.into();
        assert_eq!(err.kind(), CoreErrorKind::Unauthorized);
    }
}
