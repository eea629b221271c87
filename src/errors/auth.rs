//! Authentication error types
//!
//! Failures raised while checking credentials or bearer tokens. They convert
//! into [`CoreError`] so handlers only ever deal with one error type.

use thiserror::Error;

use super::core_error::CoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Email/password pair did not match
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account exists but has been deactivated
    #[error("Account is deactivated")]
    AccountDeactivated,

    /// No Authorization header or unsupported scheme
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Authentication token has expired")]
    TokenExpired,

    /// A refresh token was presented where an access token is needed or vice versa
    #[error("Wrong token type: expected {expected}")]
    WrongTokenType { expected: &'static str },

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl AuthError {
    /// Check if this is an authentication error (401)
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AuthenticationRequired
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::WrongTokenType { .. }
        )
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AccountDeactivated => CoreError::forbidden(err.to_string()),
            AuthError::Database(db_err) => db_err.into(),
            AuthError::TokenGeneration(_) | AuthError::Hashing(_) => {
                CoreError::internal(err.to_string())
            }
            other => CoreError::unauthorized(other.to_string()),
        }
    }
}
