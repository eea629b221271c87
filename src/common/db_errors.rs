//! Database error categorization
//!
//! Maps `sea_orm::DbErr` onto a small set of kinds so services can turn
//! constraint violations into client errors instead of 500s.

use sea_orm::DbErr;

use crate::errors::CoreError;

/// Categories of database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Record not found (query returned no results)
    NotFound,

    /// Unique constraint violation
    UniqueViolation,

    /// Foreign key constraint violation
    ForeignKeyViolation,

    /// Database connection error
    ConnectionError,

    /// Query timeout or a locked database file
    Timeout,

    /// Unknown/other database error
    Unknown,
}

impl DbErrorKind {
    /// Categorize a sea_orm database error
    ///
    /// ```
    /// use weddingdesk::common::db_errors::DbErrorKind;
    /// use sea_orm::DbErr;
    ///
    /// let err = DbErr::RecordNotFound("guest".to_string());
    /// assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
    /// ```
    pub fn from_db_err(err: &DbErr) -> Self {
        match err {
            DbErr::RecordNotFound(_) => Self::NotFound,
            DbErr::Conn(_) => {
                if err.to_string().to_lowercase().contains("timeout") {
                    Self::Timeout
                } else {
                    Self::ConnectionError
                }
            }
            _ => {
                let msg = err.to_string().to_lowercase();
                if msg.contains("unique") || msg.contains("duplicate") {
                    Self::UniqueViolation
                } else if msg.contains("foreign key") {
                    Self::ForeignKeyViolation
                } else if msg.contains("timeout") || msg.contains("database is locked") {
                    Self::Timeout
                } else if msg.contains("connection") && msg.contains("acquire") {
                    Self::ConnectionError
                } else {
                    Self::Unknown
                }
            }
        }
    }

    /// Get appropriate HTTP status code for this error kind
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::UniqueViolation => 409,
            Self::ForeignKeyViolation => 400,
            Self::ConnectionError | Self::Timeout => 503,
            Self::Unknown => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionError | Self::Timeout)
    }
}

/// Check whether an error is a unique constraint violation
pub fn is_unique_violation(err: &DbErr) -> bool {
    DbErrorKind::from_db_err(err) == DbErrorKind::UniqueViolation
}

impl From<DbErr> for CoreError {
    fn from(err: DbErr) -> Self {
        match DbErrorKind::from_db_err(&err) {
            DbErrorKind::NotFound => CoreError::new(
                crate::errors::CoreErrorKind::NotFound,
                "Resource not found",
            ),
            DbErrorKind::UniqueViolation => {
                CoreError::conflict("Resource already exists").with_source(err)
            }
            DbErrorKind::ForeignKeyViolation => {
                CoreError::validation("Referenced resource does not exist").with_source(err)
            }
            DbErrorKind::ConnectionError | DbErrorKind::Timeout => {
                CoreError::unavailable("Database temporarily unavailable").with_source(err)
            }
            DbErrorKind::Unknown => CoreError::internal("Database error").with_source(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreErrorKind;
    use sea_orm::RuntimeErr;

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = DbErr::Exec(RuntimeErr::Internal(
            "UNIQUE constraint failed: users.email".to_string(),
        ));
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::UniqueViolation);
        assert!(is_unique_violation(&err));

        let core: CoreError = err.into();
        assert_eq!(core.kind(), CoreErrorKind::Conflict);
    }

    #[test]
    fn foreign_key_violation_maps_to_validation() {
        let err = DbErr::Exec(RuntimeErr::Internal(
            "FOREIGN KEY constraint failed".to_string(),
        ));
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::ForeignKeyViolation);
        assert_eq!(DbErrorKind::ForeignKeyViolation.http_status_code(), 400);
    }

    #[test]
    fn locked_database_is_retryable() {
        let err = DbErr::Query(RuntimeErr::Internal("database is locked".to_string()));
        let kind = DbErrorKind::from_db_err(&err);
        assert_eq!(kind, DbErrorKind::Timeout);
        assert!(kind.is_retryable());
    }
}
