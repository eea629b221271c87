use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::errors::{CoreError, CoreErrorKind};

pub fn status_for(kind: CoreErrorKind) -> StatusCode {
    match kind {
        CoreErrorKind::NotFound => StatusCode::NOT_FOUND,
        CoreErrorKind::Validation => StatusCode::BAD_REQUEST,
        CoreErrorKind::Conflict => StatusCode::CONFLICT,
        CoreErrorKind::Forbidden => StatusCode::FORBIDDEN,
        CoreErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        CoreErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        CoreErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);

        let body = if kind == CoreErrorKind::Internal {
            tracing::error!(error = %self, source = ?std::error::Error::source(&self), "request failed");
            json!({
                "error": kind.as_str(),
                "message": "Internal server error",
            })
        } else {
            json!({
                "error": kind.as_str(),
                "message": self.message(),
                "fields": self.fields(),
            })
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(CoreErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(CoreErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(CoreErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(CoreErrorKind::Unauthorized), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_errors_hide_their_message() {
        let response = CoreError::internal("db password is hunter2").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
