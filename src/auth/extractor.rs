use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};

use crate::database::entities::users;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::services::auth_service::AuthService;

/// The authenticated caller.
///
/// Accepts `Authorization: Bearer <access jwt>` or the legacy
/// `Authorization: Token <key>` form.
#[derive(Debug, Clone)]
pub struct AuthUser(pub users::Model);

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let user = AuthService::new(state.db.clone())
            .authenticate_header(&state.jwt, header)
            .await
            .map_err(|err| {
                tracing::debug!(uri = %parts.uri, error = %err, "authentication failed");
                CoreError::from(err)
            })?;

        let user = AuthUser(user);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
