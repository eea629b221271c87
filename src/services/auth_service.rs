use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::jwt::parse_authorization;
use crate::auth::{JwtService, TokenType};
use crate::database::entities::{api_tokens, users};
use crate::errors::{AuthError, CoreError, CoreResult};

use super::validation::ValidationService;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub expires_in: i64,
    pub user: users::Model,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegacyToken {
    pub token: String,
    pub expires_at: chrono::DateTime<Utc>,
}

/// Accounts, credentials and token issuance
#[derive(Clone)]
pub struct AuthService {
    db: DatabaseConnection,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            hash_cost: DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn hash_password(&self, password: &str) -> CoreResult<String> {
        ValidationService::validate_password(password)?;
        hash(password, self.hash_cost)
            .map_err(|e| AuthError::Hashing(e.to_string()).into())
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        verify(password, hash).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    pub async fn register(&self, request: RegisterRequest) -> CoreResult<users::Model> {
        let email = ValidationService::validate_email("email", &request.email)?;
        let username = ValidationService::validate_username(&request.username)?;
        let display_name = match request.display_name {
            Some(name) => ValidationService::required_text("display_name", &name, 100)?,
            None => username.clone(),
        };
        let password_hash = self.hash_password(&request.password)?;

        if users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?
            .is_some()
        {
            return Err(CoreError::conflict("A user with this email already exists")
                .with_field("email", "Already registered"));
        }

        if users::Entity::find()
            .filter(users::Column::Username.eq(username.as_str()))
            .one(&self.db)
            .await?
            .is_some()
        {
            return Err(CoreError::conflict("This username is already taken")
                .with_field("username", "Already taken"));
        }

        let mut user = users::ActiveModel::new();
        user.email = Set(email);
        user.username = Set(username);
        user.display_name = Set(display_name);
        user.password_hash = Set(password_hash);

        let user = user.insert(&self.db).await?;
        info!(user_id = user.id, "registered user");
        Ok(user)
    }

    /// Check an email/password pair and return the active account
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<users::Model, AuthError> {
        let email = email.trim().to_lowercase();
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let active: users::ActiveModel = user.into();
        Ok(active.set_last_login().update(&self.db).await?)
    }

    pub async fn login(&self, jwt: &JwtService, request: LoginRequest) -> CoreResult<TokenPair> {
        let user = self.authenticate(&request.email, &request.password).await?;
        Ok(TokenPair {
            access: jwt.generate_access_token(user.id, &user.email)?,
            refresh: jwt.generate_refresh_token(user.id, &user.email)?,
            expires_in: jwt.access_expires_in(),
            user,
        })
    }

    /// Exchange a refresh token for a fresh access token
    pub async fn refresh(&self, jwt: &JwtService, refresh_token: &str) -> CoreResult<String> {
        let claims = jwt.validate(refresh_token, TokenType::Refresh)?;
        let user = self.active_user(claims.user_id()?).await?;
        Ok(jwt.generate_access_token(user.id, &user.email)?)
    }

    pub async fn issue_legacy_token(&self, user_id: i32, lifetime_hours: i64) -> CoreResult<LegacyToken> {
        let now = Utc::now();
        let token = api_tokens::ActiveModel {
            key: Set(Uuid::new_v4().simple().to_string()),
            user_id: Set(user_id),
            created_at: Set(now),
            expires_at: Set(now + Duration::hours(lifetime_hours)),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(LegacyToken {
            token: token.key,
            expires_at: token.expires_at,
        })
    }

    pub async fn revoke_legacy_tokens(&self, user_id: i32) -> CoreResult<u64> {
        let result = api_tokens::Entity::delete_many()
            .filter(api_tokens::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Resolve an Authorization header value into the calling user
    pub async fn authenticate_header(
        &self,
        jwt: &JwtService,
        header: Option<&str>,
    ) -> Result<users::Model, AuthError> {
        let header = header.ok_or(AuthError::AuthenticationRequired)?;
        let (scheme, credential) =
            parse_authorization(header).ok_or(AuthError::AuthenticationRequired)?;

        let user_id = match scheme {
            "Bearer" => jwt.validate(credential, TokenType::Access)?.user_id()?,
            "Token" => self.legacy_token_owner(credential).await?,
            _ => return Err(AuthError::AuthenticationRequired),
        };

        self.active_user(user_id).await
    }

    async fn legacy_token_owner(&self, key: &str) -> Result<i32, AuthError> {
        let token = api_tokens::Entity::find()
            .filter(api_tokens::Column::Key.eq(key))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if token.is_expired() {
            api_tokens::Entity::delete_by_id(token.id)
                .exec(&self.db)
                .await?;
            return Err(AuthError::TokenExpired);
        }
        Ok(token.user_id)
    }

    async fn active_user(&self, user_id: i32) -> Result<users::Model, AuthError> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }
        Ok(user)
    }
}
