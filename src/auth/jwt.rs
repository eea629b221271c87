use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::errors::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn generate_access_token(&self, user_id: i32, email: &str) -> Result<String, AuthError> {
        self.generate(
            user_id,
            email,
            TokenType::Access,
            Duration::minutes(self.config.access_minutes),
        )
    }

    pub fn generate_refresh_token(&self, user_id: i32, email: &str) -> Result<String, AuthError> {
        self.generate(
            user_id,
            email,
            TokenType::Refresh,
            Duration::days(self.config.refresh_days),
        )
    }

    /// Lifetime of access tokens in seconds
    pub fn access_expires_in(&self) -> i64 {
        self.config.access_minutes * 60
    }

    fn generate(
        &self,
        user_id: i32,
        email: &str,
        token_type: TokenType,
        lifetime: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            token_type: token_type.as_str().to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Verify signature, issuer and expiry, then check the token is of the
    /// expected type.
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        if data.claims.token_type != expected.as_str() {
            return Err(AuthError::WrongTokenType {
                expected: expected.as_str(),
            });
        }

        Ok(data.claims)
    }
}

/// Split an Authorization header into its scheme and credential
pub fn parse_authorization(header: &str) -> Option<(&str, &str)> {
    let (scheme, credential) = header.trim().split_once(' ')?;
    let credential = credential.trim();
    if credential.is_empty() {
        return None;
    }
    Some((scheme, credential))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "unit-test-secret-with-enough-length-0123".to_string(),
            issuer: "weddingdesk-test".to_string(),
            access_minutes: 5,
            refresh_days: 1,
        })
    }

    #[test]
    fn access_token_round_trip() {
        let jwt = service();
        let token = jwt.generate_access_token(42, "a@example.com").unwrap();
        let claims = jwt.validate(&token, TokenType::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.email, "a@example.com");
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let jwt = service();
        let token = jwt.generate_refresh_token(1, "a@example.com").unwrap();
        assert!(matches!(
            jwt.validate(&token, TokenType::Access),
            Err(AuthError::WrongTokenType { expected: "access" })
        ));
        assert!(jwt.validate(&token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let other = JwtService::new(JwtConfig {
            secret: "a-completely-different-secret-value-xyz".to_string(),
            issuer: "weddingdesk-test".to_string(),
            access_minutes: 5,
            refresh_days: 1,
        });
        let token = other.generate_access_token(1, "a@example.com").unwrap();
        assert!(matches!(
            service().validate(&token, TokenType::Access),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn authorization_header_parsing() {
        assert_eq!(parse_authorization("Bearer abc"), Some(("Bearer", "abc")));
        assert_eq!(parse_authorization("Token  k1 "), Some(("Token", "k1")));
        assert_eq!(parse_authorization("Bearer"), None);
        assert_eq!(parse_authorization("Bearer   "), None);
    }
}
