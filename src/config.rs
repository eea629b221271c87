//! Runtime configuration read from the environment

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use tracing::warn;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("Unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub access_minutes: i64,
    pub refresh_days: i64,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub legacy_token_hours: i64,
    pub password_hash_cost: u32,
    pub uploads: UploadConfig,
    /// Interval of the background due-date sweep; 0 disables it
    pub sweep_interval_secs: u64,
    pub sse_poll_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let environment = match std::env::var("WEDDINGDESK_ENV") {
            Ok(value) => value.parse().map_err(|e: String| anyhow!(e))?,
            Err(_) => Environment::Development,
        };

        let secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if secret.len() >= MIN_SECRET_LEN => secret,
            Ok(_) => {
                return Err(anyhow!(
                    "JWT_SECRET must be at least {} characters long",
                    MIN_SECRET_LEN
                ))
            }
            Err(_) if environment.is_production() => {
                return Err(anyhow!("JWT_SECRET must be set in production"))
            }
            Err(_) => {
                warn!("JWT_SECRET not set, generating a temporary development key");
                format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
            }
        };

        Ok(Self {
            environment,
            jwt: JwtConfig {
                secret,
                issuer: env_or("JWT_ISSUER", "weddingdesk".to_string()),
                access_minutes: env_parse("JWT_ACCESS_MINUTES", 60),
                refresh_days: env_parse("JWT_REFRESH_DAYS", 7),
            },
            legacy_token_hours: env_parse("LEGACY_TOKEN_HOURS", 24),
            password_hash_cost: env_parse("BCRYPT_COST", bcrypt::DEFAULT_COST),
            uploads: UploadConfig {
                dir: PathBuf::from(env_or("WEDDINGDESK_UPLOAD_DIR", "uploads".to_string())),
                max_bytes: env_parse("WEDDINGDESK_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
                allowed_extensions: default_extensions(),
            },
            sweep_interval_secs: env_parse("WEDDINGDESK_SWEEP_INTERVAL_SECS", 60),
            sse_poll_secs: env_parse("WEDDINGDESK_SSE_POLL_SECS", 5).max(1),
        })
    }

    /// Fixed configuration for tests: known secret, uploads in `upload_dir`,
    /// no background sweep
    pub fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            environment: Environment::Development,
            jwt: JwtConfig {
                secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
                issuer: "weddingdesk-test".to_string(),
                access_minutes: 15,
                refresh_days: 1,
            },
            legacy_token_hours: 1,
            password_hash_cost: 4,
            uploads: UploadConfig {
                dir: upload_dir,
                max_bytes: 64 * 1024,
                allowed_extensions: default_extensions(),
            },
            sweep_interval_secs: 0,
            sse_poll_secs: 1,
        }
    }
}

fn default_extensions() -> Vec<String> {
    [
        "pdf", "png", "jpg", "jpeg", "gif", "webp", "doc", "docx", "xls", "xlsx", "txt", "csv",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing() {
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("Staging".parse::<Environment>(), Ok(Environment::Staging));
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_config_disables_sweep() {
        let config = AppConfig::for_tests(PathBuf::from("/tmp/uploads"));
        assert_eq!(config.sweep_interval_secs, 0);
        assert!(config.jwt.secret.len() >= MIN_SECRET_LEN);
        assert!(config.uploads.allowed_extensions.iter().any(|e| e == "pdf"));
    }
}
