//! Shared setup for the HTTP integration tests

#![allow(dead_code)]

use anyhow::Result;
use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use tempfile::TempDir;

use weddingdesk::config::AppConfig;
use weddingdesk::database::connection::setup_database;
use weddingdesk::server::app::create_app;

pub const PASSWORD: &str = "correct-horse-battery";

/// A running app over a temp-file database. The directory lives as long as
/// the struct.
pub struct TestApp {
    pub server: TestServer,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let mut opt = ConnectOptions::new(db_url);
        opt.sqlx_logging(false);
        let db = Database::connect(opt).await?;
        setup_database(&db).await?;

        let config = AppConfig::for_tests(dir.path().join("uploads"));
        let app = create_app(db, config, Some("*")).await?;
        let server = TestServer::new(app)?;

        Ok(Self { server, _dir: dir })
    }

    /// Register an account and return an access token for it
    pub async fn user(&self, username: &str) -> String {
        let email = format!("{}@example.com", username);
        let response = self
            .server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": email,
                "username": username,
                "password": PASSWORD,
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let response = self
            .server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        body["access"].as_str().unwrap_or_default().to_string()
    }

    pub fn get(&self, path: &str, token: &str) -> TestRequest {
        self.server.get(path).add_header(AUTHORIZATION, bearer(token))
    }

    pub fn post(&self, path: &str, token: &str) -> TestRequest {
        self.server.post(path).add_header(AUTHORIZATION, bearer(token))
    }

    pub fn patch(&self, path: &str, token: &str) -> TestRequest {
        self.server.patch(path).add_header(AUTHORIZATION, bearer(token))
    }

    pub fn delete(&self, path: &str, token: &str) -> TestRequest {
        self.server.delete(path).add_header(AUTHORIZATION, bearer(token))
    }

    /// Create a wedding owned by the token's user and return its id
    pub async fn wedding(&self, token: &str) -> i64 {
        let response = self
            .post("/api/v1/weddings", token)
            .json(&json!({
                "title": "Sam & Alex",
                "partner_one_name": "Sam",
                "partner_two_name": "Alex",
                "currency": "eur",
                "total_budget_cents": 2_000_000,
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body: Value = response.json();
        body["id"].as_i64().unwrap_or_default()
    }

    pub async fn guest(&self, token: &str, wedding_id: i64, body: Value) -> Value {
        let response = self
            .post(&format!("/api/v1/weddings/{}/guests", wedding_id), token)
            .json(&body)
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json()
    }
}

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap_or(HeaderValue::from_static(""))
}
