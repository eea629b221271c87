//! HTTP tests for accounts, weddings, guests and the public RSVP page

mod common;

use anyhow::Result;
use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let app = TestApp::new().await?;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "weddingdesk");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_requests_without_credentials_are_rejected() -> Result<()> {
    let app = TestApp::new().await?;

    let response = app.server.get("/api/v1/weddings").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "unauthorized");

    let response = app
        .server
        .get("/api/v1/weddings")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_register_validation_and_duplicates() -> Result<()> {
    let app = TestApp::new().await?;
    app.user("sam").await;

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "sam@example.com", "username": "sam2", "password": "long-enough" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "new@example.com", "username": "new", "password": "short" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["fields"]["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_refresh_and_legacy_tokens() -> Result<()> {
    let app = TestApp::new().await?;
    app.user("sam").await;

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "sam@example.com", "password": common::PASSWORD }))
        .await;
    let tokens: Value = response.json();
    let access = tokens["access"].as_str().unwrap().to_string();
    let refresh = tokens["refresh"].as_str().unwrap().to_string();
    assert!(tokens["user"]["password_hash"].is_null());

    // A refresh token is not accepted as an access token
    let response = app.get("/api/v1/auth/me", &refresh).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh": refresh }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let renewed = body["access"].as_str().unwrap().to_string();
    let response = app.get("/api/v1/auth/me", &renewed).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // Legacy "Token <key>" credentials work until revoked
    let response = app.post("/api/v1/auth/token", &access).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let issued: Value = response.json();
    let key = issued["token"].as_str().unwrap().to_string();
    let legacy = HeaderValue::from_str(&format!("Token {}", key))?;

    let response = app
        .server
        .get("/api/v1/auth/me")
        .add_header(AUTHORIZATION, legacy.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let me: Value = response.json();
    assert_eq!(me["username"], "sam");

    let response = app.delete("/api/v1/auth/token", &access).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .server
        .get("/api/v1/auth/me")
        .add_header(AUTHORIZATION, legacy)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_weddings_are_isolated_between_users() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let stranger = app.user("stranger").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app.get(&format!("/api/v1/weddings/{}", wedding_id), &owner).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let wedding: Value = response.json();
    assert_eq!(wedding["role"], "owner");
    assert_eq!(wedding["currency"], "EUR");

    let response = app.get(&format!("/api/v1/weddings/{}", wedding_id), &stranger).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = app.get("/api/v1/weddings", &stranger).await;
    let weddings: Vec<Value> = response.json();
    assert!(weddings.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_viewers_can_read_but_not_write() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let viewer = app.user("viewer").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app
        .post(&format!("/api/v1/weddings/{}/members", wedding_id), &owner)
        .json(&json!({ "email": "viewer@example.com", "role": "viewer" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let response = app
        .get(&format!("/api/v1/weddings/{}/guests", wedding_id), &viewer)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .post(&format!("/api/v1/weddings/{}/guests", wedding_id), &viewer)
        .json(&json!({ "first_name": "Ana", "last_name": "Lee" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .delete(&format!("/api/v1/weddings/{}", wedding_id), &viewer)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_guest_crud_and_filters() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    app.guest(&owner, wedding_id, json!({ "first_name": "Ana", "last_name": "Lee", "side": "partner_one" })).await;
    app.guest(&owner, wedding_id, json!({ "first_name": "Ben", "last_name": "Ng", "side": "partner_two" })).await;
    let carl = app
        .guest(&owner, wedding_id, json!({ "first_name": "Carl", "last_name": "Diaz", "side": "partner_two" }))
        .await;

    let response = app
        .get(&format!("/api/v1/weddings/{}/guests?side=partner_two&ordering=last_name", wedding_id), &owner)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let page: Value = response.json();
    assert_eq!(page["count"], 2);
    assert_eq!(page["results"][0]["last_name"], "Diaz");
    assert_eq!(page["results"][1]["last_name"], "Ng");

    let response = app
        .get(&format!("/api/v1/weddings/{}/guests?ordering=shoe_size", wedding_id), &owner)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let guest_path = format!("/api/v1/weddings/{}/guests/{}", wedding_id, carl["id"]);
    let response = app
        .patch(&guest_path, &owner)
        .json(&json!({ "plus_one_attending": true }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .patch(&guest_path, &owner)
        .json(&json!({ "plus_one_allowed": true, "plus_one_name": "Dana" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["plus_one_name"], "Dana");

    let response = app.delete(&guest_path, &owner).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let response = app.get(&guest_path, &owner).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_public_rsvp_notifies_once() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;
    let guest = app
        .guest(&owner, wedding_id, json!({ "first_name": "Ana", "last_name": "Lee", "email": "ana@example.com" }))
        .await;
    let code = guest["user_code"].as_str().unwrap().to_string();

    let response = app.server.get(&format!("/api/v1/public/invitations/{}", code)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let invitation: Value = response.json();
    assert_eq!(invitation["attendance_status"], "pending");
    assert_eq!(invitation["wedding"]["title"], "Sam & Alex");
    assert_eq!(invitation["rsvp_open"], true);

    for _ in 0..2 {
        let response = app
            .server
            .post(&format!("/api/v1/public/invitations/{}", code))
            .json(&json!({ "attendance_status": "yes", "meal_choice": "fish" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let response = app.get("/api/v1/notifications?notification_type=rsvp_accepted", &owner).await;
    let page: Value = response.json();
    assert_eq!(page["count"], 1);

    let response = app.get("/api/v1/notifications/unread-count", &owner).await;
    let unread: Value = response.json();
    assert_eq!(unread["unread"], 1);

    let response = app
        .get(&format!("/api/v1/weddings/{}/guests/summary", wedding_id), &owner)
        .await;
    let summary: Value = response.json();
    assert_eq!(summary["attending"], 1);
    assert_eq!(summary["expected_headcount"], 1);
    assert_eq!(summary["meal_choices"]["fish"], 1);

    let response = app.server.get("/api/v1/public/invitations/not-a-code").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_reminders_skip_guests_who_responded() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;
    let waiting = app
        .guest(&owner, wedding_id, json!({ "first_name": "Ana", "last_name": "Lee", "email": "ana@example.com" }))
        .await;
    let no_email = app
        .guest(&owner, wedding_id, json!({ "first_name": "Ben", "last_name": "Ng" }))
        .await;
    let answered = app
        .guest(&owner, wedding_id, json!({ "first_name": "Cy", "last_name": "Ro", "email": "cy@example.com" }))
        .await;

    let response = app
        .server
        .post(&format!("/api/v1/public/invitations/{}", answered["user_code"].as_str().unwrap()))
        .json(&json!({ "attendance_status": "no" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .post(&format!("/api/v1/weddings/{}/guests/reminders", wedding_id), &owner)
        .json(&json!({ "guest_ids": [waiting["id"], no_email["id"], answered["id"]] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let outcome: Value = response.json();
    assert_eq!(outcome["succeeded"], json!([waiting["id"]]));

    let failed = outcome["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0]["id"], no_email["id"]);
    assert_eq!(failed[0]["error"], "Guest has no email address");
    assert_eq!(failed[1]["id"], answered["id"]);
    assert_eq!(failed[1]["error"], "Guest has already responded");

    let response = app
        .get(&format!("/api/v1/weddings/{}/guests/{}", wedding_id, waiting["id"]), &owner)
        .await;
    let reminded: Value = response.json();
    assert!(!reminded["last_reminder_at"].is_null());

    let response = app
        .get(&format!("/api/v1/weddings/{}/guests/{}", wedding_id, answered["id"]), &owner)
        .await;
    let skipped: Value = response.json();
    assert!(skipped["last_reminder_at"].is_null());
    Ok(())
}

#[tokio::test]
async fn test_public_rsvp_after_deadline_is_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app
        .patch(&format!("/api/v1/weddings/{}", wedding_id), &owner)
        .json(&json!({ "rsvp_deadline": "2001-01-01" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let guest = app
        .guest(&owner, wedding_id, json!({ "first_name": "Ana", "last_name": "Lee" }))
        .await;
    let code = guest["user_code"].as_str().unwrap().to_string();

    let response = app
        .server
        .post(&format!("/api/v1/public/invitations/{}", code))
        .json(&json!({ "attendance_status": "no" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_exports_have_file_headers() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;
    app.guest(&owner, wedding_id, json!({ "first_name": "Ana", "last_name": "Lee" })).await;

    let response = app
        .get(&format!("/api/v1/weddings/{}/exports/guests.csv", wedding_id), &owner)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.header("content-type").to_str()?.starts_with("text/csv"));
    assert!(response.text().contains("Lee"));

    let response = app
        .get(&format!("/api/v1/weddings/{}/exports/guest-report.pdf", wedding_id), &owner)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "application/pdf");
    assert!(response.as_bytes().starts_with(b"%PDF"));
    Ok(())
}
