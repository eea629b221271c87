//! HTTP tests for seating, todos, notifications and the gift registry

mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::TestApp;

#[tokio::test]
async fn test_full_table_rejects_with_its_name() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app
        .post(&format!("/api/v1/weddings/{}/tables", wedding_id), &owner)
        .json(&json!({ "name": "Head Table", "capacity": 2 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let table: Value = response.json();
    assert_eq!(table["seats_taken"], 0);
    assert_eq!(table["seats_available"], 2);

    let mut guest_ids = Vec::new();
    for name in ["Ana", "Ben", "Cleo"] {
        let guest = app
            .guest(&owner, wedding_id, json!({ "first_name": name, "last_name": "Guest", "attendance_status": "yes" }))
            .await;
        guest_ids.push(guest["id"].clone());
    }

    let assignments = format!("/api/v1/weddings/{}/seating/assignments", wedding_id);
    for guest_id in &guest_ids[..2] {
        let response = app
            .post(&assignments, &owner)
            .json(&json!({ "table_id": table["id"], "guest_id": guest_id }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
    }

    let response = app
        .post(&assignments, &owner)
        .json(&json!({ "table_id": table["id"], "guest_id": guest_ids[2] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("Head Table"));

    // The same guest cannot be seated twice
    let response = app
        .post(&format!("/api/v1/weddings/{}/tables", wedding_id), &owner)
        .json(&json!({ "name": "Family", "capacity": 8 }))
        .await;
    let family: Value = response.json();
    let response = app
        .post(&assignments, &owner)
        .json(&json!({ "table_id": family["id"], "guest_id": guest_ids[0] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .get(&format!("/api/v1/weddings/{}/seating/chart", wedding_id), &owner)
        .await;
    let chart: Value = response.json();
    assert_eq!(chart["total_seated"], 2);
    assert_eq!(chart["unassigned"].as_array().unwrap().len(), 1);
    assert_eq!(chart["unassigned"][0]["name"], "Cleo Guest");

    // Capacity cannot drop below the current occupancy
    let response = app
        .patch(&format!("/api/v1/weddings/{}/tables/{}", wedding_id, table["id"]), &owner)
        .json(&json!({ "capacity": 1 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_declining_releases_the_seat() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app
        .post(&format!("/api/v1/weddings/{}/tables", wedding_id), &owner)
        .json(&json!({ "name": "Garden", "capacity": 4 }))
        .await;
    let table: Value = response.json();
    let guest = app
        .guest(&owner, wedding_id, json!({ "first_name": "Ana", "last_name": "Lee" }))
        .await;

    let response = app
        .post(&format!("/api/v1/weddings/{}/seating/assignments", wedding_id), &owner)
        .json(&json!({ "table_id": table["id"], "guest_id": guest["id"], "seat_number": 3 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let response = app
        .post(&format!("/api/v1/weddings/{}/guests/{}/rsvp", wedding_id, guest["id"]), &owner)
        .json(&json!({ "attendance_status": "no" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .get(&format!("/api/v1/weddings/{}/tables/{}", wedding_id, table["id"]), &owner)
        .await;
    let table: Value = response.json();
    assert_eq!(table["seats_taken"], 0);
    Ok(())
}

#[tokio::test]
async fn test_checklist_drives_todo_progress() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app
        .post(&format!("/api/v1/weddings/{}/todos", wedding_id), &owner)
        .json(&json!({ "title": "Book the venue", "priority": "high" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let todo: Value = response.json();
    let todo_path = format!("/api/v1/weddings/{}/todos/{}", wedding_id, todo["id"]);

    let mut item_ids = Vec::new();
    for (title, done) in [("Visit", true), ("Compare quotes", false), ("Sign", false)] {
        let response = app
            .post(&format!("{}/checklist", todo_path), &owner)
            .json(&json!({ "title": title, "is_completed": done }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body: Value = response.json();
        item_ids.push(body["item"]["id"].clone());
    }

    let response = app.get(&todo_path, &owner).await;
    let detail: Value = response.json();
    assert_eq!(detail["progress_percent"], 33);
    assert_eq!(detail["checklist_items"].as_array().unwrap().len(), 3);

    // Progress is derived from the checklist, not taken from input
    let response = app
        .patch(&todo_path, &owner)
        .json(&json!({ "progress_percent": 90 }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["progress_percent"], 33);

    let mut last = Value::Null;
    for item_id in &item_ids[1..] {
        let response = app
            .patch(&format!("{}/checklist/{}", todo_path, item_id), &owner)
            .json(&json!({ "is_completed": true }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        last = response.json();
    }
    assert_eq!(last["todo"]["progress_percent"], 100);
    assert_eq!(last["todo"]["status"], "completed");
    assert!(last["todo"]["completed_at"].is_string());

    let response = app
        .patch(&todo_path, &owner)
        .json(&json!({ "status": "waiting" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app.post(&format!("{}/reopen", todo_path), &owner).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let reopened: Value = response.json();
    assert_eq!(reopened["status"], "in_progress");
    assert_eq!(reopened["progress_percent"], 100);
    assert!(reopened["completed_at"].is_null());
    Ok(())
}

#[tokio::test]
async fn test_bulk_status_reports_each_item() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let mut ids = Vec::new();
    for status in ["not_started", "completed"] {
        let response = app
            .post(&format!("/api/v1/weddings/{}/todos", wedding_id), &owner)
            .json(&json!({ "title": format!("Task {}", status), "status": status }))
            .await;
        let todo: Value = response.json();
        ids.push(todo["id"].as_i64().unwrap());
    }
    ids.push(9999);

    let response = app
        .post(&format!("/api/v1/weddings/{}/todos/bulk-status", wedding_id), &owner)
        .json(&json!({ "ids": ids, "status": "waiting" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let outcome: Value = response.json();
    assert_eq!(outcome["succeeded"], json!([ids[0]]));
    assert_eq!(outcome["failed"].as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_sweep_is_idempotent() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let yesterday = (Utc::now() - Duration::days(1)).date_naive();
    let response = app
        .post(&format!("/api/v1/weddings/{}/todos", wedding_id), &owner)
        .json(&json!({ "title": "Send invitations", "due_date": yesterday }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let sweep = format!("/api/v1/weddings/{}/notifications/sweep", wedding_id);
    let response = app.post(&sweep, &owner).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let report: Value = response.json();
    assert_eq!(report["created"], 1);

    let response = app.post(&sweep, &owner).await;
    let report: Value = response.json();
    assert_eq!(report["created"], 0);

    let response = app.get("/api/v1/notifications?notification_type=todo_overdue", &owner).await;
    let page: Value = response.json();
    assert_eq!(page["count"], 1);
    let notification_id = page["results"][0]["id"].clone();

    let response = app
        .post(&format!("/api/v1/notifications/{}/read", notification_id), &owner)
        .await;
    let read: Value = response.json();
    assert_eq!(read["is_read"], true);

    let response = app.get("/api/v1/notifications/unread-count", &owner).await;
    let unread: Value = response.json();
    assert_eq!(unread["unread"], 0);
    Ok(())
}

#[tokio::test]
async fn test_disabled_preference_suppresses_alerts() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app
        .patch("/api/v1/notifications/preferences", &owner)
        .json(&json!({ "todo_overdue": false }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let prefs: Value = response.json();
    assert_eq!(prefs["todo_overdue"], false);
    assert_eq!(prefs["rsvp_accepted"], true);

    let last_week = (Utc::now() - Duration::days(7)).date_naive();
    app.post(&format!("/api/v1/weddings/{}/todos", wedding_id), &owner)
        .json(&json!({ "title": "Order cake", "due_date": last_week }))
        .await;

    let response = app
        .post(&format!("/api/v1/weddings/{}/notifications/sweep", wedding_id), &owner)
        .await;
    let report: Value = response.json();
    assert_eq!(report["created"], 0);
    Ok(())
}

#[tokio::test]
async fn test_registry_claim_and_unclaim() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app.get(&format!("/api/v1/weddings/{}", wedding_id), &owner).await;
    let wedding: Value = response.json();
    let code = wedding["public_code"].as_str().unwrap().to_string();

    let response = app
        .post(&format!("/api/v1/weddings/{}/registry", wedding_id), &owner)
        .json(&json!({ "name": "Stand mixer", "price_cents": 39900 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let item: Value = response.json();

    let response = app.server.get(&format!("/api/v1/public/registry/{}", code)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let registry: Value = response.json();
    assert_eq!(registry["items"].as_array().unwrap().len(), 1);

    let claim = format!("/api/v1/public/registry/{}/items/{}/claim", code, item["id"]);
    let response = app
        .server
        .post(&claim)
        .json(&json!({ "name": "Aunt May", "email": "may@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let claimed: Value = response.json();
    assert_eq!(claimed["is_claimed"], true);
    assert_eq!(claimed["is_available"], false);
    assert!(claimed.get("claimed_by_email").is_none());

    let response = app
        .server
        .post(&claim)
        .json(&json!({ "name": "Uncle Bo", "email": "bo@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post(&format!("/api/v1/public/registry/{}/items/{}/unclaim", code, item["id"]))
        .json(&json!({ "email": "bo@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .post(&format!("/api/v1/weddings/{}/registry/{}/unclaim", wedding_id, item["id"]), &owner)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let released: Value = response.json();
    assert_eq!(released["is_claimed"], false);
    assert_eq!(released["is_available"], true);
    assert!(released["claimed_by_email"].is_null());
    Ok(())
}

#[tokio::test]
async fn test_budget_summary_totals() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app
        .post(&format!("/api/v1/weddings/{}/budget/categories", wedding_id), &owner)
        .json(&json!({ "name": "Venue", "allocated_cents": 1_000_000 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let category: Value = response.json();

    let response = app
        .post(&format!("/api/v1/weddings/{}/budget/expenses", wedding_id), &owner)
        .json(&json!({
            "category_id": category["id"],
            "description": "Deposit",
            "amount_cents": 400_000,
            "paid_cents": 100_000,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let response = app
        .post(&format!("/api/v1/weddings/{}/budget/expenses", wedding_id), &owner)
        .json(&json!({ "description": "Overpaid", "amount_cents": 100, "paid_cents": 200 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .get(&format!("/api/v1/weddings/{}/budget/summary", wedding_id), &owner)
        .await;
    let summary: Value = response.json();
    assert_eq!(summary["currency"], "EUR");
    assert_eq!(summary["total_budget_cents"], 2_000_000);
    assert_eq!(summary["spent_cents"], 400_000);
    assert_eq!(summary["paid_cents"], 100_000);
    Ok(())
}
