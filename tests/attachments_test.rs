//! Multipart upload, download and removal of todo attachments

mod common;

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::{json, Value};

use common::TestApp;

fn file_form(name: &str, bytes: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes.to_vec())
            .file_name(name)
            .mime_type("text/plain"),
    )
}

#[tokio::test]
async fn test_attachment_lifecycle() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app
        .post(&format!("/api/v1/weddings/{}/todos", wedding_id), &owner)
        .json(&json!({ "title": "Florist contract" }))
        .await;
    let todo: Value = response.json();
    let base = format!("/api/v1/weddings/{}/todos/{}/attachments", wedding_id, todo["id"]);

    let response = app
        .post(&base, &owner)
        .multipart(file_form("quote.txt", b"peonies x 40"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let attachment: Value = response.json();
    assert_eq!(attachment["original_name"], "quote.txt");
    assert_eq!(attachment["size_bytes"], 12);
    assert_eq!(attachment["checksum"].as_str().unwrap().len(), 64);

    let response = app.get(&base, &owner).await;
    let listed: Vec<Value> = response.json();
    assert_eq!(listed.len(), 1);

    let file_path = format!("{}/{}", base, attachment["id"]);
    let response = app.get(&file_path, &owner).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "peonies x 40");
    assert!(response
        .header("content-disposition")
        .to_str()?
        .contains("quote.txt"));

    let response = app.delete(&file_path, &owner).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let response = app.get(&file_path, &owner).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_disallowed_extension_is_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.user("owner").await;
    let wedding_id = app.wedding(&owner).await;

    let response = app
        .post(&format!("/api/v1/weddings/{}/todos", wedding_id), &owner)
        .json(&json!({ "title": "Seating plan" }))
        .await;
    let todo: Value = response.json();

    let response = app
        .post(
            &format!("/api/v1/weddings/{}/todos/{}/attachments", wedding_id, todo["id"]),
            &owner,
        )
        .multipart(file_form("setup.exe", b"MZ"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["fields"]["file"].is_string());
    Ok(())
}
