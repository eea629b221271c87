//! Row builders for service tests

use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use crate::database::entities::{guests, todos, users, wedding_members, weddings};

pub async fn create_user(db: &DatabaseConnection, username: &str) -> users::Model {
    let mut user = users::ActiveModel::new();
    user.email = Set(format!("{}@example.com", username));
    user.username = Set(username.to_string());
    user.display_name = Set(username.to_string());
    user.password_hash = Set("not-a-real-hash".to_string());
    user.insert(db).await.expect("insert user")
}

pub async fn create_wedding(db: &DatabaseConnection, owner_id: i32) -> weddings::Model {
    let now = Utc::now();
    let wedding = weddings::ActiveModel {
        owner_id: Set(owner_id),
        title: Set("Ann & Ben".to_string()),
        currency: Set("USD".to_string()),
        total_budget_cents: Set(0),
        public_code: Set(Uuid::new_v4().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert wedding");

    add_member(db, wedding.id, owner_id, "owner").await;
    wedding
}

pub async fn add_member(db: &DatabaseConnection, wedding_id: i32, user_id: i32, role: &str) {
    wedding_members::ActiveModel {
        wedding_id: Set(wedding_id),
        user_id: Set(user_id),
        role: Set(role.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert member");
}

pub async fn create_guest(
    db: &DatabaseConnection,
    wedding_id: i32,
    first_name: &str,
    plus_one_allowed: bool,
) -> guests::Model {
    let now = Utc::now();
    guests::ActiveModel {
        wedding_id: Set(wedding_id),
        first_name: Set(first_name.to_string()),
        last_name: Set("Guest".to_string()),
        email: Set(Some(format!("{}@guests.test", first_name.to_lowercase()))),
        user_code: Set(Uuid::new_v4().to_string()),
        attendance_status: Set("pending".to_string()),
        plus_one_allowed: Set(plus_one_allowed),
        plus_one_attending: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert guest")
}

pub async fn create_todo(
    db: &DatabaseConnection,
    wedding_id: i32,
    title: &str,
    due_date: Option<NaiveDate>,
    due_time: Option<NaiveTime>,
) -> todos::Model {
    let now = Utc::now();
    todos::ActiveModel {
        wedding_id: Set(wedding_id),
        title: Set(title.to_string()),
        status: Set("not_started".to_string()),
        priority: Set("medium".to_string()),
        due_date: Set(due_date),
        due_time: Set(due_time),
        progress_percent: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert todo")
}
