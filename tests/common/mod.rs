#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot`

use ferramenta::auth::{create_jwt, hash_password};
use ferramenta::config::Config;
use ferramenta::db;
use ferramenta::infrastructure::AppState;
use ferramenta::models::{product, user};
use ferramenta::server::build_router;

pub const PASSWORD: &str = "password-di-prova";

// Helper to create a test database
pub async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

pub async fn setup_state(config: Config) -> AppState {
    AppState::new(setup_test_db().await, config)
}

pub async fn setup_app() -> (Router, AppState) {
    let state = setup_state(Config::default()).await;
    (build_router(state.clone()), state)
}

/// Insert a user and return its id with a session token
pub async fn create_user(db: &DatabaseConnection, email: &str, role: &str) -> (i32, String) {
    let now = chrono::Utc::now().to_rfc3339();
    let saved = user::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set(hash_password(PASSWORD).unwrap()),
        full_name: Set(None),
        phone: Set(None),
        role: Set(role.to_string()),
        email_confirmed: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user");

    let token = create_jwt(&saved.email, saved.id, &saved.role).unwrap();
    (saved.id, token)
}

pub async fn create_admin(db: &DatabaseConnection) -> (i32, String) {
    create_user(db, "staff@ferramentalucini.it", "admin").await
}

pub async fn create_customer(db: &DatabaseConnection) -> (i32, String) {
    create_user(db, "cliente@example.it", "customer").await
}

pub async fn create_product(
    db: &DatabaseConnection,
    name: &str,
    price_cents: i64,
    stock: i32,
) -> product::Model {
    let now = chrono::Utc::now().to_rfc3339();
    product::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        price_cents: Set(price_cents),
        stock: Set(stock),
        category_id: Set(None),
        image_path: Set(None),
        is_draft: Set(false),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create product")
}

/// Send a request through the router and decode the JSON answer
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}
