use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use super::error::ApiResult;
use crate::infrastructure::auth::{AdminClaims, Claims};
use crate::services::chat_service;

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub body: String,
}

/// GET /api/chat - The caller's conversation with the shop
pub async fn my_conversation(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(chat_service::my_conversation(&db, claims.uid).await?))
}

pub async fn send_message(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<ChatMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = chat_service::send_message(&db, claims.uid, &payload.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_conversations(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(chat_service::list_conversations(&db).await?))
}

pub async fn conversation(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Path(customer_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(chat_service::conversation(&db, customer_id).await?))
}

/// POST /api/admin/chat/:customer_id - Staff reply
pub async fn reply(
    State(db): State<DatabaseConnection>,
    AdminClaims(admin): AdminClaims,
    Path(customer_id): Path<i32>,
    Json(payload): Json<ChatMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = chat_service::reply(&db, admin.uid, customer_id, &payload.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
