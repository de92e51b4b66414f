use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use super::error::ApiResult;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{AdminClaims, Claims};
use crate::integrations::PushNotification;
use crate::services::{notification_service, sms_service};
use crate::services::sms_service::SmsRequest;

#[derive(Debug, Deserialize)]
pub struct SendPushRequest {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceTokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SmsQueueQuery {
    pub status: Option<String>,
}

/// POST /api/notifications/send - Push one message to a device
pub async fn send_push(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Json(payload): Json<SendPushRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.token.trim().is_empty() || payload.title.trim().is_empty() {
        return Err(DomainError::Validation(
            "token and title are required".to_string(),
        ));
    }

    let name = state
        .fcm
        .send(&PushNotification {
            token: payload.token,
            title: payload.title,
            body: payload.body,
            data: payload.data,
        })
        .await?;
    Ok(Json(json!({ "success": true, "message": name })))
}

pub async fn register_token(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<DeviceTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let device = notification_service::register_token(&db, claims.uid, &payload.token).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

pub async fn remove_token(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<DeviceTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    notification_service::remove_token(&db, claims.uid, &payload.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sms - Queue a text message
pub async fn enqueue_sms(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Json(payload): Json<SmsRequest>,
) -> ApiResult<impl IntoResponse> {
    let queued = sms_service::enqueue(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(queued)))
}

pub async fn list_sms(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Query(params): Query<SmsQueueQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = params.status.as_deref().filter(|s| !s.is_empty());
    Ok(Json(sms_service::list_queue(&db, status).await?))
}

/// POST /api/sms/dispatch - Run one dispatcher pass now
pub async fn dispatch_sms(
    State(state): State<AppState>,
    _admin: AdminClaims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        sms_service::dispatch_pending(state.db(), &state.twilio).await?,
    ))
}
