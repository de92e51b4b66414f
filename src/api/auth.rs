use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use super::error::ApiResult;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::Claims;
use crate::services::user_service::{self, LoginRequest, ProfileUpdate, RegisterRequest};

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub token: String,
}

/// POST /api/auth/register - Create a customer account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = user_service::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// GET /api/auth/confirm?token= - Confirm the email address
pub async fn confirm_email(
    State(db): State<DatabaseConnection>,
    Query(query): Query<ConfirmQuery>,
) -> ApiResult<impl IntoResponse> {
    let user = user_service::confirm_email(&db, &query.token).await?;
    Ok(Json(json!({ "confirmed": true, "user": user })))
}

pub async fn login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = user_service::login(&db, payload).await?;
    Ok(Json(session))
}

pub async fn get_me(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(user_service::me(&db, claims.uid).await?))
}

/// PUT /api/profile - Update own name and phone
pub async fn update_profile(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        user_service::update_profile(&db, claims.uid, payload).await?,
    ))
}
