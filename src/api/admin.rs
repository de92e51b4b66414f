use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use super::error::ApiResult;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::AdminClaims;
use crate::services::user_service;

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SignQuery {
    pub path: String,
    pub expires_in: Option<i64>,
}

pub async fn list_users(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(user_service::list_users(&db).await?))
}

/// PUT /api/admin/users/:id/role - Admins cannot demote themselves
pub async fn set_role(
    State(db): State<DatabaseConnection>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<SetRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        user_service::set_role(&db, admin.uid, id, &payload.role).await?,
    ))
}

pub async fn delete_user(
    State(db): State<DatabaseConnection>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let cleanup = user_service::delete_user(&db, admin.uid, id).await?;
    Ok(Json(json!({ "deleted": id, "cleanup": cleanup })))
}

/// GET /api/storage/sign?path= - Signed URL for a stored object
pub async fn sign_storage_url(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Query(params): Query<SignQuery>,
) -> ApiResult<impl IntoResponse> {
    let expires_in = params
        .expires_in
        .unwrap_or(state.config.storage.url_ttl_secs);
    if expires_in <= 0 {
        return Err(DomainError::Validation(
            "expires_in must be positive".to_string(),
        ));
    }

    let url = state
        .storage
        .sign_for(&params.path, expires_in)
        .map_err(|e| DomainError::Validation(e.to_string()))?;
    Ok(Json(json!({ "signed_url": url, "expires_in": expires_in })))
}
