use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use super::error::ApiResult;
use crate::infrastructure::auth::AdminClaims;
use crate::services::category_service::{self, CategoryInput};

pub async fn list_categories(State(db): State<DatabaseConnection>) -> ApiResult<impl IntoResponse> {
    Ok(Json(category_service::list_categories(&db).await?))
}

pub async fn create_category(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Json(payload): Json<CategoryInput>,
) -> ApiResult<impl IntoResponse> {
    let category = category_service::create_category(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<CategoryInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(category_service::update_category(&db, id, payload).await?))
}

/// DELETE /api/admin/categories/:id - Products of the category become uncategorised
pub async fn delete_category(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let detached = category_service::delete_category(&db, id).await?;
    Ok(Json(json!({ "deleted": id, "products_detached": detached })))
}
