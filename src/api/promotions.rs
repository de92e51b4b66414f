use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;

use super::error::ApiResult;
use crate::infrastructure::auth::AdminClaims;
use crate::services::promotion_service::{self, PromotionInput};

/// GET /api/promotions/active - Promotions running now
pub async fn list_active(State(db): State<DatabaseConnection>) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        promotion_service::active_promotions(&db, Utc::now()).await?,
    ))
}

pub async fn list_promotions(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(promotion_service::list_promotions(&db).await?))
}

pub async fn get_promotion(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(promotion_service::get_promotion(&db, id).await?))
}

pub async fn create_promotion(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Json(payload): Json<PromotionInput>,
) -> ApiResult<impl IntoResponse> {
    let promotion = promotion_service::create_promotion(&db, payload).await?;
    Ok((StatusCode::CREATED, Json(promotion)))
}

pub async fn update_promotion(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<PromotionInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        promotion_service::update_promotion(&db, id, payload).await?,
    ))
}

pub async fn delete_promotion(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    promotion_service::delete_promotion(&db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/promotions/:id/products/:product_id
pub async fn attach_product(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Path((id, product_id)): Path<(i32, i32)>,
) -> ApiResult<impl IntoResponse> {
    promotion_service::attach_product(&db, id, product_id).await?;
    Ok(Json(promotion_service::get_promotion(&db, id).await?))
}

pub async fn detach_product(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
    Path((id, product_id)): Path<(i32, i32)>,
) -> ApiResult<impl IntoResponse> {
    promotion_service::detach_product(&db, id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
