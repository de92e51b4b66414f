use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use super::error::ApiResult;
use crate::domain::{DomainError, OrderFilter, OrderStatus};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{AdminClaims, Claims};
use crate::services::order_service;

/// Query parameters for the admin order list and export
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub email: Option<String>,
}

impl ListOrdersQuery {
    fn into_filter(self) -> Result<OrderFilter, DomainError> {
        let status = self
            .status
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<OrderStatus>())
            .transpose()
            .map_err(DomainError::Validation)?;

        Ok(OrderFilter {
            status,
            email: self.email.filter(|e| !e.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn my_orders(
    State(state): State<AppState>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(order_service::my_orders(&state, claims.uid).await?))
}

/// GET /api/orders/:id - Owner or admin
pub async fn get_order(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(order_service::get_order(&state, id, &claims).await?))
}

pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Query(params): Query<ListOrdersQuery>,
) -> ApiResult<impl IntoResponse> {
    let orders = order_service::list_orders(&state, params.into_filter()?).await?;
    Ok(Json(orders))
}

/// PUT /api/admin/orders/:id/status - Any status may follow any other
pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let status: OrderStatus = payload.status.parse().map_err(DomainError::Validation)?;
    Ok(Json(order_service::update_status(&state, id, status).await?))
}

pub async fn export_csv(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Query(params): Query<ListOrdersQuery>,
) -> ApiResult<impl IntoResponse> {
    let csv = order_service::export_csv(&state, params.into_filter()?).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ordini.csv\"",
            ),
        ],
        csv,
    ))
}

pub async fn statistics(
    State(db): State<DatabaseConnection>,
    _admin: AdminClaims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(order_service::statistics(&db).await?))
}
