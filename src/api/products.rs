use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::error::ApiResult;
use crate::domain::{ProductFilter, ProductInput};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::AdminClaims;
use crate::services::product_service;

const DEFAULT_PAGE_SIZE: u64 = 24;
const MAX_PAGE_SIZE: u64 = 100;

/// Query parameters for listing products; `include_drafts` only counts for admins
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub category_id: Option<i32>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(default)]
    pub include_drafts: bool,
}

impl ListProductsQuery {
    fn into_filter(self, include_drafts: bool) -> ProductFilter {
        ProductFilter {
            category_id: self.category_id,
            query: self.q.filter(|q| !q.trim().is_empty()),
            sort: self.sort,
            page: Some(self.page.unwrap_or(0)),
            limit: Some(self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)),
            include_drafts,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("category_id" = Option<i32>, Query, description = "Only this category"),
        ("q" = Option<String>, Query, description = "Search in name and description"),
        ("sort" = Option<String>, Query, description = "price_asc, price_desc, name_asc or recent"),
        ("page" = Option<u64>, Query, description = "0-based page"),
        ("limit" = Option<u64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Published products with effective prices")
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = product_service::list_products(&state, params.into_filter(false)).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found"),
        (status = 404, description = "Product not found or still a draft")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(product_service::get_product(&state, id, false).await?))
}

pub async fn admin_list_products(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Query(params): Query<ListProductsQuery>,
) -> ApiResult<impl IntoResponse> {
    let include_drafts = params.include_drafts;
    let filter = params.into_filter(include_drafts);
    Ok(Json(product_service::list_products(&state, filter).await?))
}

pub async fn admin_get_product(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(product_service::get_product(&state, id, true).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Json(payload): Json<ProductInput>,
) -> ApiResult<impl IntoResponse> {
    let product = product_service::create_product(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// POST /api/admin/products/draft - New unnamed draft
pub async fn create_draft(
    State(state): State<AppState>,
    _admin: AdminClaims,
) -> ApiResult<impl IntoResponse> {
    let draft = product_service::create_draft_product(&state).await?;
    Ok((StatusCode::CREATED, Json(draft)))
}

pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<ProductInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(product_service::update_product(&state, id, payload).await?))
}

pub async fn publish_product(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(product_service::publish_product(&state, id).await?))
}

/// DELETE /api/admin/products/:id - Delete with referential cleanup
pub async fn delete_product(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let cleanup = product_service::delete_product(&state, id).await?;
    tracing::info!("Product {} deleted by {}", id, admin.sub);
    Ok(Json(json!({ "deleted": id, "cleanup": cleanup })))
}
