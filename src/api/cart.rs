use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::error::ApiResult;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::Claims;
use crate::services::cart_service;

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: i32,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    pub product_id: i32,
}

pub async fn get_cart(
    State(state): State<AppState>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(cart_service::get_cart(&state, claims.uid).await?))
}

/// POST /api/cart - Add a product, summing with an existing line
pub async fn add_to_cart(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<AddToCartRequest>,
) -> ApiResult<impl IntoResponse> {
    cart_service::add_to_cart(state.db(), claims.uid, payload.product_id, payload.quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(cart_service::get_cart(&state, claims.uid).await?),
    ))
}

/// PUT /api/cart/:product_id - Set the quantity; 0 removes the line
pub async fn set_quantity(
    State(state): State<AppState>,
    claims: Claims,
    Path(product_id): Path<i32>,
    Json(payload): Json<SetQuantityRequest>,
) -> ApiResult<impl IntoResponse> {
    cart_service::set_quantity(state.db(), claims.uid, product_id, payload.quantity).await?;
    Ok(Json(cart_service::get_cart(&state, claims.uid).await?))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    claims: Claims,
    Path(product_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    cart_service::remove_from_cart(state.db(), claims.uid, product_id).await?;
    Ok(Json(cart_service::get_cart(&state, claims.uid).await?))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    let removed = cart_service::clear_cart(state.db(), claims.uid).await?;
    Ok(Json(json!({ "removed": removed })))
}

pub async fn get_wishlist(
    State(state): State<AppState>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(cart_service::get_wishlist(&state, claims.uid).await?))
}

pub async fn add_to_wishlist(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<WishlistRequest>,
) -> ApiResult<impl IntoResponse> {
    cart_service::add_to_wishlist(state.db(), claims.uid, payload.product_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(cart_service::get_wishlist(&state, claims.uid).await?),
    ))
}

pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    claims: Claims,
    Path(product_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    cart_service::remove_from_wishlist(state.db(), claims.uid, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
