use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use super::error::ApiResult;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{Claims, OptionalClaims};
use crate::services::payment_service::{self, CheckoutRequest};

const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[utoipa::path(
    post,
    path = "/api/payments/intent",
    responses(
        (status = 201, description = "Payment intent created, returns client_secret"),
        (status = 400, description = "Empty cart, unknown product or bad quantity"),
        (status = 502, description = "Stripe rejected the request")
    )
)]
pub async fn create_intent(
    State(state): State<AppState>,
    OptionalClaims(claims): OptionalClaims,
    Json(payload): Json<CheckoutRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.map(|c| c.uid);
    let intent = payment_service::create_payment_intent(&state, payload, user_id).await?;
    Ok((StatusCode::CREATED, Json(intent)))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    responses(
        (status = 200, description = "Event processed or ignored"),
        (status = 400, description = "Bad signature or malformed event")
    )
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DomainError::Validation("missing Stripe-Signature header".to_string()))?;

    let outcome = payment_service::handle_webhook(&state, &body, signature).await?;
    Ok(Json(outcome))
}

/// GET /api/payments/invoices - Invoices of the logged-in customer
pub async fn list_invoices(
    State(state): State<AppState>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(payment_service::list_invoices(&state, &claims.sub).await?))
}

#[utoipa::path(
    get,
    path = "/api/payments/config",
    responses(
        (status = 200, description = "Publishable key for the storefront")
    )
)]
pub async fn public_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(payment_service::public_config(&state))
}
