//! Payment Service - checkout quotes, Stripe payment intents and webhook handling

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{DomainError, NewOrder, NewOrderItem, OrderWithItems};
use crate::infrastructure::AppState;
use crate::integrations::stripe::{
    self, EVENT_PAYMENT_SUCCEEDED, Invoice, PaymentIntent, PaymentIntentRequest, StripeEvent,
};
use crate::services::promotion_service;

pub const CURRENCY: &str = "eur";

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutItem {
    pub id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub email: String,
    pub products: Vec<CheckoutItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    pub amount: i64,
}

/// Line priced from the database
#[derive(Debug, Clone, PartialEq)]
pub struct QuotedLine {
    pub product_id: i32,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
}

/// Compact line format stored in `metadata[items]`; Stripe caps metadata
/// values at 500 characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct MetadataItem {
    id: i32,
    q: i32,
}

/// What the webhook did with an event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookOutcome {
    OrderCreated { order_id: i32 },
    AlreadyProcessed { order_id: i32 },
    Ignored { event_type: String },
}

/// Merge repeated products and reject empty or non-positive lines
fn normalize_items(items: &[CheckoutItem]) -> Result<Vec<(i32, i32)>, DomainError> {
    if items.is_empty() {
        return Err(DomainError::Validation("no products to pay for".to_string()));
    }

    let mut merged: Vec<(i32, i32)> = Vec::new();
    for item in items {
        if item.quantity <= 0 {
            return Err(DomainError::Validation(format!(
                "invalid quantity for product {}",
                item.id
            )));
        }
        match merged.iter_mut().find(|(id, _)| *id == item.id) {
            Some((_, quantity)) => {
                *quantity = quantity.checked_add(item.quantity).ok_or_else(|| {
                    DomainError::Validation(format!("quantity too large for product {}", item.id))
                })?
            }
            None => merged.push((item.id, item.quantity)),
        }
    }
    Ok(merged)
}

/// Price the requested lines with current prices and active promotions.
pub async fn quote(
    state: &AppState,
    items: &[CheckoutItem],
) -> Result<(Vec<QuotedLine>, i64), DomainError> {
    let requested = normalize_items(items)?;
    let ids: Vec<i32> = requested.iter().map(|(id, _)| *id).collect();

    let products = state.product_repo.find_by_ids(&ids).await?;
    let discounts = promotion_service::best_discounts(state.db(), &ids, Utc::now()).await?;

    let mut lines = Vec::with_capacity(requested.len());
    for (id, quantity) in requested {
        let product = products
            .iter()
            .find(|p| p.id == id && !p.is_draft)
            .ok_or_else(|| DomainError::Validation(format!("product {} is not available", id)))?;

        let unit_price_cents = discounts
            .get(&id)
            .map(|d| crate::domain::catalog::discounted_price(product.price_cents, *d))
            .unwrap_or(product.price_cents);

        lines.push(QuotedLine {
            product_id: id,
            name: product.name.clone(),
            unit_price_cents,
            quantity,
        });
    }

    let total = lines_total(&lines)?;
    Ok((lines, total))
}

fn lines_total(lines: &[QuotedLine]) -> Result<i64, DomainError> {
    lines.iter().try_fold(0i64, |total, l| {
        l.unit_price_cents
            .checked_mul(i64::from(l.quantity))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| DomainError::Validation("order total is too large".to_string()))
    })
}

fn encode_items(lines: &[QuotedLine]) -> Result<String, DomainError> {
    let items: Vec<MetadataItem> = lines
        .iter()
        .map(|l| MetadataItem {
            id: l.product_id,
            q: l.quantity,
        })
        .collect();
    serde_json::to_string(&items).map_err(|e| DomainError::Internal(e.to_string()))
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Create the Stripe payment intent for a checkout.
/// `user_id` is set when the buyer is logged in.
pub async fn create_payment_intent(
    state: &AppState,
    request: CheckoutRequest,
    user_id: Option<i32>,
) -> Result<CheckoutResponse, DomainError> {
    let email = request.email.trim().to_lowercase();
    if !valid_email(&email) {
        return Err(DomainError::Validation("a valid email is required".to_string()));
    }

    let (lines, total) = quote(state, &request.products).await?;
    if total <= 0 {
        return Err(DomainError::Validation("order total must be positive".to_string()));
    }

    let mut metadata = vec![
        ("email".to_string(), email.clone()),
        ("items".to_string(), encode_items(&lines)?),
    ];
    if let Some(uid) = user_id {
        metadata.push(("user_id".to_string(), uid.to_string()));
    }

    let intent = state
        .stripe
        .create_payment_intent(&PaymentIntentRequest {
            amount: total,
            currency: CURRENCY.to_string(),
            receipt_email: email,
            metadata,
        })
        .await?;

    Ok(CheckoutResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
        amount: intent.amount,
    })
}

/// Turn a succeeded payment intent into an order draft.
///
/// Lines whose product has since been deleted are dropped with a warning;
/// the order total always equals the amount charged.
async fn order_from_intent(state: &AppState, intent: &PaymentIntent) -> Result<NewOrder, DomainError> {
    let email = intent
        .metadata
        .get("email")
        .cloned()
        .or_else(|| intent.receipt_email.clone())
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| DomainError::Validation("payment intent has no email".to_string()))?;

    let user_id = match intent.metadata.get("user_id") {
        Some(raw) => Some(raw.parse::<i32>().map_err(|_| {
            DomainError::Validation(format!("invalid user_id metadata: {}", raw))
        })?),
        None => None,
    };

    let raw_items = intent
        .metadata
        .get("items")
        .ok_or_else(|| DomainError::Validation("payment intent has no items".to_string()))?;
    let items: Vec<MetadataItem> = serde_json::from_str(raw_items)
        .map_err(|e| DomainError::Validation(format!("invalid items metadata: {}", e)))?;
    if items.is_empty() || items.iter().any(|i| i.q <= 0) {
        return Err(DomainError::Validation("invalid items metadata".to_string()));
    }

    let ids: Vec<i32> = items.iter().map(|i| i.id).collect();
    let products = state.product_repo.find_by_ids(&ids).await?;
    let discounts = promotion_service::best_discounts(state.db(), &ids, Utc::now()).await?;

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let Some(product) = products.iter().find(|p| p.id == item.id) else {
            tracing::warn!(
                "Product {} of payment {} no longer exists, line dropped",
                item.id,
                intent.id
            );
            continue;
        };
        let unit_price_cents = discounts
            .get(&item.id)
            .map(|d| crate::domain::catalog::discounted_price(product.price_cents, *d))
            .unwrap_or(product.price_cents);
        lines.push(NewOrderItem {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price_cents,
            quantity: item.q,
        });
    }

    Ok(NewOrder {
        user_id,
        email,
        payment_intent_id: intent.id.clone(),
        total_cents: intent.amount,
        shipping_address: intent.shipping.as_ref().and_then(|s| s.one_line()),
        items: lines,
    })
}

/// Record the order for a paid intent. Replays return the existing order.
pub async fn create_order_from_payment(
    state: &AppState,
    intent: &PaymentIntent,
) -> Result<(OrderWithItems, bool), DomainError> {
    if let Some(existing) = state.order_repo.find_by_payment_intent(&intent.id).await? {
        tracing::info!("Payment {} already has order {}", intent.id, existing.id);
        return Ok((existing, false));
    }

    let new_order = order_from_intent(state, intent).await?;
    state.order_repo.create(new_order).await
}

/// Verify and process a webhook delivery.
pub async fn handle_webhook(
    state: &AppState,
    payload: &[u8],
    signature_header: &str,
) -> Result<WebhookOutcome, DomainError> {
    stripe::verify_webhook_signature(
        payload,
        signature_header,
        &state.config.stripe.webhook_secret,
        Utc::now().timestamp(),
    )
    .map_err(|e| DomainError::Validation(e.to_string()))?;

    let event: StripeEvent = serde_json::from_slice(payload)
        .map_err(|e| DomainError::Validation(format!("invalid event payload: {}", e)))?;
    tracing::info!("Stripe event {} ({})", event.id, event.event_type);

    if event.event_type != EVENT_PAYMENT_SUCCEEDED {
        return Ok(WebhookOutcome::Ignored {
            event_type: event.event_type,
        });
    }

    let intent: PaymentIntent = serde_json::from_value(event.data.object)
        .map_err(|e| DomainError::Validation(format!("invalid payment intent: {}", e)))?;

    let (order, created) = create_order_from_payment(state, &intent).await?;
    if !created {
        return Ok(WebhookOutcome::AlreadyProcessed { order_id: order.id });
    }

    tracing::info!("Order {} created for payment {}", order.id, intent.id);
    if let Err(e) = state.email.send_order_confirmation(&order).await {
        tracing::warn!("Order confirmation for order {} not sent: {}", order.id, e);
    }

    Ok(WebhookOutcome::OrderCreated { order_id: order.id })
}

/// Stripe invoices of the customer registered with `email`
pub async fn list_invoices(state: &AppState, email: &str) -> Result<Vec<Invoice>, DomainError> {
    match state.stripe.find_customer_by_email(email).await? {
        Some(customer_id) => Ok(state.stripe.list_invoices(&customer_id).await?),
        None => Ok(Vec::new()),
    }
}

/// Public checkout settings for the storefront
pub fn public_config(state: &AppState) -> HashMap<&'static str, String> {
    HashMap::from([
        ("publishable_key", state.config.stripe.publishable_key.clone()),
        ("currency", CURRENCY.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i32, quantity: i32) -> CheckoutItem {
        CheckoutItem { id, quantity }
    }

    #[test]
    fn repeated_products_are_merged() {
        let merged = normalize_items(&[item(1, 2), item(3, 1), item(1, 1)]).unwrap();
        assert_eq!(merged, vec![(1, 3), (3, 1)]);
    }

    #[test]
    fn empty_and_non_positive_lines_are_rejected() {
        assert!(normalize_items(&[]).is_err());
        assert!(normalize_items(&[item(1, 0)]).is_err());
        assert!(normalize_items(&[item(1, 2), item(2, -1)]).is_err());
    }

    #[test]
    fn merging_past_i32_max_is_rejected() {
        let result = normalize_items(&[item(1, i32::MAX), item(1, 1)]);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn totals_that_overflow_are_rejected() {
        let line = |unit_price_cents: i64, quantity: i32| QuotedLine {
            product_id: 1,
            name: "Vite".into(),
            unit_price_cents,
            quantity,
        };
        assert_eq!(lines_total(&[line(250, 4), line(100, 1)]).unwrap(), 1100);
        assert!(lines_total(&[line(i64::MAX, 2)]).is_err());
        assert!(lines_total(&[line(i64::MAX, 1), line(1, 1)]).is_err());
    }

    #[test]
    fn metadata_items_use_short_keys() {
        let lines = vec![QuotedLine {
            product_id: 7,
            name: "Martello".into(),
            unit_price_cents: 1299,
            quantity: 2,
        }];
        assert_eq!(encode_items(&lines).unwrap(), r#"[{"id":7,"q":2}]"#);
    }

    #[test]
    fn email_needs_local_part_and_domain() {
        assert!(valid_email("mario@ferramenta.it"));
        assert!(!valid_email("mario"));
        assert!(!valid_email("@ferramenta.it"));
        assert!(!valid_email("mario@localhost"));
    }
}
