//! Stripe REST client and webhook signature verification.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;

use super::{IntegrationError, check_status, http_client};
use crate::infrastructure::config::StripeConfig;

const PROVIDER: &str = "Stripe";

/// Webhook events older than this are treated as replays.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Parameters of a new payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub amount: i64,
    pub currency: String,
    pub receipt_email: String,
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub shipping: Option<Shipping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipping {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl Shipping {
    /// Single-line postal address, parts joined with commas.
    pub fn one_line(&self) -> Option<String> {
        let address = self.address.as_ref()?;
        let parts: Vec<&str> = [
            self.name.as_deref(),
            address.line1.as_deref(),
            address.line2.as_deref(),
            address.postal_code.as_deref(),
            address.city.as_deref(),
            address.state.as_deref(),
            address.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub number: Option<String>,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    pub created: i64,
    #[serde(default)]
    pub hosted_invoice_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
}

/// Event delivered to the webhook endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            http: http_client(),
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn ensure_configured(&self) -> Result<(), IntegrationError> {
        if self.secret_key.is_empty() {
            return Err(IntegrationError::NotConfigured("Stripe secret key"));
        }
        Ok(())
    }

    pub async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, IntegrationError> {
        self.ensure_configured()?;

        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), request.amount.to_string()),
            ("currency".into(), request.currency.clone()),
            ("receipt_email".into(), request.receipt_email.clone()),
            ("automatic_payment_methods[enabled]".into(), "true".into()),
        ];
        form.extend(
            request
                .metadata
                .iter()
                .map(|(k, v)| (format!("metadata[{}]", k), v.clone())),
        );

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", uuid::Uuid::new_v4().to_string())
            .form(&form)
            .send()
            .await?;

        let intent = check_status(PROVIDER, response)
            .await?
            .json::<PaymentIntent>()
            .await
            .map_err(|e| IntegrationError::Decode(PROVIDER, e.to_string()))?;

        tracing::info!(
            "Created payment intent {} for {} cents",
            intent.id,
            intent.amount
        );
        Ok(intent)
    }

    /// Stripe customer ID registered with this email, if any.
    pub async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<String>, IntegrationError> {
        self.ensure_configured()?;

        let response = self
            .http
            .get(format!("{}/v1/customers", self.api_base))
            .bearer_auth(&self.secret_key)
            .query(&[("email", email), ("limit", "1")])
            .send()
            .await?;

        let customers = check_status(PROVIDER, response)
            .await?
            .json::<ListResponse<Customer>>()
            .await
            .map_err(|e| IntegrationError::Decode(PROVIDER, e.to_string()))?;

        Ok(customers.data.into_iter().next().map(|c| c.id))
    }

    pub async fn list_invoices(&self, customer_id: &str) -> Result<Vec<Invoice>, IntegrationError> {
        self.ensure_configured()?;

        let response = self
            .http
            .get(format!("{}/v1/invoices", self.api_base))
            .bearer_auth(&self.secret_key)
            .query(&[("customer", customer_id), ("limit", "100")])
            .send()
            .await?;

        let invoices = check_status(PROVIDER, response)
            .await?
            .json::<ListResponse<Invoice>>()
            .await
            .map_err(|e| IntegrationError::Decode(PROVIDER, e.to_string()))?;

        Ok(invoices.data)
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`, as Stripe computes `v1`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            tracing::error!("Failed to create HMAC: {}", e);
            return String::new();
        }
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a `Stripe-Signature` header against the raw request body.
///
/// The header looks like `t=1700000000,v1=<hex>,v1=<hex>,v0=<hex>`. Any of
/// the `v1` entries may match; `v0` entries are ignored.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), IntegrationError> {
    if secret.is_empty() {
        return Err(IntegrationError::NotConfigured("Stripe webhook secret"));
    }

    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for item in header.split(',') {
        match item.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| IntegrationError::Signature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(IntegrationError::Signature("missing v1 signature".to_string()));
    }
    let age = now
        .checked_sub(timestamp)
        .ok_or_else(|| IntegrationError::Signature("timestamp out of range".to_string()))?;
    if age > WEBHOOK_TOLERANCE_SECS {
        return Err(IntegrationError::Signature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| IntegrationError::Signature(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        tracing::error!("Stripe webhook signature mismatch");
        Err(IntegrationError::Signature("no matching signature".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;

    #[test]
    fn accepts_valid_signature() {
        let sig = compute_signature(SECRET, 1_700_000_000, BODY);
        let header = format!("t=1700000000,v1={}", sig);
        assert!(verify_webhook_signature(BODY, &header, SECRET, 1_700_000_010).is_ok());
    }

    #[test]
    fn any_v1_entry_may_match() {
        let sig = compute_signature(SECRET, 1_700_000_000, BODY);
        let header = format!("t=1700000000,v1=deadbeef,v0=abc,v1={}", sig);
        assert!(verify_webhook_signature(BODY, &header, SECRET, 1_700_000_000).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let sig = compute_signature(SECRET, 1_700_000_000, BODY);
        let header = format!("t=1700000000,v1={}", sig);
        let err = verify_webhook_signature(b"{}", &header, SECRET, 1_700_000_000);
        assert!(matches!(err, Err(IntegrationError::Signature(_))));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let sig = compute_signature(SECRET, 1_700_000_000, BODY);
        let header = format!("t=1700000000,v1={}", sig);
        let now = 1_700_000_000 + WEBHOOK_TOLERANCE_SECS + 1;
        assert!(verify_webhook_signature(BODY, &header, SECRET, now).is_err());
    }

    #[test]
    fn rejects_header_without_parts() {
        assert!(verify_webhook_signature(BODY, "v1=abc", SECRET, 0).is_err());
        assert!(verify_webhook_signature(BODY, "t=5", SECRET, 5).is_err());
        assert!(matches!(
            verify_webhook_signature(BODY, "t=-9223372036854775808,v1=aa", SECRET, 1_700_000_000),
            Err(IntegrationError::Signature(_))
        ));
        assert!(matches!(
            verify_webhook_signature(BODY, "t=5,v1=aa", "", 5),
            Err(IntegrationError::NotConfigured(_))
        ));
    }

    #[test]
    fn shipping_one_line_skips_missing_parts() {
        let shipping = Shipping {
            name: Some("Mario Rossi".into()),
            address: Some(Address {
                line1: Some("Via Roma 1".into()),
                line2: None,
                postal_code: Some("20100".into()),
                city: Some("Milano".into()),
                state: Some("".into()),
                country: Some("IT".into()),
            }),
        };
        assert_eq!(
            shipping.one_line().as_deref(),
            Some("Mario Rossi, Via Roma 1, 20100, Milano, IT")
        );
    }
}
