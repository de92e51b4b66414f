//! Clients for the hosted services the shop relies on.
//!
//! Each client is a thin typed wrapper over the provider's HTTP API. Base
//! URLs come from configuration so tests can point them at a mock server.

pub mod email;
pub mod fcm;
pub mod storage;
pub mod stripe;
pub mod twilio;

use std::time::Duration;
use thiserror::Error;

pub use email::EmailClient;
pub use fcm::{FcmClient, PushNotification};
pub use storage::StorageSigner;
pub use stripe::StripeClient;
pub use twilio::TwilioClient;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Failed to send HTTP request: {0}")]
    Http(String),

    #[error("{provider} returned {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {0} response: {1}")]
    Decode(&'static str, String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Invalid signature: {0}")]
    Signature(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for IntegrationError {
    fn from(error: reqwest::Error) -> Self {
        IntegrationError::Http(error.to_string())
    }
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}

/// Turn a non-2xx response into `IntegrationError::Provider`, keeping the body.
pub(crate) async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!("{} request failed with {}: {}", provider, status, body);
    Err(IntegrationError::Provider {
        provider,
        status: status.as_u16(),
        body,
    })
}
