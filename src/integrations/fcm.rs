//! Firebase Cloud Messaging (HTTP v1) client.
//!
//! Access tokens come either from configuration as-is or from a service
//! account key exchanged for an OAuth token, cached until shortly before
//! it expires.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{IntegrationError, check_status, http_client};
use crate::infrastructure::config::FcmConfig;

const PROVIDER: &str = "FCM";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh a cached token this long before it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// A push message addressed to one device registration token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushNotification {
    pub token: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

enum Credentials {
    Static(String),
    ServiceAccount(ServiceAccountKey),
    Missing,
}

pub struct FcmClient {
    http: reqwest::Client,
    project_id: String,
    api_base: String,
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl FcmClient {
    pub fn new(config: &FcmConfig) -> Self {
        let credentials = match (&config.access_token, &config.service_account_json) {
            (Some(token), _) if !token.is_empty() => Credentials::Static(token.clone()),
            (_, Some(raw)) => match serde_json::from_str::<ServiceAccountKey>(raw) {
                Ok(key) => Credentials::ServiceAccount(key),
                Err(e) => {
                    tracing::error!("Invalid FCM service account JSON: {}", e);
                    Credentials::Missing
                }
            },
            _ => Credentials::Missing,
        };

        Self {
            http: http_client(),
            project_id: config.project_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.project_id.is_empty() && !matches!(self.credentials, Credentials::Missing)
    }

    async fn access_token(&self) -> Result<String, IntegrationError> {
        let key = match &self.credentials {
            Credentials::Static(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => key,
            Credentials::Missing => return Err(IntegrationError::NotConfigured("FCM")),
        };

        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();
        if let Some(token) = cached.as_ref()
            && token.expires_at - TOKEN_REFRESH_MARGIN_SECS > now
        {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange_assertion(key, now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn exchange_assertion(
        &self,
        key: &ServiceAccountKey,
        now: i64,
    ) -> Result<CachedToken, IntegrationError> {
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: MESSAGING_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| IntegrationError::InvalidInput(format!("service account key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| IntegrationError::InvalidInput(e.to_string()))?;

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;

        let token = check_status("Google OAuth", response)
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(|e| IntegrationError::Decode("Google OAuth", e.to_string()))?;

        tracing::debug!("Obtained FCM access token valid for {}s", token.expires_in);
        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        })
    }

    /// Send one notification; returns the FCM message name.
    pub async fn send(&self, notification: &PushNotification) -> Result<String, IntegrationError> {
        if self.project_id.is_empty() {
            return Err(IntegrationError::NotConfigured("FCM project"));
        }
        if notification.token.trim().is_empty() {
            return Err(IntegrationError::InvalidInput(
                "device token is empty".to_string(),
            ));
        }

        let access_token = self.access_token().await?;

        let mut message = json!({
            "token": notification.token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
            },
        });
        if let Some(data) = &notification.data {
            message["data"] = json!(data);
        }

        let response = self
            .http
            .post(format!(
                "{}/v1/projects/{}/messages:send",
                self.api_base, self.project_id
            ))
            .bearer_auth(access_token)
            .json(&json!({ "message": message }))
            .send()
            .await?;

        let sent = check_status(PROVIDER, response)
            .await?
            .json::<SendResponse>()
            .await
            .map_err(|e| IntegrationError::Decode(PROVIDER, e.to_string()))?;

        Ok(sent.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FcmConfig {
        FcmConfig {
            project_id: "ferramenta".into(),
            access_token: None,
            service_account_json: None,
            api_base: "http://localhost".into(),
        }
    }

    #[test]
    fn static_token_takes_precedence() {
        let mut cfg = config();
        cfg.access_token = Some("ya29.static".into());
        cfg.service_account_json = Some("not json".into());
        let client = FcmClient::new(&cfg);
        assert!(client.is_configured());
        assert!(matches!(client.credentials, Credentials::Static(_)));
    }

    #[test]
    fn invalid_service_account_leaves_client_unconfigured() {
        let mut cfg = config();
        cfg.service_account_json = Some("{".into());
        assert!(!FcmClient::new(&cfg).is_configured());
    }

    #[tokio::test]
    async fn send_without_credentials_fails_fast() {
        let client = FcmClient::new(&config());
        let result = client
            .send(&PushNotification {
                token: "device".into(),
                title: "t".into(),
                body: "b".into(),
                data: None,
            })
            .await;
        assert!(matches!(result, Err(IntegrationError::NotConfigured(_))));
    }
}
