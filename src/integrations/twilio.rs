//! Twilio Messages API client used by the SMS queue dispatcher.

use serde::Deserialize;

use super::{IntegrationError, check_status, http_client};
use crate::infrastructure::config::TwilioConfig;

const PROVIDER: &str = "Twilio";

#[derive(Debug, Clone, Deserialize)]
pub struct TwilioMessage {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base: String,
}

impl TwilioClient {
    pub fn new(config: &TwilioConfig) -> Self {
        Self {
            http: http_client(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }

    pub async fn send_sms(&self, to: &str, body: &str) -> Result<TwilioMessage, IntegrationError> {
        if !self.is_configured() {
            return Err(IntegrationError::NotConfigured("Twilio"));
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );

        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", to),
                ("From", self.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let message = check_status(PROVIDER, response)
            .await?
            .json::<TwilioMessage>()
            .await
            .map_err(|e| IntegrationError::Decode(PROVIDER, e.to_string()))?;

        tracing::debug!("Twilio accepted message {}", message.sid);
        Ok(message)
    }
}
