//! Transactional email over an HTTP email API (`POST {base}/emails`).

use serde::Serialize;

use super::{IntegrationError, check_status, http_client};
use crate::domain::OrderWithItems;
use crate::infrastructure::config::EmailConfig;

const PROVIDER: &str = "Email API";

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

#[derive(Clone)]
pub struct EmailClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    from: String,
}

impl EmailClient {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            http: http_client(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), IntegrationError> {
        if self.api_key.is_empty() {
            return Err(IntegrationError::NotConfigured("Email API"));
        }

        let email = OutgoingEmail {
            from: &self.from,
            to: [to],
            subject,
            text,
        };

        let response = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await?;

        check_status(PROVIDER, response).await?;
        tracing::info!("Sent \"{}\" to {}", subject, to);
        Ok(())
    }

    pub async fn send_account_confirmation(
        &self,
        to: &str,
        confirm_link: &str,
    ) -> Result<(), IntegrationError> {
        let text = format!(
            "Benvenuto su Ferramenta Lucini!\n\n\
             Conferma il tuo indirizzo email aprendo questo link:\n{}\n\n\
             Il link scade tra 48 ore.",
            confirm_link
        );
        self.send(to, "Conferma il tuo indirizzo email", &text).await
    }

    pub async fn send_order_confirmation(
        &self,
        order: &OrderWithItems,
    ) -> Result<(), IntegrationError> {
        let subject = format!("Ordine n. {} confermato", order.id);
        self.send(&order.email, &subject, &order_summary(order)).await
    }
}

/// Format cents as `12,34 €`.
pub fn format_euros(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}{},{:02} €", sign, cents / 100, cents % 100)
}

/// Plain-text body of the order confirmation email.
pub fn order_summary(order: &OrderWithItems) -> String {
    let mut text = format!(
        "Grazie per il tuo acquisto!\n\nOrdine n. {}\n\n",
        order.id
    );
    for item in &order.items {
        text.push_str(&format!(
            "{} x {} - {}\n",
            item.quantity,
            item.product_name,
            format_euros(item.unit_price_cents.saturating_mul(i64::from(item.quantity)))
        ));
    }
    text.push_str(&format!("\nTotale: {}\n", format_euros(order.total_cents)));
    if let Some(address) = &order.shipping_address {
        text.push_str(&format!("Spedizione a: {}\n", address));
    }
    text.push_str("\nTi avviseremo quando il pacco sarà spedito.");
    text
}
