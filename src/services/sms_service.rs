//! SMS Service - queue of outgoing text messages sent through Twilio
//!
//! Rows are inserted as `pending`. The dispatcher picks them up in batches,
//! marks each one `sent` with the provider SID, or counts the failure and
//! gives up after [`MAX_SMS_ATTEMPTS`].

use chrono::Utc;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::DomainError;
use crate::integrations::TwilioClient;
use crate::models::sms_message::{
    self, Entity as SmsMessage, STATUS_FAILED, STATUS_PENDING, STATUS_SENT,
};

pub const MAX_SMS_ATTEMPTS: i32 = 3;
const DISPATCH_BATCH: u64 = 50;
const MAX_SMS_CHARS: usize = 1600;

#[derive(Debug, Deserialize)]
pub struct SmsRequest {
    pub numero: String,
    pub messaggio: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub sent: u32,
    pub retrying: u32,
    pub failed: u32,
}

/// `+` followed by 8 to 15 digits
pub fn is_e164(number: &str) -> bool {
    match number.strip_prefix('+') {
        Some(digits) => {
            (8..=15).contains(&digits.len())
                && digits.chars().all(|c| c.is_ascii_digit())
                && !digits.starts_with('0')
        }
        None => false,
    }
}

pub async fn enqueue(
    db: &DatabaseConnection,
    request: SmsRequest,
) -> Result<sms_message::Model, DomainError> {
    let numero: String = request.numero.chars().filter(|c| !c.is_whitespace()).collect();
    if !is_e164(&numero) {
        return Err(DomainError::Validation(format!(
            "{} is not an international number (+39...)",
            request.numero
        )));
    }
    let messaggio = request.messaggio.trim();
    if messaggio.is_empty() {
        return Err(DomainError::Validation("message cannot be empty".to_string()));
    }
    if messaggio.chars().count() > MAX_SMS_CHARS {
        return Err(DomainError::Validation(format!(
            "message cannot exceed {} characters",
            MAX_SMS_CHARS
        )));
    }

    let now = Utc::now().to_rfc3339();
    let queued = sms_message::ActiveModel {
        numero: Set(numero),
        messaggio: Set(messaggio.to_string()),
        status: Set(STATUS_PENDING.to_string()),
        provider_sid: Set(None),
        error: Set(None),
        attempts: Set(0),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::debug!("Queued SMS {} to {}", queued.id, queued.numero);
    Ok(queued)
}

/// Queue contents, newest first, optionally for one status
pub async fn list_queue(
    db: &DatabaseConnection,
    status: Option<&str>,
) -> Result<Vec<sms_message::Model>, DomainError> {
    let mut query = SmsMessage::find();
    if let Some(status) = status {
        query = query.filter(sms_message::Column::Status.eq(status));
    }
    Ok(query
        .order_by_desc(sms_message::Column::Id)
        .all(db)
        .await?)
}

/// Send one batch of pending messages.
pub async fn dispatch_pending(
    db: &DatabaseConnection,
    twilio: &TwilioClient,
) -> Result<DispatchReport, DomainError> {
    let mut report = DispatchReport::default();
    if !twilio.is_configured() {
        tracing::debug!("Twilio not configured, SMS queue left untouched");
        return Ok(report);
    }

    let pending = SmsMessage::find()
        .filter(sms_message::Column::Status.eq(STATUS_PENDING))
        .order_by_asc(sms_message::Column::Id)
        .limit(DISPATCH_BATCH)
        .all(db)
        .await?;

    for row in pending {
        let id = row.id;
        let attempts = row.attempts + 1;
        let result = twilio.send_sms(&row.numero, &row.messaggio).await;

        let mut active: sms_message::ActiveModel = row.into();
        active.attempts = Set(attempts);
        active.updated_at = Set(Utc::now().to_rfc3339());

        match result {
            Ok(message) => {
                active.status = Set(STATUS_SENT.to_string());
                active.provider_sid = Set(Some(message.sid));
                active.error = Set(None);
                report.sent += 1;
            }
            Err(e) => {
                tracing::warn!("SMS {} attempt {} failed: {}", id, attempts, e);
                active.error = Set(Some(e.to_string()));
                if attempts >= MAX_SMS_ATTEMPTS {
                    active.status = Set(STATUS_FAILED.to_string());
                    report.failed += 1;
                } else {
                    report.retrying += 1;
                }
            }
        }
        active.update(db).await?;
    }

    if report != DispatchReport::default() {
        tracing::info!(
            "SMS dispatch: {} sent, {} retrying, {} failed",
            report.sent,
            report.retrying,
            report.failed
        );
    }
    Ok(report)
}

/// Poll the queue forever. Errors of one pass are logged and the loop goes on.
pub async fn run_dispatcher(db: DatabaseConnection, twilio: TwilioClient, every: Duration) {
    tracing::info!("SMS dispatcher polling every {:?}", every);
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = dispatch_pending(&db, &twilio).await {
            tracing::error!("SMS dispatch pass failed: {}", e);
        }
    }
}
