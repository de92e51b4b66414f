//! Notification Service - device tokens and push delivery to customers

use futures::future::join_all;
use sea_orm::*;

use crate::domain::DomainError;
use crate::integrations::{FcmClient, PushNotification};
use crate::models::device_token::{self, Entity as DeviceToken};

/// Register a device for the user. A token moves to the latest user that
/// registers it.
pub async fn register_token(
    db: &DatabaseConnection,
    user_id: i32,
    token: &str,
) -> Result<device_token::Model, DomainError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DomainError::Validation("token is required".to_string()));
    }

    let existing = DeviceToken::find()
        .filter(device_token::Column::Token.eq(token))
        .one(db)
        .await?;

    match existing {
        Some(row) if row.user_id == user_id => Ok(row),
        Some(row) => {
            let mut active: device_token::ActiveModel = row.into();
            active.user_id = Set(user_id);
            Ok(active.update(db).await?)
        }
        None => Ok(device_token::ActiveModel {
            user_id: Set(user_id),
            token: Set(token.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(db)
        .await?),
    }
}

pub async fn remove_token(
    db: &DatabaseConnection,
    user_id: i32,
    token: &str,
) -> Result<(), DomainError> {
    let result = DeviceToken::delete_many()
        .filter(device_token::Column::UserId.eq(user_id))
        .filter(device_token::Column::Token.eq(token.trim()))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::NotFound);
    }
    Ok(())
}

/// Push a notification to every device of a user.
///
/// Best effort: failures are logged and counted, never returned.
/// Returns the number of devices reached.
pub async fn notify_user(
    db: &DatabaseConnection,
    fcm: &FcmClient,
    user_id: i32,
    title: &str,
    body: &str,
) -> usize {
    if !fcm.is_configured() {
        tracing::debug!("FCM not configured, skipping push to user {}", user_id);
        return 0;
    }

    let tokens = match DeviceToken::find()
        .filter(device_token::Column::UserId.eq(user_id))
        .all(db)
        .await
    {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!("Cannot load device tokens of user {}: {}", user_id, e);
            return 0;
        }
    };

    let sends = tokens.iter().map(|row| {
        let notification = PushNotification {
            token: row.token.clone(),
            title: title.to_string(),
            body: body.to_string(),
            data: None,
        };
        async move { fcm.send(&notification).await }
    });

    let mut delivered = 0;
    for (row, result) in tokens.iter().zip(join_all(sends).await) {
        match result {
            Ok(_) => delivered += 1,
            Err(e) => tracing::warn!("Push to device {} failed: {}", row.id, e),
        }
    }
    delivered
}
