//! Chat Service - one conversation per customer, shared by all staff

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::domain::DomainError;
use crate::models::message::{self, Entity as Message};
use crate::models::user::{self, Entity as User};

pub const MAX_BODY_CHARS: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub customer_id: i32,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub last_message: message::Model,
    pub unread: u64,
}

fn validate_body(body: &str) -> Result<String, DomainError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(DomainError::Validation("message cannot be empty".to_string()));
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(DomainError::Validation(format!(
            "message cannot exceed {} characters",
            MAX_BODY_CHARS
        )));
    }
    Ok(body.to_string())
}

async fn insert_message(
    db: &DatabaseConnection,
    customer_id: i32,
    sender_id: i32,
    body: &str,
    from_staff: bool,
) -> Result<message::Model, DomainError> {
    let body = validate_body(body)?;
    Ok(message::ActiveModel {
        customer_id: Set(customer_id),
        sender_id: Set(sender_id),
        body: Set(body),
        from_staff: Set(from_staff),
        read: Set(false),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Mark as read the messages of one side of a conversation
async fn mark_read(
    db: &DatabaseConnection,
    customer_id: i32,
    from_staff: bool,
) -> Result<u64, DomainError> {
    let result = Message::update_many()
        .col_expr(message::Column::Read, Expr::value(true))
        .filter(message::Column::CustomerId.eq(customer_id))
        .filter(message::Column::FromStaff.eq(from_staff))
        .filter(message::Column::Read.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn load_conversation(
    db: &DatabaseConnection,
    customer_id: i32,
) -> Result<Vec<message::Model>, DomainError> {
    Ok(Message::find()
        .filter(message::Column::CustomerId.eq(customer_id))
        .order_by_asc(message::Column::Id)
        .all(db)
        .await?)
}

pub async fn send_message(
    db: &DatabaseConnection,
    customer_id: i32,
    body: &str,
) -> Result<message::Model, DomainError> {
    insert_message(db, customer_id, customer_id, body, false).await
}

/// Customer's own conversation; staff replies become read.
pub async fn my_conversation(
    db: &DatabaseConnection,
    customer_id: i32,
) -> Result<Vec<message::Model>, DomainError> {
    mark_read(db, customer_id, true).await?;
    load_conversation(db, customer_id).await
}

/// Every conversation, most recent activity first
pub async fn list_conversations(
    db: &DatabaseConnection,
) -> Result<Vec<ConversationSummary>, DomainError> {
    let messages = Message::find()
        .order_by_desc(message::Column::Id)
        .all(db)
        .await?;

    let mut unread: HashMap<i32, u64> = HashMap::new();
    let mut seen: HashSet<i32> = HashSet::new();
    let mut latest: Vec<message::Model> = Vec::new();
    for msg in messages {
        if !msg.from_staff && !msg.read {
            *unread.entry(msg.customer_id).or_insert(0) += 1;
        }
        if seen.insert(msg.customer_id) {
            latest.push(msg);
        }
    }

    let customer_ids: Vec<i32> = latest.iter().map(|m| m.customer_id).collect();
    let customers: HashMap<i32, user::Model> = User::find()
        .filter(user::Column::Id.is_in(customer_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(latest
        .into_iter()
        .filter_map(|last_message| {
            let customer = customers.get(&last_message.customer_id)?;
            Some(ConversationSummary {
                customer_id: customer.id,
                customer_email: customer.email.clone(),
                customer_name: customer.full_name.clone(),
                unread: unread.get(&customer.id).copied().unwrap_or(0),
                last_message,
            })
        })
        .collect())
}

/// Staff view of one conversation; customer messages become read.
pub async fn conversation(
    db: &DatabaseConnection,
    customer_id: i32,
) -> Result<Vec<message::Model>, DomainError> {
    if User::find_by_id(customer_id).one(db).await?.is_none() {
        return Err(DomainError::NotFound);
    }
    mark_read(db, customer_id, false).await?;
    load_conversation(db, customer_id).await
}

pub async fn reply(
    db: &DatabaseConnection,
    staff_id: i32,
    customer_id: i32,
    body: &str,
) -> Result<message::Model, DomainError> {
    if User::find_by_id(customer_id).one(db).await?.is_none() {
        return Err(DomainError::NotFound);
    }
    insert_message(db, customer_id, staff_id, body, true).await
}
