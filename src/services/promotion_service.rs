//! Promotion Service - discounts applied to groups of products

use chrono::{DateTime, Utc};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::DomainError;
use crate::domain::catalog::validate_discount;
use crate::models::promotion::{self, Entity as Promotion};
use crate::models::promotion_product::{self, Entity as PromotionProduct};
use crate::models::product::Entity as Product;

/// Input for creating or updating a promotion
#[derive(Debug, Clone, Deserialize)]
pub struct PromotionInput {
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: i32,
    pub starts_at: String,
    pub ends_at: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Promotion with the products it applies to
#[derive(Debug, Clone, Serialize)]
pub struct PromotionWithProducts {
    #[serde(flatten)]
    pub promotion: promotion::Model,
    pub product_ids: Vec<i32>,
}

fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DomainError::Validation(format!("{} must be an RFC 3339 timestamp", field)))
}

/// Validate and normalise the window to UTC RFC 3339 strings.
fn validate(input: &PromotionInput) -> Result<(String, String), DomainError> {
    if input.title.trim().is_empty() {
        return Err(DomainError::Validation("title is required".to_string()));
    }
    validate_discount(input.discount_percent).map_err(DomainError::Validation)?;

    let starts_at = parse_instant("starts_at", &input.starts_at)?;
    let ends_at = parse_instant("ends_at", &input.ends_at)?;
    if starts_at >= ends_at {
        return Err(DomainError::Validation(
            "starts_at must be before ends_at".to_string(),
        ));
    }
    Ok((starts_at.to_rfc3339(), ends_at.to_rfc3339()))
}

/// True when the promotion is enabled and `now` falls inside its window.
pub fn is_running(promotion: &promotion::Model, now: DateTime<Utc>) -> bool {
    if !promotion.active {
        return false;
    }
    match (
        DateTime::parse_from_rfc3339(&promotion.starts_at),
        DateTime::parse_from_rfc3339(&promotion.ends_at),
    ) {
        (Ok(start), Ok(end)) => start <= now && now < end,
        _ => false,
    }
}

async fn with_products<C: ConnectionTrait>(
    db: &C,
    promotions: Vec<promotion::Model>,
) -> Result<Vec<PromotionWithProducts>, DomainError> {
    let ids: Vec<i32> = promotions.iter().map(|p| p.id).collect();
    let mut links: HashMap<i32, Vec<i32>> = HashMap::new();
    if !ids.is_empty() {
        for link in PromotionProduct::find()
            .filter(promotion_product::Column::PromotionId.is_in(ids))
            .all(db)
            .await?
        {
            links.entry(link.promotion_id).or_default().push(link.product_id);
        }
    }

    Ok(promotions
        .into_iter()
        .map(|promotion| PromotionWithProducts {
            product_ids: links.remove(&promotion.id).unwrap_or_default(),
            promotion,
        })
        .collect())
}

/// List every promotion, newest window first
pub async fn list_promotions(
    db: &DatabaseConnection,
) -> Result<Vec<PromotionWithProducts>, DomainError> {
    let promotions = Promotion::find()
        .order_by_desc(promotion::Column::StartsAt)
        .all(db)
        .await?;
    with_products(db, promotions).await
}

/// Promotions running at `now`
pub async fn active_promotions(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<PromotionWithProducts>, DomainError> {
    let promotions: Vec<promotion::Model> = Promotion::find()
        .filter(promotion::Column::Active.eq(true))
        .all(db)
        .await?
        .into_iter()
        .filter(|p| is_running(p, now))
        .collect();
    with_products(db, promotions).await
}

/// Best running discount for each of the given products.
/// Products without a running promotion are absent from the map.
pub async fn best_discounts(
    db: &DatabaseConnection,
    product_ids: &[i32],
    now: DateTime<Utc>,
) -> Result<HashMap<i32, i32>, DomainError> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let links = PromotionProduct::find()
        .filter(promotion_product::Column::ProductId.is_in(product_ids.to_vec()))
        .find_also_related(Promotion)
        .all(db)
        .await?;

    let mut best: HashMap<i32, i32> = HashMap::new();
    for (link, promotion) in links {
        let Some(promotion) = promotion else { continue };
        if !is_running(&promotion, now) {
            continue;
        }
        let entry = best.entry(link.product_id).or_insert(0);
        *entry = (*entry).max(promotion.discount_percent);
    }
    Ok(best)
}

pub async fn get_promotion(
    db: &DatabaseConnection,
    id: i32,
) -> Result<PromotionWithProducts, DomainError> {
    let promotion = Promotion::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;
    with_products(db, vec![promotion])
        .await?
        .pop()
        .ok_or(DomainError::NotFound)
}

pub async fn create_promotion(
    db: &DatabaseConnection,
    input: PromotionInput,
) -> Result<promotion::Model, DomainError> {
    let (starts_at, ends_at) = validate(&input)?;
    let now = Utc::now().to_rfc3339();

    let saved = promotion::ActiveModel {
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        discount_percent: Set(input.discount_percent),
        starts_at: Set(starts_at),
        ends_at: Set(ends_at),
        active: Set(input.active),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Created promotion {} ({}%)", saved.id, saved.discount_percent);
    Ok(saved)
}

pub async fn update_promotion(
    db: &DatabaseConnection,
    id: i32,
    input: PromotionInput,
) -> Result<promotion::Model, DomainError> {
    let (starts_at, ends_at) = validate(&input)?;
    let existing = Promotion::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let mut active: promotion::ActiveModel = existing.into();
    active.title = Set(input.title.trim().to_string());
    active.description = Set(input.description);
    active.discount_percent = Set(input.discount_percent);
    active.starts_at = Set(starts_at);
    active.ends_at = Set(ends_at);
    active.active = Set(input.active);
    active.updated_at = Set(Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

pub async fn delete_promotion(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let txn = db.begin().await?;

    PromotionProduct::delete_many()
        .filter(promotion_product::Column::PromotionId.eq(id))
        .exec(&txn)
        .await?;
    let result = Promotion::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Err(DomainError::NotFound);
    }

    txn.commit().await?;
    Ok(())
}

/// Link a product to a promotion; linking twice is a no-op
pub async fn attach_product(
    db: &DatabaseConnection,
    promotion_id: i32,
    product_id: i32,
) -> Result<(), DomainError> {
    if Promotion::find_by_id(promotion_id).one(db).await?.is_none()
        || Product::find_by_id(product_id).one(db).await?.is_none()
    {
        return Err(DomainError::NotFound);
    }

    let already_linked = PromotionProduct::find_by_id((promotion_id, product_id))
        .one(db)
        .await?
        .is_some();
    if !already_linked {
        promotion_product::ActiveModel {
            promotion_id: Set(promotion_id),
            product_id: Set(product_id),
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

pub async fn detach_product(
    db: &DatabaseConnection,
    promotion_id: i32,
    product_id: i32,
) -> Result<(), DomainError> {
    let result = PromotionProduct::delete_many()
        .filter(promotion_product::Column::PromotionId.eq(promotion_id))
        .filter(promotion_product::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(active: bool, starts: DateTime<Utc>, ends: DateTime<Utc>) -> promotion::Model {
        promotion::Model {
            id: 1,
            title: "Saldi".into(),
            description: None,
            discount_percent: 20,
            starts_at: starts.to_rfc3339(),
            ends_at: ends.to_rfc3339(),
            active,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn running_window_is_half_open() {
        let now = Utc::now();
        assert!(is_running(&promo(true, now, now + Duration::days(1)), now));
        assert!(!is_running(&promo(true, now - Duration::days(1), now), now));
        assert!(!is_running(&promo(false, now - Duration::days(1), now + Duration::days(1)), now));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let input = PromotionInput {
            title: "Saldi".into(),
            description: None,
            discount_percent: 10,
            starts_at: "2026-02-01T00:00:00Z".into(),
            ends_at: "2026-01-01T00:00:00Z".into(),
            active: true,
        };
        assert!(matches!(validate(&input), Err(DomainError::Validation(_))));
    }
}
