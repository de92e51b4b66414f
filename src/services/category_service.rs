//! Category Service

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Deserialize;

use crate::domain::DomainError;
use crate::models::category::{self, Entity as Category};
use crate::models::product;

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

fn validated_name(input: &CategoryInput) -> Result<String, DomainError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("name is required".to_string()));
    }
    Ok(name.to_string())
}

pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>, DomainError> {
    Ok(Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?)
}

pub async fn create_category(
    db: &DatabaseConnection,
    input: CategoryInput,
) -> Result<category::Model, DomainError> {
    let name = validated_name(&input)?;
    let now = chrono::Utc::now().to_rfc3339();

    let saved = category::ActiveModel {
        name: Set(name),
        description: Set(input.description),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match DomainError::from(e) {
        DomainError::Conflict(_) => DomainError::Conflict("category already exists".to_string()),
        other => other,
    })?;

    Ok(saved)
}

pub async fn update_category(
    db: &DatabaseConnection,
    id: i32,
    input: CategoryInput,
) -> Result<category::Model, DomainError> {
    let name = validated_name(&input)?;
    let existing = Category::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;

    let mut active: category::ActiveModel = existing.into();
    active.name = Set(name);
    active.description = Set(input.description);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

/// Delete a category; its products stay in the catalog, uncategorised
pub async fn delete_category(db: &DatabaseConnection, id: i32) -> Result<u64, DomainError> {
    let txn = db.begin().await?;

    let detached = product::Entity::update_many()
        .col_expr(product::Column::CategoryId, Expr::value(Value::Int(None)))
        .filter(product::Column::CategoryId.eq(id))
        .exec(&txn)
        .await?
        .rows_affected;

    let result = Category::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Err(DomainError::NotFound);
    }

    txn.commit().await?;
    tracing::info!("Deleted category {}, {} products detached", id, detached);
    Ok(detached)
}
