//! Cart and wishlist of an authenticated customer

use chrono::Utc;
use sea_orm::*;
use serde::Serialize;

use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::cart_item::{self, Entity as CartItem};
use crate::models::product::{self, Entity as Product};
use crate::models::wishlist_item::{self, Entity as WishlistItem};
use crate::services::product_service::{ProductView, to_views};

/// Cart line with its product resolved
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product: ProductView,
    pub quantity: i32,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_cents: i64,
}

async fn purchasable_product(
    db: &DatabaseConnection,
    product_id: i32,
) -> Result<product::Model, DomainError> {
    Product::find_by_id(product_id)
        .one(db)
        .await?
        .filter(|p| !p.is_draft)
        .ok_or(DomainError::NotFound)
}

fn check_quantity(product: &product::Model, quantity: i32) -> Result<(), DomainError> {
    if quantity <= 0 {
        return Err(DomainError::Validation(
            "quantity must be positive".to_string(),
        ));
    }
    if quantity > product.stock {
        return Err(DomainError::Validation(format!(
            "only {} left of {}",
            product.stock, product.name
        )));
    }
    Ok(())
}

pub async fn get_cart(state: &AppState, user_id: i32) -> Result<CartView, DomainError> {
    let rows = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .find_also_related(Product)
        .all(state.db())
        .await?;

    let (quantities, products): (Vec<i32>, Vec<product::Model>) = rows
        .into_iter()
        .filter_map(|(item, product)| product.map(|p| (item.quantity, p)))
        .unzip();

    let items: Vec<CartLine> = to_views(state, products)
        .await?
        .into_iter()
        .zip(quantities)
        .map(|(product, quantity)| CartLine {
            line_total_cents: product.effective_price_cents.saturating_mul(i64::from(quantity)),
            product,
            quantity,
        })
        .collect();

    let total_cents = items
        .iter()
        .fold(0i64, |total, line| total.saturating_add(line.line_total_cents));
    Ok(CartView { items, total_cents })
}

/// Add to the cart; adding a product already there increases its quantity
pub async fn add_to_cart(
    db: &DatabaseConnection,
    user_id: i32,
    product_id: i32,
    quantity: i32,
) -> Result<cart_item::Model, DomainError> {
    let product = purchasable_product(db, product_id).await?;
    let now = Utc::now().to_rfc3339();

    let existing = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(db)
        .await?;

    match existing {
        Some(item) => {
            check_quantity(&product, quantity)?;
            let total = item.quantity.checked_add(quantity).ok_or_else(|| {
                DomainError::Validation("quantity exceeds available stock".to_string())
            })?;
            check_quantity(&product, total)?;
            let mut active: cart_item::ActiveModel = item.into();
            active.quantity = Set(total);
            active.updated_at = Set(now);
            Ok(active.update(db).await?)
        }
        None => {
            check_quantity(&product, quantity)?;
            Ok(cart_item::ActiveModel {
                user_id: Set(user_id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?)
        }
    }
}

/// Set the quantity of a cart line; zero removes it.
/// Returns `None` when the line was removed.
pub async fn set_quantity(
    db: &DatabaseConnection,
    user_id: i32,
    product_id: i32,
    quantity: i32,
) -> Result<Option<cart_item::Model>, DomainError> {
    if quantity == 0 {
        remove_from_cart(db, user_id, product_id).await?;
        return Ok(None);
    }

    let item = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(db)
        .await?
        .ok_or(DomainError::NotFound)?;
    let product = purchasable_product(db, product_id).await?;
    check_quantity(&product, quantity)?;

    let mut active: cart_item::ActiveModel = item.into();
    active.quantity = Set(quantity);
    active.updated_at = Set(Utc::now().to_rfc3339());
    Ok(Some(active.update(db).await?))
}

pub async fn remove_from_cart(
    db: &DatabaseConnection,
    user_id: i32,
    product_id: i32,
) -> Result<(), DomainError> {
    let result = CartItem::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::NotFound);
    }
    Ok(())
}

pub async fn clear_cart(db: &DatabaseConnection, user_id: i32) -> Result<u64, DomainError> {
    Ok(CartItem::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?
        .rows_affected)
}

pub async fn get_wishlist(state: &AppState, user_id: i32) -> Result<Vec<ProductView>, DomainError> {
    let products: Vec<product::Model> = WishlistItem::find()
        .filter(wishlist_item::Column::UserId.eq(user_id))
        .order_by_desc(wishlist_item::Column::CreatedAt)
        .find_also_related(Product)
        .all(state.db())
        .await?
        .into_iter()
        .filter_map(|(_, product)| product)
        .collect();

    to_views(state, products).await
}

/// Add to the wishlist; adding twice is a no-op
pub async fn add_to_wishlist(
    db: &DatabaseConnection,
    user_id: i32,
    product_id: i32,
) -> Result<(), DomainError> {
    purchasable_product(db, product_id).await?;

    if WishlistItem::find_by_id((user_id, product_id))
        .one(db)
        .await?
        .is_some()
    {
        return Ok(());
    }

    wishlist_item::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
        created_at: Set(Utc::now().to_rfc3339()),
    }
    .insert(db)
    .await?;
    Ok(())
}

pub async fn remove_from_wishlist(
    db: &DatabaseConnection,
    user_id: i32,
    product_id: i32,
) -> Result<(), DomainError> {
    let result = WishlistItem::delete_by_id((user_id, product_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(DomainError::NotFound);
    }
    Ok(())
}
