//! Maintenance Service - one-off cleanup jobs run from the command line

use sea_orm::sea_query::{Expr, Query, SelectStatement};
use sea_orm::*;
use serde::Serialize;

use crate::domain::DomainError;
use crate::models::{cart_item, order_item, product, promotion_product, wishlist_item};

#[derive(Debug, Default, Serialize)]
pub struct OrphanReport {
    pub cart_items: u64,
    pub wishlist_items: u64,
    pub promotion_links: u64,
    pub order_items_detached: u64,
}

fn existing_products() -> SelectStatement {
    Query::select()
        .column(product::Column::Id)
        .from(product::Entity)
        .to_owned()
}

/// Remove rows that point at products which no longer exist.
/// Order items keep their snapshot and lose the product link.
pub async fn purge_orphans(db: &DatabaseConnection) -> Result<OrphanReport, DomainError> {
    let txn = db.begin().await?;

    let report = OrphanReport {
        cart_items: cart_item::Entity::delete_many()
            .filter(cart_item::Column::ProductId.not_in_subquery(existing_products()))
            .exec(&txn)
            .await?
            .rows_affected,
        wishlist_items: wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::ProductId.not_in_subquery(existing_products()))
            .exec(&txn)
            .await?
            .rows_affected,
        promotion_links: promotion_product::Entity::delete_many()
            .filter(promotion_product::Column::ProductId.not_in_subquery(existing_products()))
            .exec(&txn)
            .await?
            .rows_affected,
        order_items_detached: order_item::Entity::update_many()
            .col_expr(order_item::Column::ProductId, Expr::value(Value::Int(None)))
            .filter(order_item::Column::ProductId.is_not_null())
            .filter(order_item::Column::ProductId.not_in_subquery(existing_products()))
            .exec(&txn)
            .await?
            .rows_affected,
    };

    txn.commit().await?;
    tracing::info!("Orphan purge: {:?}", report);
    Ok(report)
}
