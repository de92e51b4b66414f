//! Order Service - order listing, status updates and dashboard figures

use sea_orm::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{DomainError, OrderFilter, OrderStatus, OrderWithItems};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::Claims;
use crate::models::order::Entity as Order;
use crate::models::product::{self, Entity as Product};
use crate::models::user::{self, Entity as User, ROLE_CUSTOMER};
use crate::services::notification_service;

/// Figures shown on the admin dashboard
#[derive(Debug, Clone, Serialize)]
pub struct OrderStatistics {
    pub total_orders: u64,
    pub revenue_cents: i64,
    pub average_order_cents: i64,
    pub orders_by_status: BTreeMap<String, u64>,
    pub published_products: u64,
    pub draft_products: u64,
    pub customers: u64,
}

pub async fn list_orders(
    state: &AppState,
    filter: OrderFilter,
) -> Result<Vec<OrderWithItems>, DomainError> {
    state.order_repo.find_all(filter).await
}

pub async fn my_orders(state: &AppState, user_id: i32) -> Result<Vec<OrderWithItems>, DomainError> {
    state.order_repo.find_by_user(user_id).await
}

/// Admins see every order, customers only their own.
/// Someone else's order reads as missing rather than forbidden.
pub async fn get_order(
    state: &AppState,
    id: i32,
    claims: &Claims,
) -> Result<OrderWithItems, DomainError> {
    let order = state
        .order_repo
        .find_by_id(id)
        .await?
        .ok_or(DomainError::NotFound)?;

    if claims.is_admin() || order.user_id == Some(claims.uid) {
        Ok(order)
    } else {
        Err(DomainError::NotFound)
    }
}

/// Set an order's status. Any status may follow any other.
///
/// The customer's devices are notified afterwards; push failures do not
/// affect the update.
pub async fn update_status(
    state: &AppState,
    id: i32,
    status: OrderStatus,
) -> Result<OrderWithItems, DomainError> {
    let updated = state.order_repo.update_status(id, status).await?;
    tracing::info!("Order {} is now {}", updated.id, status);

    if let Some(user_id) = updated.user_id {
        let body = format!("Il tuo ordine n. {} è {}", updated.id, status.display_label());
        let reached = notification_service::notify_user(
            state.db(),
            &state.fcm,
            user_id,
            "Aggiornamento ordine",
            &body,
        )
        .await;
        tracing::debug!("Status push for order {} reached {} devices", id, reached);
    }

    state
        .order_repo
        .find_by_id(id)
        .await?
        .ok_or(DomainError::NotFound)
}

pub async fn statistics(db: &DatabaseConnection) -> Result<OrderStatistics, DomainError> {
    let orders = Order::find().all(db).await?;

    let total_orders = orders.len() as u64;
    let revenue_cents: i64 = orders.iter().map(|o| o.total_cents).sum();
    let average_order_cents = if total_orders == 0 {
        0
    } else {
        revenue_cents / total_orders as i64
    };

    let mut orders_by_status: BTreeMap<String, u64> = OrderStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for order in &orders {
        let status = OrderStatus::from_stored(&order.status);
        *orders_by_status.entry(status.as_str().to_string()).or_insert(0) += 1;
    }

    let published_products = Product::find()
        .filter(product::Column::IsDraft.eq(false))
        .count(db)
        .await?;
    let draft_products = Product::find()
        .filter(product::Column::IsDraft.eq(true))
        .count(db)
        .await?;
    let customers = User::find()
        .filter(user::Column::Role.eq(ROLE_CUSTOMER))
        .count(db)
        .await?;

    Ok(OrderStatistics {
        total_orders,
        revenue_cents,
        average_order_cents,
        orders_by_status,
        published_products,
        draft_products,
        customers,
    })
}

const CSV_HEADER: [&str; 9] = [
    "order_id",
    "created_at",
    "email",
    "status",
    "order_total_cents",
    "product_id",
    "product_name",
    "quantity",
    "unit_price_cents",
];

/// CSV export with one row per order line.
/// An order without lines still gets one row, with the item columns empty.
pub fn orders_to_csv(orders: &[OrderWithItems]) -> Result<String, DomainError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| DomainError::Internal(format!("CSV export failed: {}", e));

    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for order in orders {
        let order_columns = [
            order.id.to_string(),
            order.created_at.clone(),
            order.email.clone(),
            order.status.to_string(),
            order.total_cents.to_string(),
        ];
        let item_rows: Vec<[String; 4]> = if order.items.is_empty() {
            vec![Default::default()]
        } else {
            order
                .items
                .iter()
                .map(|item| {
                    [
                        item.product_id.map(|id| id.to_string()).unwrap_or_default(),
                        item.product_name.clone(),
                        item.quantity.to_string(),
                        item.unit_price_cents.to_string(),
                    ]
                })
                .collect()
        };
        for item_columns in item_rows {
            writer
                .write_record(order_columns.iter().chain(item_columns.iter()))
                .map_err(csv_err)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DomainError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| DomainError::Internal(e.to_string()))
}

pub async fn export_csv(state: &AppState, filter: OrderFilter) -> Result<String, DomainError> {
    let orders = state.order_repo.find_all(filter).await?;
    orders_to_csv(&orders)
}
