//! Order lifecycle types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{order, order_item};

/// Fulfilment status of an order.
///
/// Any status may be set from any other; there is no enforced transition
/// order. Labels outside the set read back as `Sconosciuto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    InPreparazione,
    Spedito,
    Consegnato,
    Sconosciuto,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::InPreparazione,
        OrderStatus::Spedito,
        OrderStatus::Consegnato,
        OrderStatus::Sconosciuto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::InPreparazione => "in_preparazione",
            OrderStatus::Spedito => "spedito",
            OrderStatus::Consegnato => "consegnato",
            OrderStatus::Sconosciuto => "sconosciuto",
        }
    }

    /// Lenient read of a stored label.
    pub fn from_stored(label: &str) -> Self {
        label.parse().unwrap_or(OrderStatus::Sconosciuto)
    }

    /// Human label used in customer notifications.
    pub fn display_label(&self) -> &'static str {
        match self {
            OrderStatus::InPreparazione => "in preparazione",
            OrderStatus::Spedito => "spedito",
            OrderStatus::Consegnato => "consegnato",
            OrderStatus::Sconosciuto => "in verifica",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown order status: {}", s))
    }
}

/// Filter parameters for listing orders
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub email: Option<String>,
}

/// Line of an order about to be created
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: i32,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
}

/// Order about to be created from a confirmed payment
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<i32>,
    pub email: String,
    pub payment_intent_id: String,
    pub total_cents: i64,
    pub shipping_address: Option<String>,
    pub items: Vec<NewOrderItem>,
}

/// Order with its lines, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    pub id: i32,
    pub user_id: Option<i32>,
    pub email: String,
    pub payment_intent_id: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub shipping_address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<order_item::Model>,
}

impl OrderWithItems {
    pub fn from_parts(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            email: order.email,
            payment_intent_id: order.payment_intent_id,
            total_cents: order.total_cents,
            status: OrderStatus::from_stored(&order.status),
            shipping_address: order.shipping_address,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip_through_from_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_label_is_rejected_on_parse() {
        assert!("annullato".parse::<OrderStatus>().is_err());
        assert!("SPEDITO".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn unknown_stored_label_reads_as_sconosciuto() {
        assert_eq!(OrderStatus::from_stored("pending"), OrderStatus::Sconosciuto);
        assert_eq!(OrderStatus::from_stored("spedito"), OrderStatus::Spedito);
    }

    #[test]
    fn serde_uses_snake_case_labels() {
        let json = serde_json::to_string(&OrderStatus::InPreparazione).unwrap();
        assert_eq!(json, "\"in_preparazione\"");
        let parsed: OrderStatus = serde_json::from_str("\"consegnato\"").unwrap();
        assert_eq!(parsed, OrderStatus::Consegnato);
    }
}
