//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use serde::Deserialize;

use super::DomainError;
use super::order::{NewOrder, OrderFilter, OrderStatus, OrderWithItems};
use crate::models::{Order, Product};

/// Filter criteria for product queries
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub category_id: Option<i32>,
    pub query: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub include_drafts: bool,
}

/// Paginated result with total count
#[derive(Debug)]
pub struct PaginatedProducts {
    pub products: Vec<Product>,
    pub total: u64,
}

/// Input for creating or updating a product
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i32,
    pub category_id: Option<i32>,
    pub image_path: Option<String>,
}

/// Rows touched by a cascading product delete
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ProductCleanup {
    pub cart_items: u64,
    pub wishlist_items: u64,
    pub promotion_links: u64,
    pub order_items_detached: u64,
}

/// Repository trait for Product entity
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Find all products matching the filter criteria with pagination support
    async fn find_all(&self, filter: ProductFilter) -> Result<PaginatedProducts, DomainError>;

    /// Find a single product by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, DomainError>;

    /// Find several products at once; missing IDs are skipped
    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Product>, DomainError>;

    /// Create a new product
    async fn create(&self, input: ProductInput) -> Result<Product, DomainError>;

    /// Create an unnamed draft with the next free draft name
    async fn create_draft(&self) -> Result<Product, DomainError>;

    /// Update an existing product
    async fn update(&self, id: i32, input: ProductInput) -> Result<Product, DomainError>;

    /// Make a draft visible in the storefront
    async fn publish(&self, id: i32) -> Result<Product, DomainError>;

    /// Delete a product and every row referencing it, atomically
    async fn delete(&self, id: i32) -> Result<ProductCleanup, DomainError>;
}

/// Repository trait for Order entity
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// List orders, newest first
    async fn find_all(&self, filter: OrderFilter) -> Result<Vec<OrderWithItems>, DomainError>;

    /// Orders placed by one customer, newest first
    async fn find_by_user(&self, user_id: i32) -> Result<Vec<OrderWithItems>, DomainError>;

    /// Find a single order by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<OrderWithItems>, DomainError>;

    /// Find the order created for a payment intent
    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<OrderWithItems>, DomainError>;

    /// Insert an order with its lines, decrement stock and clear the buyer's
    /// cart in one transaction.
    ///
    /// Returns `(order, created)`; `created` is false when an order already
    /// existed for the payment intent and nothing was written.
    async fn create(&self, order: NewOrder) -> Result<(OrderWithItems, bool), DomainError>;

    /// Set the status of an order
    async fn update_status(&self, id: i32, status: OrderStatus) -> Result<Order, DomainError>;
}
