//! Services Layer
//!
//! Business logic extracted from HTTP handlers.
//! Services are called by the Axum handlers and by the maintenance tasks in `main`.

pub mod cart_service;
pub mod category_service;
pub mod chat_service;
pub mod maintenance_service;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod product_service;
pub mod promotion_service;
pub mod sms_service;
pub mod user_service;
