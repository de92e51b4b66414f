pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod chat;
pub mod error;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod promotions;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::infrastructure::AppState;

pub use error::ApiResult;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth and profile
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/confirm", get(auth::confirm_email))
        .route("/auth/me", get(auth::get_me))
        .route("/profile", put(auth::update_profile))
        // Storefront catalog
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/categories", get(categories::list_categories))
        .route("/promotions/active", get(promotions::list_active))
        // Cart and wishlist
        .route(
            "/cart",
            get(cart::get_cart)
                .post(cart::add_to_cart)
                .delete(cart::clear_cart),
        )
        .route(
            "/cart/:product_id",
            put(cart::set_quantity).delete(cart::remove_from_cart),
        )
        .route(
            "/wishlist",
            get(cart::get_wishlist).post(cart::add_to_wishlist),
        )
        .route(
            "/wishlist/:product_id",
            axum::routing::delete(cart::remove_from_wishlist),
        )
        // Customer orders
        .route("/orders/mine", get(orders::my_orders))
        .route("/orders/:id", get(orders::get_order))
        // Payments
        .route("/payments/intent", post(payments::create_intent))
        .route("/payments/webhook", post(payments::webhook))
        .route("/payments/invoices", get(payments::list_invoices))
        .route("/payments/config", get(payments::public_config))
        // Notifications
        .route("/notifications/send", post(notifications::send_push))
        .route(
            "/notifications/tokens",
            post(notifications::register_token).delete(notifications::remove_token),
        )
        .route(
            "/sms",
            get(notifications::list_sms).post(notifications::enqueue_sms),
        )
        .route("/sms/dispatch", post(notifications::dispatch_sms))
        // Chat
        .route("/chat", get(chat::my_conversation).post(chat::send_message))
        // Admin: products
        .route(
            "/admin/products",
            get(products::admin_list_products).post(products::create_product),
        )
        .route("/admin/products/draft", post(products::create_draft))
        .route(
            "/admin/products/:id",
            get(products::admin_get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/admin/products/:id/publish",
            post(products::publish_product),
        )
        // Admin: categories
        .route("/admin/categories", post(categories::create_category))
        .route(
            "/admin/categories/:id",
            put(categories::update_category).delete(categories::delete_category),
        )
        // Admin: promotions
        .route(
            "/admin/promotions",
            get(promotions::list_promotions).post(promotions::create_promotion),
        )
        .route(
            "/admin/promotions/:id",
            get(promotions::get_promotion)
                .put(promotions::update_promotion)
                .delete(promotions::delete_promotion),
        )
        .route(
            "/admin/promotions/:id/products/:product_id",
            put(promotions::attach_product).delete(promotions::detach_product),
        )
        // Admin: orders and dashboard
        .route("/admin/orders", get(orders::list_orders))
        .route("/admin/orders/export", get(orders::export_csv))
        .route("/admin/orders/:id/status", put(orders::update_status))
        .route("/admin/stats", get(orders::statistics))
        // Admin: users
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id", axum::routing::delete(admin::delete_user))
        .route("/admin/users/:id/role", put(admin::set_role))
        // Admin: chat
        .route("/admin/chat", get(chat::list_conversations))
        .route(
            "/admin/chat/:customer_id",
            get(chat::conversation).post(chat::reply),
        )
        // Storage
        .route("/storage/sign", get(admin::sign_storage_url))
        .with_state(state)
}
