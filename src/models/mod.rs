pub mod cart_item;
pub mod category;
pub mod device_token;
pub mod message;
pub mod order;
pub mod order_item;
pub mod product;
pub mod promotion;
pub mod promotion_product;
pub mod sms_message;
pub mod user;
pub mod wishlist_item;

pub use order::Model as Order;
pub use product::Model as Product;
