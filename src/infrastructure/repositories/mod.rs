//! Repository implementations using SeaORM

pub mod order_repository;
pub mod product_repository;

pub use order_repository::SeaOrmOrderRepository;
pub use product_repository::SeaOrmProductRepository;
