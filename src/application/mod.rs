pub mod catalog_service;
pub mod order_service;

pub use catalog_service::{CatalogService, CatalogUseCases};
pub use order_service::{OrderService, OrderUseCases};
