pub mod catalog;
pub mod orders;

use std::sync::Arc;

use crate::application::{CatalogService, CatalogUseCases, OrderService, OrderUseCases};
use crate::domain::ports::UnitOfWork;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderUseCases>,
    pub catalog: Arc<dyn CatalogUseCases>,
}

impl AppState {
    pub fn new<S>(store: S, max_order_attempts: u32) -> Self
    where
        S: UnitOfWork + Clone,
    {
        Self {
            orders: Arc::new(OrderService::new(store.clone(), max_order_attempts)),
            catalog: Arc::new(CatalogService::new(store)),
        }
    }
}
