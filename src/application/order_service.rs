use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::domain::assembler::assemble_order;
use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, Order, OrderRequest};
use crate::domain::ports::{Repositories, UnitOfWork};
use crate::domain::reservation::{distinct_product_ids, reserve};

/// Order operations as seen by the HTTP layer.
pub trait OrderUseCases: Send + Sync {
    fn create_order(&self, request: OrderRequest) -> Result<Order, DomainError>;
    fn get_order(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;
}

pub struct OrderService<S> {
    store: S,
    max_attempts: u32,
}

impl<S: UnitOfWork> OrderService<S> {
    pub fn new(store: S, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Places an order: the customer and every product must exist and each
    /// product must have enough stock for the summed quantity requested. Stock
    /// is decremented and the order stored in one unit of work; on any error
    /// nothing is written.
    ///
    /// Lock conflicts during the commit rerun the whole workflow, up to the
    /// configured number of attempts.
    pub fn create_order(&self, request: OrderRequest) -> Result<Order, DomainError> {
        validate_request(&request)?;

        let mut attempt = 1;
        loop {
            match self.store.transaction(|repos| place_order(repos, &request)) {
                Ok(order) => {
                    log::info!(
                        "Order {} placed for customer {} ({} lines, total {})",
                        order.id,
                        order.customer_id,
                        order.lines.len(),
                        order.total()
                    );
                    return Ok(order);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    log::warn!(
                        "Order for customer {} hit a conflict on attempt {}/{}: {}",
                        request.customer_id,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        log::error!("Order for customer {} failed: {}", request.customer_id, e);
                    } else {
                        log::debug!("Order for customer {} rejected: {}", request.customer_id, e);
                    }
                    return Err(e);
                }
            }
        }
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        self.store.transaction(|repos| repos.find_order(id))
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.store.transaction(|repos| repos.list_orders(page, limit))
    }
}

impl<S: UnitOfWork> OrderUseCases for OrderService<S> {
    fn create_order(&self, request: OrderRequest) -> Result<Order, DomainError> {
        OrderService::create_order(self, request)
    }

    fn get_order(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        OrderService::get_order(self, id)
    }

    fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        OrderService::list_orders(self, page, limit)
    }
}

fn validate_request(request: &OrderRequest) -> Result<(), DomainError> {
    if request.items.is_empty() {
        return Err(DomainError::InvalidInput(
            "an order needs at least one item".to_string(),
        ));
    }
    if let Some(item) = request.items.iter().find(|i| i.quantity <= 0) {
        return Err(DomainError::InvalidInput(format!(
            "quantity for product {} must be positive, got {}",
            item.product_id, item.quantity
        )));
    }
    Ok(())
}

fn place_order(repos: &mut dyn Repositories, request: &OrderRequest) -> Result<Order, DomainError> {
    let customer = repos
        .find_customer(request.customer_id)?
        .ok_or(DomainError::CustomerNotFound(request.customer_id))?;

    let products = repos.find_products(&distinct_product_ids(&request.items))?;
    let stock_updates = reserve(&request.items, &products)?;

    // Postgres keeps microseconds; truncate so the returned order matches what is stored.
    let order = assemble_order(
        &customer,
        &request.items,
        &products,
        Utc::now().trunc_subsecs(6),
    )?;

    repos.update_quantities(&stock_updates)?;
    repos.create_order(&order)?;
    Ok(order)
}
