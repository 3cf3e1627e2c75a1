use std::collections::HashMap;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{
    Customer, ListResult, NewCustomer, NewProduct, Order, Product, StockUpdate,
};

pub trait CustomerRepository {
    fn find_customer(&mut self, id: Uuid) -> Result<Option<Customer>, DomainError>;
    fn find_customer_by_email(&mut self, email: &str) -> Result<Option<Customer>, DomainError>;
    fn create_customer(&mut self, customer: NewCustomer) -> Result<Customer, DomainError>;
}

pub trait ProductRepository {
    /// Plain read, takes no locks.
    fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, DomainError>;
    /// Loads every product in `ids` that exists. Ids with no product are left
    /// out of the map. The returned rows stay locked against concurrent stock
    /// changes until the surrounding unit of work ends.
    fn find_products(&mut self, ids: &[Uuid]) -> Result<HashMap<Uuid, Product>, DomainError>;
    fn find_product_by_name(&mut self, name: &str) -> Result<Option<Product>, DomainError>;
    fn create_product(&mut self, product: NewProduct) -> Result<Product, DomainError>;
    fn update_unit_price(
        &mut self,
        id: Uuid,
        unit_price: BigDecimal,
    ) -> Result<Option<Product>, DomainError>;
    /// Writes the new stock levels. Fails with a transient persistence error
    /// if any product's stored quantity no longer equals `previous_quantity`.
    fn update_quantities(&mut self, updates: &[StockUpdate]) -> Result<(), DomainError>;
}

pub trait OrderRepository {
    fn create_order(&mut self, order: &Order) -> Result<(), DomainError>;
    fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list_orders(&mut self, page: i64, limit: i64) -> Result<ListResult, DomainError>;
}

/// All repositories bound to one atomic scope.
pub trait Repositories: CustomerRepository + ProductRepository + OrderRepository {}

impl<T> Repositories for T where T: CustomerRepository + ProductRepository + OrderRepository {}

pub trait UnitOfWork: Send + Sync + 'static {
    /// Runs `f` in a single atomic scope. Everything `f` wrote becomes visible
    /// together when it returns `Ok`; on `Err` nothing it wrote is kept.
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn Repositories) -> Result<T, DomainError>;
}
