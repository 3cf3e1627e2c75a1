use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    page_offset, Customer, ListResult, NewCustomer, NewProduct, Order, Product, StockUpdate,
};
use crate::domain::ports::{
    CustomerRepository, OrderRepository, ProductRepository, Repositories, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct State {
    customers: HashMap<Uuid, Customer>,
    products: HashMap<Uuid, Product>,
    orders: Vec<Order>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_order_insert: AtomicBool,
    transient_commit_failures: AtomicU32,
}

/// In-memory store for tests and local runs.
///
/// Transactions run one at a time against a private copy of the data, which
/// replaces the shared state only when the transaction returns `Ok`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every order insert fail with a non-transient persistence error.
    pub fn fail_order_inserts(&self, fail: bool) {
        self.faults.fail_order_insert.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` commits fail with a transient persistence error.
    pub fn fail_next_commits(&self, count: u32) {
        self.faults
            .transient_commit_failures
            .store(count, Ordering::SeqCst);
    }

    pub fn product(&self, id: Uuid) -> Option<Product> {
        self.state.lock().ok()?.products.get(&id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().map(|s| s.orders.len()).unwrap_or(0)
    }

    fn take_commit_failure(&self) -> bool {
        self.faults
            .transient_commit_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl UnitOfWork for InMemoryStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn Repositories) -> Result<T, DomainError>,
    {
        let mut state = self
            .state
            .lock()
            .map_err(|_| DomainError::persistence("in-memory store lock poisoned"))?;

        let mut tx = MemoryTx {
            working: state.clone(),
            faults: &self.faults,
        };
        let out = f(&mut tx)?;

        if self.take_commit_failure() {
            return Err(DomainError::conflict("simulated commit conflict"));
        }
        *state = tx.working;
        Ok(out)
    }
}

struct MemoryTx<'a> {
    working: State,
    faults: &'a Faults,
}

impl CustomerRepository for MemoryTx<'_> {
    fn find_customer(&mut self, id: Uuid) -> Result<Option<Customer>, DomainError> {
        Ok(self.working.customers.get(&id).cloned())
    }

    fn find_customer_by_email(&mut self, email: &str) -> Result<Option<Customer>, DomainError> {
        Ok(self
            .working
            .customers
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    fn create_customer(&mut self, customer: NewCustomer) -> Result<Customer, DomainError> {
        let customer = Customer {
            id: Uuid::new_v4(),
            name: customer.name,
            email: customer.email,
        };
        self.working.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }
}

impl ProductRepository for MemoryTx<'_> {
    fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.working.products.get(&id).cloned())
    }

    fn find_products(&mut self, ids: &[Uuid]) -> Result<HashMap<Uuid, Product>, DomainError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.products.get(id))
            .map(|p| (p.id, p.clone()))
            .collect())
    }

    fn find_product_by_name(&mut self, name: &str) -> Result<Option<Product>, DomainError> {
        Ok(self
            .working
            .products
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    fn create_product(&mut self, product: NewProduct) -> Result<Product, DomainError> {
        let product = Product {
            id: Uuid::new_v4(),
            name: product.name,
            unit_price: product.unit_price,
            stock_quantity: product.stock_quantity,
        };
        self.working.products.insert(product.id, product.clone());
        Ok(product)
    }

    fn update_unit_price(
        &mut self,
        id: Uuid,
        unit_price: BigDecimal,
    ) -> Result<Option<Product>, DomainError> {
        Ok(self.working.products.get_mut(&id).map(|p| {
            p.unit_price = unit_price;
            p.clone()
        }))
    }

    fn update_quantities(&mut self, updates: &[StockUpdate]) -> Result<(), DomainError> {
        for update in updates {
            let product = self
                .working
                .products
                .get_mut(&update.product_id)
                .ok_or_else(|| DomainError::conflict(format!("product {} vanished", update.product_id)))?;
            if product.stock_quantity != update.previous_quantity {
                return Err(DomainError::conflict(format!(
                    "stock of product {} changed concurrently",
                    update.product_id
                )));
            }
            product.stock_quantity = update.new_quantity;
        }
        Ok(())
    }
}

impl OrderRepository for MemoryTx<'_> {
    fn create_order(&mut self, order: &Order) -> Result<(), DomainError> {
        if self.faults.fail_order_insert.load(Ordering::SeqCst) {
            return Err(DomainError::persistence("simulated order insert failure"));
        }
        self.working.orders.push(order.clone());
        Ok(())
    }

    fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.working.orders.iter().find(|o| o.id == id).cloned())
    }

    fn list_orders(&mut self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let total = self.working.orders.len() as i64;
        let offset = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(0);

        let mut newest_first = self.working.orders.clone();
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let items = newest_first.into_iter().skip(offset).take(limit).collect();

        Ok(ListResult { items, total })
    }
}
