use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Customer, NewCustomer, NewProduct, Product};
use crate::domain::ports::UnitOfWork;

/// Catalog operations as seen by the HTTP layer.
pub trait CatalogUseCases: Send + Sync {
    fn register_customer(&self, customer: NewCustomer) -> Result<Customer, DomainError>;
    fn add_product(&self, product: NewProduct) -> Result<Product, DomainError>;
    fn get_product(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn update_price(&self, id: Uuid, unit_price: BigDecimal) -> Result<Option<Product>, DomainError>;
}

pub struct CatalogService<S> {
    store: S,
}

impl<S: UnitOfWork> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: UnitOfWork> CatalogUseCases for CatalogService<S> {
    fn register_customer(&self, customer: NewCustomer) -> Result<Customer, DomainError> {
        let customer = NewCustomer {
            name: customer.name.trim().to_string(),
            email: customer.email.trim().to_lowercase(),
        };
        if customer.name.is_empty() {
            return Err(DomainError::InvalidInput("customer name is required".to_string()));
        }
        if !customer.email.contains('@') {
            return Err(DomainError::InvalidInput(format!(
                "'{}' is not an email address",
                customer.email
            )));
        }

        let created = self.store.transaction(|repos| {
            if repos.find_customer_by_email(&customer.email)?.is_some() {
                return Err(DomainError::AlreadyExists(format!(
                    "customer with email {}",
                    customer.email
                )));
            }
            repos.create_customer(customer)
        })?;
        log::info!("Registered customer {}", created.id);
        Ok(created)
    }

    fn add_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        let product = NewProduct {
            name: product.name.trim().to_string(),
            ..product
        };
        if product.name.is_empty() {
            return Err(DomainError::InvalidInput("product name is required".to_string()));
        }
        if product.stock_quantity < 0 {
            return Err(DomainError::InvalidInput(
                "stock quantity cannot be negative".to_string(),
            ));
        }
        validate_price(&product.unit_price)?;

        let created = self.store.transaction(|repos| {
            if repos.find_product_by_name(&product.name)?.is_some() {
                return Err(DomainError::AlreadyExists(format!("product named {}", product.name)));
            }
            repos.create_product(product)
        })?;
        log::info!(
            "Added product {} ({}) with {} in stock",
            created.id,
            created.name,
            created.stock_quantity
        );
        Ok(created)
    }

    fn get_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        self.store.transaction(|repos| repos.find_product(id))
    }

    /// Changes the price future orders will capture. Existing orders keep the
    /// price recorded on their lines.
    fn update_price(&self, id: Uuid, unit_price: BigDecimal) -> Result<Option<Product>, DomainError> {
        validate_price(&unit_price)?;
        self.store
            .transaction(|repos| repos.update_unit_price(id, unit_price))
    }
}

/// Prices are non-negative with at most two decimal places.
fn validate_price(price: &BigDecimal) -> Result<(), DomainError> {
    if *price < BigDecimal::zero() {
        return Err(DomainError::InvalidInput("price cannot be negative".to_string()));
    }
    let (_, scale) = price.normalized().as_bigint_and_exponent();
    if scale > 2 {
        return Err(DomainError::InvalidInput(format!(
            "price {price} has more than two decimal places"
        )));
    }
    Ok(())
}
