use std::collections::HashMap;

use bigdecimal::BigDecimal;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    page_offset, Customer, ListResult, NewCustomer, NewProduct, Order, Product, StockUpdate,
};
use crate::domain::ports::{
    CustomerRepository, OrderRepository, ProductRepository, Repositories, UnitOfWork,
};
use crate::schema::{customers, order_lines, orders, products};

use super::models::{
    CustomerRow, NewCustomerRow, NewOrderLineRow, NewOrderRow, NewProductRow, OrderLineRow,
    OrderRow, ProductRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

/// Postgres reports these without a dedicated diesel error kind.
const CONTENTION_MESSAGES: [&str; 2] = ["deadlock detected", "lock timeout"];

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        // A racing insert can slip past the service's existence check.
        if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &e {
            return DomainError::AlreadyExists(
                info.constraint_name().unwrap_or(info.message()).to_string(),
            );
        }
        let transient = match &e {
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => true,
            DieselError::DatabaseError(_, info) => CONTENTION_MESSAGES
                .iter()
                .any(|m| info.message().contains(m)),
            _ => false,
        };
        DomainError::Persistence {
            message: e.to_string(),
            transient,
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::persistence(e.to_string())
    }
}

// ── Unit of work ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselStore {
    pool: DbPool,
}

impl DieselStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UnitOfWork for DieselStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn Repositories) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<_, DomainError, _>(|conn| {
            let mut repos = PgRepositories { conn };
            f(&mut repos)
        })
    }
}

/// Repositories bound to the connection of an open transaction.
struct PgRepositories<'c> {
    conn: &'c mut PgConnection,
}

impl CustomerRepository for PgRepositories<'_> {
    fn find_customer(&mut self, id: Uuid) -> Result<Option<Customer>, DomainError> {
        let row = customers::table
            .find(id)
            .select(CustomerRow::as_select())
            .first(self.conn)
            .optional()?;
        Ok(row.map(Customer::from))
    }

    fn find_customer_by_email(&mut self, email: &str) -> Result<Option<Customer>, DomainError> {
        let row = customers::table
            .filter(customers::email.eq(email))
            .select(CustomerRow::as_select())
            .first(self.conn)
            .optional()?;
        Ok(row.map(Customer::from))
    }

    fn create_customer(&mut self, customer: NewCustomer) -> Result<Customer, DomainError> {
        let row = diesel::insert_into(customers::table)
            .values(&NewCustomerRow {
                id: Uuid::new_v4(),
                name: customer.name,
                email: customer.email,
            })
            .returning(CustomerRow::as_returning())
            .get_result(self.conn)?;
        Ok(row.into())
    }
}

impl ProductRepository for PgRepositories<'_> {
    fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(self.conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn find_products(&mut self, ids: &[Uuid]) -> Result<HashMap<Uuid, Product>, DomainError> {
        // Rows are locked in id order so two orders over the same products
        // cannot deadlock on each other.
        let rows = products::table
            .filter(products::id.eq_any(ids.to_vec()))
            .select(ProductRow::as_select())
            .order(products::id)
            .for_update()
            .load(self.conn)?;
        Ok(rows.into_iter().map(|r| (r.id, Product::from(r))).collect())
    }

    fn find_product_by_name(&mut self, name: &str) -> Result<Option<Product>, DomainError> {
        let row = products::table
            .filter(products::name.eq(name))
            .select(ProductRow::as_select())
            .first(self.conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn create_product(&mut self, product: NewProduct) -> Result<Product, DomainError> {
        let row = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: product.name,
                unit_price: product.unit_price,
                stock_quantity: product.stock_quantity,
            })
            .returning(ProductRow::as_returning())
            .get_result(self.conn)?;
        Ok(row.into())
    }

    fn update_unit_price(
        &mut self,
        id: Uuid,
        unit_price: BigDecimal,
    ) -> Result<Option<Product>, DomainError> {
        let row = diesel::update(products::table.find(id))
            .set((
                products::unit_price.eq(unit_price),
                products::updated_at.eq(diesel::dsl::now),
            ))
            .returning(ProductRow::as_returning())
            .get_result(self.conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn update_quantities(&mut self, updates: &[StockUpdate]) -> Result<(), DomainError> {
        for update in updates {
            let changed = diesel::update(
                products::table
                    .find(update.product_id)
                    .filter(products::stock_quantity.eq(update.previous_quantity)),
            )
            .set((
                products::stock_quantity.eq(update.new_quantity),
                products::updated_at.eq(diesel::dsl::now),
            ))
            .execute(self.conn)?;

            if changed != 1 {
                return Err(DomainError::conflict(format!(
                    "stock of product {} changed concurrently",
                    update.product_id
                )));
            }
        }
        Ok(())
    }
}

impl OrderRepository for PgRepositories<'_> {
    fn create_order(&mut self, order: &Order) -> Result<(), DomainError> {
        diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                id: order.id,
                customer_id: order.customer_id,
                created_at: order.created_at,
            })
            .execute(self.conn)?;

        let new_lines = order
            .lines
            .iter()
            .enumerate()
            .map(|(position, line)| {
                let position = i32::try_from(position)
                    .map_err(|_| DomainError::InvalidInput("too many order lines".to_string()))?;
                Ok(NewOrderLineRow {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    position,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price.clone(),
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        diesel::insert_into(order_lines::table)
            .values(&new_lines)
            .execute(self.conn)?;

        Ok(())
    }

    fn find_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let order = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(self.conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = OrderLineRow::belonging_to(&order)
            .order(order_lines::position)
            .select(OrderLineRow::as_select())
            .load(self.conn)?;

        Ok(Some(Order {
            id: order.id,
            customer_id: order.customer_id,
            created_at: order.created_at,
            lines: lines.into_iter().map(Into::into).collect(),
        }))
    }

    fn list_orders(&mut self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let offset = page_offset(page, limit);
        let total: i64 = orders::table.count().get_result(self.conn)?;

        let rows = orders::table
            .select(OrderRow::as_select())
            .order(orders::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(self.conn)?;

        let lines = OrderLineRow::belonging_to(&rows)
            .order(order_lines::position)
            .select(OrderLineRow::as_select())
            .load::<OrderLineRow>(self.conn)?
            .grouped_by(&rows);

        Ok(ListResult {
            items: rows
                .into_iter()
                .zip(lines)
                .map(|(o, lines)| Order {
                    id: o.id,
                    customer_id: o.customer_id,
                    created_at: o.created_at,
                    lines: lines.into_iter().map(Into::into).collect(),
                })
                .collect(),
            total,
        })
    }
}
