//! Stock reservation: checks a request against a product snapshot and works out
//! the stock levels that placing it would leave behind.

use std::collections::HashMap;

use uuid::Uuid;

use super::errors::DomainError;
use super::order::{OrderItemRequest, Product, StockShortfall, StockUpdate};

/// Distinct product ids of `items` in first-seen order.
pub fn distinct_product_ids(items: &[OrderItemRequest]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = Vec::with_capacity(items.len());
    for item in items {
        if !ids.contains(&item.product_id) {
            ids.push(item.product_id);
        }
    }
    ids
}

/// Total requested quantity per distinct product, in first-seen order.
fn requested_totals(items: &[OrderItemRequest]) -> Vec<(Uuid, i64)> {
    let mut totals: Vec<(Uuid, i64)> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    for item in items {
        match index.get(&item.product_id) {
            Some(&i) => totals[i].1 += i64::from(item.quantity),
            None => {
                index.insert(item.product_id, totals.len());
                totals.push((item.product_id, i64::from(item.quantity)));
            }
        }
    }
    totals
}

/// Validates `items` against `products` and returns one [`StockUpdate`] per
/// distinct product, in the order products first appear in the request.
///
/// Quantities for a product listed more than once are summed before being
/// compared with its stock. Unknown products take precedence over stock
/// shortfalls; either way every offending product is reported, not just the
/// first one.
pub fn reserve(
    items: &[OrderItemRequest],
    products: &HashMap<Uuid, Product>,
) -> Result<Vec<StockUpdate>, DomainError> {
    let mut missing = Vec::new();
    let mut shortfalls = Vec::new();
    let mut updates = Vec::new();

    for (product_id, requested) in requested_totals(items) {
        let Some(product) = products.get(&product_id) else {
            missing.push(product_id);
            continue;
        };
        let available = i64::from(product.stock_quantity);
        let remaining = available - requested;
        match i32::try_from(remaining) {
            Ok(new_quantity) if remaining >= 0 => updates.push(StockUpdate {
                product_id,
                previous_quantity: product.stock_quantity,
                new_quantity,
            }),
            _ => shortfalls.push(StockShortfall {
                product_id,
                requested,
                available,
            }),
        }
    }

    if !missing.is_empty() {
        return Err(DomainError::InvalidProduct { missing });
    }
    if !shortfalls.is_empty() {
        return Err(DomainError::InsufficientStock { shortfalls });
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "widget".to_string(),
            unit_price: BigDecimal::from(1),
            stock_quantity: stock,
        }
    }

    fn catalog(products: &[&Product]) -> HashMap<Uuid, Product> {
        products.iter().map(|p| (p.id, (*p).clone())).collect()
    }

    fn item(product: &Product, quantity: i32) -> OrderItemRequest {
        OrderItemRequest {
            product_id: product.id,
            quantity,
        }
    }

    #[test]
    fn computes_remaining_stock_per_product() {
        let p1 = product(10);
        let p2 = product(2);
        let updates = reserve(&[item(&p1, 4), item(&p2, 1)], &catalog(&[&p1, &p2]))
            .expect("reservation should succeed");

        assert_eq!(
            updates,
            vec![
                StockUpdate {
                    product_id: p1.id,
                    previous_quantity: 10,
                    new_quantity: 6
                },
                StockUpdate {
                    product_id: p2.id,
                    previous_quantity: 2,
                    new_quantity: 1
                },
            ]
        );
    }

    #[test]
    fn exact_stock_leaves_zero() {
        let p = product(3);
        let updates = reserve(&[item(&p, 3)], &catalog(&[&p])).unwrap();
        assert_eq!(updates[0].new_quantity, 0);
    }

    #[test]
    fn duplicate_lines_are_summed_before_checking_stock() {
        let p = product(5);
        let err = reserve(&[item(&p, 3), item(&p, 4)], &catalog(&[&p])).unwrap_err();

        let DomainError::InsufficientStock { shortfalls } = err else {
            panic!("expected InsufficientStock");
        };
        assert_eq!(shortfalls.len(), 1);
        assert_eq!(shortfalls[0].product_id, p.id);
        assert_eq!(shortfalls[0].requested, 7);
        assert_eq!(shortfalls[0].available, 5);
        assert_eq!(shortfalls[0].shortfall(), 2);
    }

    #[test]
    fn duplicate_lines_produce_a_single_update() {
        let p = product(10);
        let updates = reserve(&[item(&p, 3), item(&p, 4)], &catalog(&[&p])).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].new_quantity, 3);
    }

    #[test]
    fn unknown_product_is_reported() {
        let p = product(10);
        let ghost = Uuid::new_v4();
        let items = [
            item(&p, 1),
            OrderItemRequest {
                product_id: ghost,
                quantity: 1,
            },
        ];
        let err = reserve(&items, &catalog(&[&p])).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidProduct {
                missing: vec![ghost]
            }
        );
    }

    #[test]
    fn unknown_product_wins_over_shortfall() {
        let p = product(1);
        let ghost = Uuid::new_v4();
        let items = [
            item(&p, 5),
            OrderItemRequest {
                product_id: ghost,
                quantity: 1,
            },
        ];
        let err = reserve(&items, &catalog(&[&p])).unwrap_err();
        assert!(matches!(err, DomainError::InvalidProduct { .. }));
    }

    #[test]
    fn every_short_product_is_reported() {
        let ok = product(10);
        let short_a = product(1);
        let short_b = product(0);
        let items = [item(&ok, 2), item(&short_a, 2), item(&short_b, 1)];
        let err = reserve(&items, &catalog(&[&ok, &short_a, &short_b])).unwrap_err();

        let DomainError::InsufficientStock { shortfalls } = err else {
            panic!("expected InsufficientStock");
        };
        let ids: Vec<Uuid> = shortfalls.iter().map(|s| s.product_id).collect();
        assert_eq!(ids, vec![short_a.id, short_b.id]);
    }

    #[test]
    fn large_duplicate_totals_do_not_overflow() {
        let p = product(i32::MAX);
        let err = reserve(&[item(&p, i32::MAX), item(&p, i32::MAX)], &catalog(&[&p])).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[test]
    fn same_input_gives_same_output() {
        let p1 = product(8);
        let p2 = product(4);
        let products = catalog(&[&p1, &p2]);
        let items = [item(&p2, 1), item(&p1, 2), item(&p2, 3)];

        let first = reserve(&items, &products);
        let second = reserve(&items, &products);
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_ids_keep_first_seen_order() {
        let p1 = product(1);
        let p2 = product(1);
        let ids = distinct_product_ids(&[item(&p2, 1), item(&p1, 1), item(&p2, 1)]);
        assert_eq!(ids, vec![p2.id, p1.id]);
    }
}
