use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{Customer, Order, OrderItemRequest, OrderLine, Product};

/// Builds the unpersisted order for `customer`, one line per requested item in
/// request order, each priced at the product's current unit price.
pub fn assemble_order(
    customer: &Customer,
    items: &[OrderItemRequest],
    products: &HashMap<Uuid, Product>,
    created_at: DateTime<Utc>,
) -> Result<Order, DomainError> {
    let lines = items
        .iter()
        .map(|item| {
            let product = products
                .get(&item.product_id)
                .ok_or_else(|| DomainError::InvalidProduct {
                    missing: vec![item.product_id],
                })?;
            Ok(OrderLine {
                product_id: item.product_id,
                unit_price: product.unit_price.clone(),
                quantity: item.quantity,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    Ok(Order {
        id: Uuid::new_v4(),
        customer_id: customer.id,
        lines,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;

    fn customer() -> Customer {
        Customer {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    fn product(price: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: format!("product at {price}"),
            unit_price: BigDecimal::from_str(price).unwrap(),
            stock_quantity: 100,
        }
    }

    #[test]
    fn lines_follow_request_order_and_capture_prices() {
        let c = customer();
        let p1 = product("2.00");
        let p2 = product("5.00");
        let products: HashMap<_, _> = [(p1.id, p1.clone()), (p2.id, p2.clone())].into();
        let items = [
            OrderItemRequest {
                product_id: p2.id,
                quantity: 1,
            },
            OrderItemRequest {
                product_id: p1.id,
                quantity: 4,
            },
        ];
        let now = Utc::now();

        let order = assemble_order(&c, &items, &products, now).unwrap();

        assert_eq!(order.customer_id, c.id);
        assert_eq!(order.created_at, now);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].product_id, p2.id);
        assert_eq!(order.lines[0].unit_price, p2.unit_price);
        assert_eq!(order.lines[1].product_id, p1.id);
        assert_eq!(order.lines[1].quantity, 4);
    }

    #[test]
    fn duplicate_items_stay_separate_lines() {
        let c = customer();
        let p = product("1.50");
        let products: HashMap<_, _> = [(p.id, p.clone())].into();
        let items = [
            OrderItemRequest {
                product_id: p.id,
                quantity: 3,
            },
            OrderItemRequest {
                product_id: p.id,
                quantity: 4,
            },
        ];

        let order = assemble_order(&c, &items, &products, Utc::now()).unwrap();

        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total(), BigDecimal::from_str("10.50").unwrap());
    }

    #[test]
    fn captured_price_is_independent_of_the_product() {
        let c = customer();
        let p = product("9.99");
        let mut products: HashMap<_, _> = [(p.id, p.clone())].into();
        let items = [OrderItemRequest {
            product_id: p.id,
            quantity: 1,
        }];

        let order = assemble_order(&c, &items, &products, Utc::now()).unwrap();
        products.get_mut(&p.id).unwrap().unit_price = BigDecimal::from(100);

        assert_eq!(order.lines[0].unit_price, BigDecimal::from_str("9.99").unwrap());
    }
}
