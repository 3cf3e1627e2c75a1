use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{Customer, NewCustomer, NewProduct, Product};
use crate::errors::AppError;

use super::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        CustomerResponse {
            id: c.id,
            name: c.name,
            email: c.email,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
    pub stock_quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePriceRequest {
    /// Decimal price as a string, e.g. "9.99"
    pub unit_price: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub unit_price: String,
    pub stock_quantity: i32,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id,
            name: p.name,
            unit_price: p.unit_price.to_string(),
            stock_quantity: p.stock_quantity,
        }
    }
}

fn parse_price(raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid unit_price '{}': {}", raw, e)))
}

/// POST /customers
#[utoipa::path(
    post,
    path = "/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer registered", body = CustomerResponse),
        (status = 400, description = "Missing name or malformed email"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "catalog"
)]
pub async fn create_customer(
    state: web::Data<AppState>,
    body: web::Json<CreateCustomerRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let customer = NewCustomer {
        name: body.name,
        email: body.email,
    };

    let catalog = state.catalog.clone();
    let created = web::block(move || catalog.register_customer(customer))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(CustomerResponse::from(created)))
}

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product added", body = ProductResponse),
        (status = 400, description = "Invalid name, price or stock"),
        (status = 409, description = "Product name already taken"),
    ),
    tag = "catalog"
)]
pub async fn create_product(
    state: web::Data<AppState>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let product = NewProduct {
        name: body.name,
        unit_price: parse_price(&body.unit_price)?,
        stock_quantity: body.stock_quantity,
    };

    let catalog = state.catalog.clone();
    let created = web::block(move || catalog.add_product(product))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ProductResponse::from(created)))
}

/// GET /products/{id}
///
/// Current price and stock level of a product.
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let catalog = state.catalog.clone();
    let product = web::block(move || catalog.get_product(product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    product
        .map(|p| HttpResponse::Ok().json(ProductResponse::from(p)))
        .ok_or(AppError::NotFound)
}

/// PUT /products/{id}/price
///
/// Changes the price used by future orders. Placed orders keep their price.
#[utoipa::path(
    put,
    path = "/products/{id}/price",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = UpdatePriceRequest,
    responses(
        (status = 200, description = "Price updated", body = ProductResponse),
        (status = 400, description = "Invalid price"),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn update_price(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePriceRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let unit_price = parse_price(&body.unit_price)?;

    let catalog = state.catalog.clone();
    let product = web::block(move || catalog.update_price(product_id, unit_price))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    product
        .map(|p| HttpResponse::Ok().json(ProductResponse::from(p)))
        .ok_or(AppError::NotFound)
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::json;

    use super::*;
    use crate::infrastructure::memory::InMemoryStore;

    fn catalog_data() -> web::Data<AppState> {
        web::Data::new(AppState::new(InMemoryStore::new(), 3))
    }

    #[actix_web::test]
    async fn product_lifecycle() {
        let app = test::init_service(
            App::new()
                .app_data(catalog_data())
                .route("/products", web::post().to(create_product))
                .route("/products/{id}", web::get().to(get_product))
                .route("/products/{id}/price", web::put().to(update_price)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(json!({ "name": "Lamp", "unit_price": "10.00", "stock_quantity": 4 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: ProductResponse = test::read_body_json(resp).await;

        let req = test::TestRequest::put()
            .uri(&format!("/products/{}/price", created.id))
            .set_json(json!({ "unit_price": "12.50" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/products/{}", created.id))
            .to_request();
        let fetched: ProductResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched.unit_price, "12.50");
        assert_eq!(fetched.stock_quantity, 4);
    }

    #[actix_web::test]
    async fn unparsable_price_is_a_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(catalog_data())
                .route("/products", web::post().to(create_product)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(json!({ "name": "Lamp", "unit_price": "ten", "stock_quantity": 4 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn duplicate_customer_email_is_a_conflict() {
        let app = test::init_service(
            App::new()
                .app_data(catalog_data())
                .route("/customers", web::post().to(create_customer)),
        )
        .await;
        let body = json!({ "name": "Ada", "email": "ada@example.com" });

        let first = test::call_service(
            &app,
            test::TestRequest::post().uri("/customers").set_json(&body).to_request(),
        )
        .await;
        let second = test::call_service(
            &app,
            test::TestRequest::post().uri("/customers").set_json(&body).to_request(),
        )
        .await;

        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn unknown_product_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(catalog_data())
                .route("/products/{id}", web::get().to(get_product)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/products/{}", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
