use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::order::StockShortfall;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient stock")]
    InsufficientStock(Vec<StockShortfall>),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::CustomerNotFound(_) | DomainError::InvalidProduct { .. } => {
                AppError::Unprocessable(e.to_string())
            }
            DomainError::InsufficientStock { shortfalls } => AppError::InsufficientStock(shortfalls),
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::AlreadyExists(_) => AppError::Conflict(e.to_string()),
            DomainError::Persistence { message, .. } => AppError::Unavailable(message),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound => HttpResponse::NotFound().json(json!({
                "error": self.to_string()
            })),
            AppError::BadRequest(_) => HttpResponse::BadRequest().json(json!({
                "error": self.to_string()
            })),
            AppError::Unprocessable(_) => HttpResponse::UnprocessableEntity().json(json!({
                "error": self.to_string()
            })),
            AppError::Conflict(_) => HttpResponse::Conflict().json(json!({
                "error": self.to_string()
            })),
            AppError::InsufficientStock(shortfalls) => {
                let details: Vec<serde_json::Value> = shortfalls
                    .iter()
                    .map(|s| {
                        json!({
                            "product_id": s.product_id,
                            "requested": s.requested,
                            "available": s.available,
                            "shortfall": s.shortfall()
                        })
                    })
                    .collect();
                HttpResponse::Conflict().json(json!({
                    "error": self.to_string(),
                    "shortfalls": details
                }))
            }
            AppError::Unavailable(_) => HttpResponse::ServiceUnavailable().json(json!({
                "error": "Storage temporarily unavailable, retry the request"
            })),
            AppError::Internal(_) => HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;
    use uuid::Uuid;

    fn status_for(e: DomainError) -> StatusCode {
        AppError::from(e).error_response().status()
    }

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unknown_references_are_unprocessable() {
        assert_eq!(
            status_for(DomainError::CustomerNotFound(Uuid::new_v4())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(DomainError::InvalidProduct {
                missing: vec![Uuid::new_v4()]
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn insufficient_stock_is_a_conflict() {
        let shortfall = StockShortfall {
            product_id: Uuid::new_v4(),
            requested: 3,
            available: 2,
        };
        let app_err: AppError = DomainError::InsufficientStock {
            shortfalls: vec![shortfall],
        }
        .into();
        assert!(matches!(app_err, AppError::InsufficientStock(ref s) if s == &vec![shortfall]));
        assert_eq!(app_err.error_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_input_is_a_bad_request() {
        assert_eq!(
            status_for(DomainError::InvalidInput("bad value".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn duplicates_are_conflicts() {
        assert_eq!(
            status_for(DomainError::AlreadyExists("product named Lamp".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn persistence_failures_are_retryable_503s() {
        assert_eq!(
            status_for(DomainError::persistence("pool timed out")),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn not_found_display() {
        assert_eq!(AppError::NotFound.to_string(), "Not found");
    }
}
