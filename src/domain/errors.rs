use thiserror::Error;
use uuid::Uuid;

use super::order::StockShortfall;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Customer {0} not found")]
    CustomerNotFound(Uuid),

    #[error("Unknown products: {}", join_ids(.missing))]
    InvalidProduct { missing: Vec<Uuid> },

    #[error("Insufficient stock for {} product(s)", .shortfalls.len())]
    InsufficientStock { shortfalls: Vec<StockShortfall> },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Persistence error: {message}")]
    Persistence { message: String, transient: bool },
}

impl DomainError {
    pub fn persistence(message: impl Into<String>) -> Self {
        DomainError::Persistence {
            message: message.into(),
            transient: false,
        }
    }

    /// A storage failure that may succeed if the whole workflow runs again:
    /// lock conflicts, serialization failures, a stale stock guard.
    pub fn conflict(message: impl Into<String>) -> Self {
        DomainError::Persistence {
            message: message.into(),
            transient: true,
        }
    }

    /// Only persistence failures can be retried without changing the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Persistence { .. })
    }

    pub(crate) fn is_transient(&self) -> bool {
        matches!(
            self,
            DomainError::Persistence {
                transient: true,
                ..
            }
        )
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
