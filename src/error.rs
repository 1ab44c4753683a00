use thiserror::Error;

use crate::domain::{OrderId, ProductId};

/// Errors surfaced by product and order operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl InventoryError {
    pub fn product_not_found(id: ProductId) -> Self {
        InventoryError::NotFound {
            entity: "Product",
            id: id.0,
        }
    }

    pub fn order_not_found(id: OrderId) -> Self {
        InventoryError::NotFound {
            entity: "Order",
            id: id.0,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        InventoryError::StorageFailure(message.into())
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::StorageFailure(e.to_string())
    }
}
