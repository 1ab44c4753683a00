use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage-assigned identifier of a product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a product in the inventory.
///
/// `stock_quantity` is the number of units still available, i.e. what is left
/// after every stock-taking order has been subtracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub stock_quantity: u32,
}

/// Payload for creating a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub stock_quantity: u32,
}

impl ProductCreate {
    pub fn new(name: impl Into<String>, stock_quantity: u32) -> Self {
        Self {
            name: name.into(),
            stock_quantity,
        }
    }
}

impl Product {
    pub fn from_create(id: ProductId, payload: ProductCreate) -> Self {
        Self {
            id,
            name: payload.name,
            stock_quantity: payload.stock_quantity,
        }
    }
}
