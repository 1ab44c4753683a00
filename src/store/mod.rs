//! Transactional storage behind the product and order clients.
//!
//! A [`Store`] hands out [`StoreTx`] transactions. Every write made through a
//! transaction becomes visible only when [`StoreTx::commit`] succeeds; a
//! transaction that is rolled back, or simply dropped, leaves no trace.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{Order, OrderCreate, OrderId, Product, ProductCreate, ProductId};
use crate::error::InventoryError;

pub use memory::{MemoryStore, MemoryTx, StoreActor, StoreRequest, TxRequest};
pub use sqlite::{SqliteStore, SqliteTx};

pub type StoreResult<T> = Result<T, InventoryError>;

/// A transactional store holding the `products` and `orders` tables.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Tx: StoreTx + 'static;

    async fn begin(&self) -> StoreResult<Self::Tx>;

    /// Releases backend resources. Clients must not be used afterwards.
    async fn close(&self) {}
}

/// One open transaction.
///
/// Write operations report the number of rows they touched so callers can
/// tell a missing row apart from a successful write.
#[async_trait]
pub trait StoreTx: Send {
    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;
    /// All products in insertion order. Rows that cannot be decoded are skipped.
    async fn list_products(&mut self) -> StoreResult<Vec<Product>>;
    async fn insert_product(&mut self, product: ProductCreate) -> StoreResult<ProductId>;
    async fn update_product(&mut self, product: Product) -> StoreResult<u64>;
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<u64>;
    /// Sets `stock_quantity` to `stock` only if it still equals `expected`.
    /// Returns `false` when the row is missing or its stock moved.
    async fn set_stock(&mut self, id: ProductId, expected: u32, stock: u32) -> StoreResult<bool>;

    async fn get_order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;
    /// Orders in insertion order, optionally restricted to one product.
    /// Rows that cannot be decoded are skipped.
    async fn list_orders(&mut self, product_id: Option<ProductId>) -> StoreResult<Vec<Order>>;
    async fn insert_order(&mut self, order: OrderCreate) -> StoreResult<OrderId>;
    async fn update_order(&mut self, order: Order) -> StoreResult<u64>;
    async fn delete_order(&mut self, id: OrderId) -> StoreResult<u64>;

    async fn commit(self) -> StoreResult<()>;
    async fn rollback(self) -> StoreResult<()>;
}

/// Commits `tx` when `result` is a success and rolls it back otherwise.
///
/// The operation's error wins over a rollback failure; the latter is only logged.
pub async fn settle<T, X>(tx: X, result: StoreResult<T>) -> StoreResult<T>
where
    T: Send,
    X: StoreTx,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_error) = tx.rollback().await {
                warn!(error = %rollback_error, "Rollback failed");
            }
            Err(e)
        }
    }
}
