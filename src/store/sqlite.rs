//! SQLite-backed store using `sqlx`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info, instrument, warn};

use super::{Store, StoreResult, StoreTx};
use crate::domain::{Order, OrderCreate, OrderId, OrderState, Product, ProductCreate, ProductId};
use crate::error::InventoryError;

const CREATE_PRODUCTS: &str = "CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    stock_quantity INTEGER NOT NULL CHECK (stock_quantity >= 0)
)";

const CREATE_ORDERS: &str = "CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity >= 0),
    state INTEGER NOT NULL
)";

const IN_MEMORY_URL: &str = "sqlite::memory:";

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and bootstraps the
    /// schema.
    #[instrument(skip(url))]
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if is_in_memory(url) {
            // The database lives as long as its last connection; keep exactly one alive.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }
        let pool = pool_options.connect_with(options).await?;

        let store = Self { pool };
        store.migrate().await?;
        info!("SQLite store ready");
        Ok(store)
    }

    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect(IN_MEMORY_URL, 1).await
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(CREATE_PRODUCTS).execute(&self.pool).await?;
        sqlx::query(CREATE_ORDERS).execute(&self.pool).await?;
        debug!("Schema up to date");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    type Tx = SqliteTx;

    /// Takes the write lock up front, so concurrent transactions queue on the
    /// busy timeout rather than failing a read-to-write upgrade with `SQLITE_BUSY`.
    async fn begin(&self) -> StoreResult<SqliteTx> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(SqliteTx { tx })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

/// Whether `url` names an in-memory database, in any of the spellings
/// `sqlx` accepts (`sqlite::memory:`, `sqlite://:memory:`, with or without
/// query parameters, or a `mode=memory` file URI).
fn is_in_memory(url: &str) -> bool {
    let path = url.trim_start_matches("sqlite:").trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    path == ":memory:" || url.contains("mode=memory")
}

fn quantity(row: &SqliteRow, column: &str) -> StoreResult<u32> {
    let raw: i64 = row.try_get(column)?;
    u32::try_from(raw)
        .map_err(|_| InventoryError::storage(format!("{column} out of range: {raw}")))
}

fn decode_product(row: &SqliteRow) -> StoreResult<Product> {
    Ok(Product {
        id: ProductId(row.try_get("id")?),
        name: row.try_get("name")?,
        stock_quantity: quantity(row, "stock_quantity")?,
    })
}

fn decode_order(row: &SqliteRow) -> StoreResult<Order> {
    let code: i64 = row.try_get("state")?;
    let state = OrderState::try_from(code)
        .map_err(|code| InventoryError::storage(format!("unknown order state code {code}")))?;
    Ok(Order {
        id: OrderId(row.try_get("id")?),
        product_id: ProductId(row.try_get("product_id")?),
        quantity: quantity(row, "quantity")?,
        state,
    })
}

/// Decodes every row, skipping (and logging) the ones that do not decode.
fn decode_all<T>(rows: &[SqliteRow], decode: fn(&SqliteRow) -> StoreResult<T>) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match decode(row) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "Failed to decode row, skipping");
                None
            }
        })
        .collect()
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query("SELECT id, name, stock_quantity FROM products WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(decode_product).transpose()
    }

    async fn list_products(&mut self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query("SELECT id, name, stock_quantity FROM products ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(decode_all(&rows, decode_product))
    }

    async fn insert_product(&mut self, product: ProductCreate) -> StoreResult<ProductId> {
        let result = sqlx::query("INSERT INTO products (name, stock_quantity) VALUES (?, ?)")
            .bind(product.name)
            .bind(i64::from(product.stock_quantity))
            .execute(&mut *self.tx)
            .await?;
        Ok(ProductId(result.last_insert_rowid()))
    }

    async fn update_product(&mut self, product: Product) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE products SET name = ?, stock_quantity = ? WHERE id = ?")
            .bind(product.name)
            .bind(i64::from(product.stock_quantity))
            .bind(product.id.0)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_stock(&mut self, id: ProductId, expected: u32, stock: u32) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = ? WHERE id = ? AND stock_quantity = ?",
        )
        .bind(i64::from(stock))
        .bind(id.0)
        .bind(i64::from(expected))
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query("SELECT id, product_id, quantity, state FROM orders WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(decode_order).transpose()
    }

    async fn list_orders(&mut self, product_id: Option<ProductId>) -> StoreResult<Vec<Order>> {
        let rows = match product_id {
            Some(product_id) => {
                sqlx::query(
                    "SELECT id, product_id, quantity, state FROM orders \
                     WHERE product_id = ? ORDER BY id",
                )
                .bind(product_id.0)
                .fetch_all(&mut *self.tx)
                .await?
            }
            None => {
                sqlx::query("SELECT id, product_id, quantity, state FROM orders ORDER BY id")
                    .fetch_all(&mut *self.tx)
                    .await?
            }
        };
        Ok(decode_all(&rows, decode_order))
    }

    async fn insert_order(&mut self, order: OrderCreate) -> StoreResult<OrderId> {
        let result =
            sqlx::query("INSERT INTO orders (product_id, quantity, state) VALUES (?, ?, ?)")
                .bind(order.product_id.0)
                .bind(i64::from(order.quantity))
                .bind(order.state.code())
                .execute(&mut *self.tx)
                .await?;
        Ok(OrderId(result.last_insert_rowid()))
    }

    async fn update_order(&mut self, order: Order) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE orders SET quantity = ?, state = ? WHERE id = ?")
            .bind(i64::from(order.quantity))
            .bind(order.state.code())
            .bind(order.id.0)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_order(&mut self, id: OrderId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
