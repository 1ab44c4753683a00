//! # Inventory
//!
//! Products with stock levels, and orders that take or release that stock as
//! they move through their lifecycle.
//!
//! - **Domain types** - [`Product`], [`Order`] and [`OrderState`], plain data.
//! - **Ledger** - [`ledger::stock_delta`] and [`OrderState::is_stock_taken`],
//!   the only place that decides how an order affects stock.
//! - **Store** - [`store::Store`], injected into the clients; either the
//!   in-process [`store::MemoryStore`] actor or [`store::SqliteStore`].
//! - **Clients** - [`ProductClient`] and [`OrderClient`], one transaction per
//!   call. `OrderClient::update` keeps `stock_quantity` in step with the
//!   orders that reference the product.
//! - **System** - [`InventorySystem`] wires a store to both clients and shuts
//!   it down.
//!
//! ```no_run
//! # async fn demo() -> Result<(), inventory::InventoryError> {
//! use inventory::{InventorySystem, OrderCreate, OrderState, ProductCreate};
//!
//! let system = InventorySystem::in_memory(32);
//! let product_id = system.products.create(ProductCreate::new("Widget", 10)).await?;
//!
//! let order = system.orders.create(OrderCreate::new(product_id, 5)).await?;
//! system.orders.update(order.revised(5, OrderState::Confirmed)).await?;
//! assert_eq!(system.products.find_by_id(product_id).await?.stock_quantity, 5);
//!
//! system.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod app_system;
pub mod clients;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod store;

#[cfg(test)]
mod mock_framework;

pub use app_system::{InventoryConfig, InventorySystem};
pub use clients::{OrderClient, ProductClient};
pub use domain::{Order, OrderCreate, OrderId, OrderState, Product, ProductCreate, ProductId};
pub use error::InventoryError;
