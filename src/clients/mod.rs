//! Capability clients: the typed operations callers use on products and
//! orders. [`OrderClient`] is where stock reconciliation happens.

#[macro_use]
mod macros;
pub mod order_client;
pub mod product_client;

pub use order_client::OrderClient;
pub use product_client::ProductClient;
