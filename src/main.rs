use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info, Instrument};

use inventory::app_system::{setup_tracing, StoreBackend};
use inventory::store::Store;
use inventory::{InventoryConfig, InventorySystem, OrderCreate, OrderState, ProductCreate};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = InventoryConfig::load(config_path.as_deref())?;

    // Setup tracing once for the entire application
    setup_tracing(&config.logging);

    info!(backend = ?config.store.backend, "Starting inventory system");

    match config.store.backend {
        StoreBackend::Memory => {
            run(InventorySystem::in_memory(config.store.channel_capacity)).await
        }
        StoreBackend::Sqlite => {
            let system =
                InventorySystem::sqlite(&config.store.database_url, config.store.max_connections)
                    .await?;
            run(system).await
        }
    }
}

/// Walks one order through its lifecycle, logging stock after each step.
async fn run<S: Store>(system: InventorySystem<S>) -> Result<()> {
    let product_id = system
        .products
        .create(ProductCreate::new("Widget", 10))
        .await?;

    let span = tracing::info_span!("order_lifecycle", product_id = %product_id);
    let outcome = async {
        let mut order = system.orders.create(OrderCreate::new(product_id, 5)).await?;
        for state in [OrderState::Confirmed, OrderState::Shipped, OrderState::Returned] {
            order = system.orders.update(order.revised(order.quantity, state)).await?;
            let product = system.products.find_by_id(product_id).await?;
            info!(order_id = %order.id, state = %order.state, stock = product.stock_quantity, "Order moved");
        }

        // Taking more than is left is refused and changes nothing.
        let greedy = system.orders.create(OrderCreate::new(product_id, 3)).await?;
        let confirmed = system.orders.update(greedy.revised(3, OrderState::Confirmed)).await?;
        if let Err(e) = system.orders.update(confirmed.revised(20, OrderState::Confirmed)).await {
            info!(error = %e, "Oversized update refused");
        }

        let orders = system.orders.find_by_product_id(product_id).await?;
        let product = system.products.find_by_id(product_id).await?;
        info!(orders = orders.len(), stock = product.stock_quantity, "Final state");
        Ok::<_, inventory::InventoryError>(())
    }
    .instrument(span)
    .await;

    if let Err(e) = &outcome {
        error!(error = %e, "Order lifecycle failed");
    }

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    outcome.map_err(Into::into)
}
