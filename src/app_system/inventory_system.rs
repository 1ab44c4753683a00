use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::clients::{OrderClient, ProductClient};
use crate::error::InventoryError;
use crate::store::{MemoryStore, SqliteStore, Store, StoreActor};

/// Wires a store to the product and order clients.
///
/// Responsible for starting the store (and its actor task, for the in-memory
/// backend), handing the same store to both clients, and shutting down.
pub struct InventorySystem<S: Store> {
    pub products: ProductClient<S>,
    pub orders: OrderClient<S>,
    store: S,
    handles: Vec<JoinHandle<()>>,
}

impl InventorySystem<MemoryStore> {
    /// Starts an in-memory store actor and wires clients to it.
    pub fn in_memory(channel_capacity: usize) -> Self {
        let (actor, store) = StoreActor::new(channel_capacity);
        let handle = tokio::spawn(actor.run());

        let mut system = Self::with_store(store);
        system.handles.push(handle);
        system
    }
}

impl InventorySystem<SqliteStore> {
    pub async fn sqlite(database_url: &str, max_connections: u32) -> Result<Self, InventoryError> {
        let store = SqliteStore::connect(database_url, max_connections).await?;
        Ok(Self::with_store(store))
    }
}

impl<S: Store> InventorySystem<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            products: ProductClient::new(store.clone()),
            orders: OrderClient::new(store.clone()),
            store,
            handles: Vec::new(),
        }
    }

    /// Closes the store and waits for its tasks to finish.
    ///
    /// Clones of the clients handed out earlier must be dropped first, or the
    /// in-memory actor keeps running and this waits forever.
    pub async fn shutdown(self) -> Result<(), InventoryError> {
        info!("Shutting down system...");
        let Self {
            products,
            orders,
            store,
            handles,
        } = self;

        store.close().await;
        // The in-memory actor stops once every handle to its channel is gone.
        drop(products);
        drop(orders);
        drop(store);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Store task failed: {:?}", e);
                return Err(InventoryError::storage(format!("store task failed: {e}")));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
