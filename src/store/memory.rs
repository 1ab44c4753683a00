//! In-process store: a single actor task owns both tables.
//!
//! Clients talk to the actor through [`MemoryStore`]. A `Begin` request hands
//! back a [`MemoryTx`] with its own channel, and the actor then serves that
//! transaction exclusively until it commits, rolls back, or is dropped. Other
//! `Begin` requests wait in the queue meanwhile, so transactions never
//! interleave.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, trace};

use super::{Store, StoreResult, StoreTx};
use crate::domain::{Order, OrderCreate, OrderId, Product, ProductCreate, ProductId};
use crate::error::InventoryError;

pub type Response<T> = oneshot::Sender<StoreResult<T>>;

// =============================================================================
// MESSAGES
// =============================================================================

#[derive(Debug)]
pub enum StoreRequest {
    Begin { respond_to: Response<MemoryTx> },
}

#[derive(Debug)]
pub enum TxRequest {
    GetProduct {
        id: ProductId,
        respond_to: Response<Option<Product>>,
    },
    ListProducts {
        respond_to: Response<Vec<Product>>,
    },
    InsertProduct {
        product: ProductCreate,
        respond_to: Response<ProductId>,
    },
    UpdateProduct {
        product: Product,
        respond_to: Response<u64>,
    },
    DeleteProduct {
        id: ProductId,
        respond_to: Response<u64>,
    },
    SetStock {
        id: ProductId,
        expected: u32,
        stock: u32,
        respond_to: Response<bool>,
    },
    GetOrder {
        id: OrderId,
        respond_to: Response<Option<Order>>,
    },
    ListOrders {
        product_id: Option<ProductId>,
        respond_to: Response<Vec<Order>>,
    },
    InsertOrder {
        order: OrderCreate,
        respond_to: Response<OrderId>,
    },
    UpdateOrder {
        order: Order,
        respond_to: Response<u64>,
    },
    DeleteOrder {
        id: OrderId,
        respond_to: Response<u64>,
    },
    Commit {
        respond_to: Response<()>,
    },
    Rollback {
        respond_to: Response<()>,
    },
}

// =============================================================================
// TABLES
// =============================================================================

/// Both tables plus their id sequences. Ids only grow, so key order is
/// insertion order.
#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    last_product_id: i64,
    last_order_id: i64,
}

impl Tables {
    fn insert_product(&mut self, payload: ProductCreate) -> ProductId {
        self.last_product_id += 1;
        let id = ProductId(self.last_product_id);
        self.products.insert(id, Product::from_create(id, payload));
        id
    }

    fn update_product(&mut self, product: Product) -> u64 {
        match self.products.get_mut(&product.id) {
            Some(row) => {
                *row = product;
                1
            }
            None => 0,
        }
    }

    fn set_stock(&mut self, id: ProductId, expected: u32, stock: u32) -> bool {
        match self.products.get_mut(&id) {
            Some(row) if row.stock_quantity == expected => {
                row.stock_quantity = stock;
                true
            }
            _ => false,
        }
    }

    fn insert_order(&mut self, payload: OrderCreate) -> OrderId {
        self.last_order_id += 1;
        let id = OrderId(self.last_order_id);
        self.orders.insert(id, Order::from_create(id, payload));
        id
    }

    fn update_order(&mut self, order: Order) -> u64 {
        match self.orders.get_mut(&order.id) {
            Some(row) => {
                row.quantity = order.quantity;
                row.state = order.state;
                1
            }
            None => 0,
        }
    }

    fn list_orders(&self, product_id: Option<ProductId>) -> Vec<Order> {
        self.orders
            .values()
            .filter(|order| product_id.map_or(true, |id| order.product_id == id))
            .cloned()
            .collect()
    }
}

// =============================================================================
// THE ACTOR
// =============================================================================

pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    tables: Tables,
    buffer_size: usize,
}

impl StoreActor {
    pub fn new(buffer_size: usize) -> (Self, MemoryStore) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            tables: Tables::default(),
            buffer_size,
        };
        (actor, MemoryStore::new(sender))
    }

    #[instrument(name = "store_actor", skip(self))]
    pub async fn run(mut self) {
        info!("Store actor starting");
        let mut sequence: u64 = 0;
        while let Some(request) = self.receiver.recv().await {
            match request {
                StoreRequest::Begin { respond_to } => {
                    sequence += 1;
                    let (sender, receiver) = mpsc::channel(self.buffer_size);
                    if respond_to.send(Ok(MemoryTx::from_sender(sender))).is_err() {
                        debug!(tx = sequence, "Caller went away before the transaction started");
                        continue;
                    }
                    self.serve_transaction(sequence, receiver).await;
                }
            }
        }
        info!("Store actor stopped");
    }

    /// Serves one transaction against a staged copy of the tables.
    #[instrument(skip(self, receiver))]
    async fn serve_transaction(&mut self, tx: u64, mut receiver: mpsc::Receiver<TxRequest>) {
        debug!("Transaction started");
        let mut staged = self.tables.clone();

        while let Some(request) = receiver.recv().await {
            match request {
                TxRequest::Commit { respond_to } => {
                    self.tables = staged;
                    debug!("Transaction committed");
                    let _ = respond_to.send(Ok(()));
                    return;
                }
                TxRequest::Rollback { respond_to } => {
                    debug!("Transaction rolled back");
                    let _ = respond_to.send(Ok(()));
                    return;
                }
                other => apply(&mut staged, other),
            }
        }

        debug!("Transaction dropped without commit, staged writes discarded");
    }
}

/// Runs a single statement of an open transaction against the staged tables.
fn apply(tables: &mut Tables, request: TxRequest) {
    trace!(?request, "Applying");
    match request {
        TxRequest::GetProduct { id, respond_to } => {
            let _ = respond_to.send(Ok(tables.products.get(&id).cloned()));
        }
        TxRequest::ListProducts { respond_to } => {
            let _ = respond_to.send(Ok(tables.products.values().cloned().collect()));
        }
        TxRequest::InsertProduct { product, respond_to } => {
            let _ = respond_to.send(Ok(tables.insert_product(product)));
        }
        TxRequest::UpdateProduct { product, respond_to } => {
            let _ = respond_to.send(Ok(tables.update_product(product)));
        }
        TxRequest::DeleteProduct { id, respond_to } => {
            let removed = u64::from(tables.products.remove(&id).is_some());
            let _ = respond_to.send(Ok(removed));
        }
        TxRequest::SetStock {
            id,
            expected,
            stock,
            respond_to,
        } => {
            let _ = respond_to.send(Ok(tables.set_stock(id, expected, stock)));
        }
        TxRequest::GetOrder { id, respond_to } => {
            let _ = respond_to.send(Ok(tables.orders.get(&id).cloned()));
        }
        TxRequest::ListOrders {
            product_id,
            respond_to,
        } => {
            let _ = respond_to.send(Ok(tables.list_orders(product_id)));
        }
        TxRequest::InsertOrder { order, respond_to } => {
            let _ = respond_to.send(Ok(tables.insert_order(order)));
        }
        TxRequest::UpdateOrder { order, respond_to } => {
            let _ = respond_to.send(Ok(tables.update_order(order)));
        }
        TxRequest::DeleteOrder { id, respond_to } => {
            let removed = u64::from(tables.orders.remove(&id).is_some());
            let _ = respond_to.send(Ok(removed));
        }
        // Commit and Rollback end the transaction and are handled by the actor.
        TxRequest::Commit { respond_to } | TxRequest::Rollback { respond_to } => {
            let _ = respond_to.send(Ok(()));
        }
    }
}

// =============================================================================
// THE CLIENTS
// =============================================================================

/// Handle to a running [`StoreActor`].
#[derive(Clone, Debug)]
pub struct MemoryStore {
    sender: mpsc::Sender<StoreRequest>,
}

impl MemoryStore {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Begin { respond_to })
            .await
            .map_err(|_| InventoryError::storage("store actor closed"))?;
        response
            .await
            .map_err(|_| InventoryError::storage("store actor dropped the request"))?
    }
}

/// An open transaction on a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    sender: mpsc::Sender<TxRequest>,
}

impl MemoryTx {
    pub fn from_sender(sender: mpsc::Sender<TxRequest>) -> Self {
        Self { sender }
    }

    async fn call<T: Send>(
        &self,
        request: impl FnOnce(Response<T>) -> TxRequest + Send,
    ) -> StoreResult<T> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(request(respond_to))
            .await
            .map_err(|_| InventoryError::storage("transaction closed"))?;
        response
            .await
            .map_err(|_| InventoryError::storage("transaction dropped the request"))?
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn get_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        self.call(|respond_to| TxRequest::GetProduct { id, respond_to }).await
    }

    async fn list_products(&mut self) -> StoreResult<Vec<Product>> {
        self.call(|respond_to| TxRequest::ListProducts { respond_to }).await
    }

    async fn insert_product(&mut self, product: ProductCreate) -> StoreResult<ProductId> {
        self.call(|respond_to| TxRequest::InsertProduct { product, respond_to })
            .await
    }

    async fn update_product(&mut self, product: Product) -> StoreResult<u64> {
        self.call(|respond_to| TxRequest::UpdateProduct { product, respond_to })
            .await
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<u64> {
        self.call(|respond_to| TxRequest::DeleteProduct { id, respond_to }).await
    }

    async fn set_stock(&mut self, id: ProductId, expected: u32, stock: u32) -> StoreResult<bool> {
        self.call(|respond_to| TxRequest::SetStock {
            id,
            expected,
            stock,
            respond_to,
        })
        .await
    }

    async fn get_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        self.call(|respond_to| TxRequest::GetOrder { id, respond_to }).await
    }

    async fn list_orders(&mut self, product_id: Option<ProductId>) -> StoreResult<Vec<Order>> {
        self.call(|respond_to| TxRequest::ListOrders {
            product_id,
            respond_to,
        })
        .await
    }

    async fn insert_order(&mut self, order: OrderCreate) -> StoreResult<OrderId> {
        self.call(|respond_to| TxRequest::InsertOrder { order, respond_to })
            .await
    }

    async fn update_order(&mut self, order: Order) -> StoreResult<u64> {
        self.call(|respond_to| TxRequest::UpdateOrder { order, respond_to })
            .await
    }

    async fn delete_order(&mut self, id: OrderId) -> StoreResult<u64> {
        self.call(|respond_to| TxRequest::DeleteOrder { id, respond_to }).await
    }

    async fn commit(self) -> StoreResult<()> {
        self.call(|respond_to| TxRequest::Commit { respond_to }).await
    }

    async fn rollback(self) -> StoreResult<()> {
        self.call(|respond_to| TxRequest::Rollback { respond_to }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spawn_store() -> MemoryStore {
        let (actor, store) = StoreActor::new(8);
        tokio::spawn(actor.run());
        store
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let store = spawn_store();

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_product(ProductCreate::new("Widget", 10)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let product = tx.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.name, "Widget");
        assert_eq!(product.stock_quantity, 10);
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = spawn_store();

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_product(ProductCreate::new("Widget", 10)).await.unwrap();
        // Visible inside its own transaction.
        assert!(tx.get_product(id).await.unwrap().is_some());
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.get_product(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn dropped_transaction_is_rolled_back() {
        let store = spawn_store();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_product(ProductCreate::new("Ghost", 1)).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_stock_is_compare_and_set() {
        let store = spawn_store();
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_product(ProductCreate::new("Widget", 10)).await.unwrap();

        assert!(!tx.set_stock(id, 9, 4).await.unwrap());
        assert!(tx.set_stock(id, 10, 4).await.unwrap());
        assert_eq!(tx.get_product(id).await.unwrap().unwrap().stock_quantity, 4);
        assert!(!tx.set_stock(ProductId(99), 0, 1).await.unwrap());
    }

    #[tokio::test]
    async fn orders_list_in_insertion_order_per_product() {
        let store = spawn_store();
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert_product(ProductCreate::new("A", 10)).await.unwrap();
        let b = tx.insert_product(ProductCreate::new("B", 10)).await.unwrap();
        let first = tx.insert_order(OrderCreate::new(a, 1)).await.unwrap();
        tx.insert_order(OrderCreate::new(b, 2)).await.unwrap();
        let third = tx.insert_order(OrderCreate::new(a, 3)).await.unwrap();

        let ids: Vec<_> = tx
            .list_orders(Some(a))
            .await
            .unwrap()
            .into_iter()
            .map(|order| order.id)
            .collect();
        assert_eq!(ids, vec![first, third]);
        assert_eq!(tx.list_orders(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn second_transaction_waits_for_the_first() {
        let store = spawn_store();
        let mut first = store.begin().await.unwrap();
        first.insert_product(ProductCreate::new("Widget", 1)).await.unwrap();

        let waiting = tokio::spawn({
            let store = store.clone();
            async move {
                let mut tx = store.begin().await.unwrap();
                tx.list_products().await.unwrap().len()
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        first.commit().await.unwrap();
        assert_eq!(waiting.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn begin_fails_once_the_actor_is_gone() {
        let (actor, store) = StoreActor::new(1);
        drop(actor);
        let result = store.begin().await;
        assert!(matches!(result, Err(InventoryError::StorageFailure(_))));
    }
}
