//! # Mock Framework
//!
//! Utilities for testing clients against a scripted store.
//!
//! Use [`create_mock_store`] to get a [`MemoryStore`] and the receiver its
//! requests arrive on. Then use [`expect_begin`] and [`next_statement`] to
//! answer each request by hand, including with failures a real store would
//! rarely produce.

use tokio::sync::mpsc;

use crate::store::memory::Response;
use crate::store::{MemoryStore, MemoryTx, StoreRequest, TxRequest};

/// Creates a store handle whose requests go to the returned receiver instead
/// of a running [`crate::store::StoreActor`].
pub fn create_mock_store(buffer_size: usize) -> (MemoryStore, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (MemoryStore::new(sender), receiver)
}

/// Waits for a `Begin` request and grants it, returning the receiver the
/// transaction's statements will arrive on.
pub async fn expect_begin(receiver: &mut mpsc::Receiver<StoreRequest>) -> Option<mpsc::Receiver<TxRequest>> {
    match receiver.recv().await {
        Some(StoreRequest::Begin { respond_to }) => {
            let (sender, tx_receiver) = mpsc::channel(8);
            respond_to.send(Ok(MemoryTx::from_sender(sender))).ok()?;
            Some(tx_receiver)
        }
        None => None,
    }
}

/// Waits for the next statement of a granted transaction.
pub async fn next_statement(tx: &mut mpsc::Receiver<TxRequest>) -> Option<TxRequest> {
    tx.recv().await
}

/// Helper to verify that the next statement is a commit.
pub async fn expect_commit(tx: &mut mpsc::Receiver<TxRequest>) -> Option<Response<()>> {
    match tx.recv().await {
        Some(TxRequest::Commit { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Helper to verify that the next statement is a rollback.
pub async fn expect_rollback(tx: &mut mpsc::Receiver<TxRequest>) -> Option<Response<()>> {
    match tx.recv().await {
        Some(TxRequest::Rollback { respond_to }) => Some(respond_to),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::OrderClient;
    use crate::domain::{Order, OrderCreate, OrderId, OrderState, Product, ProductId};
    use crate::error::InventoryError;

    fn widget(stock: u32) -> Product {
        Product {
            id: ProductId(1),
            name: "Widget".into(),
            stock_quantity: stock,
        }
    }

    #[tokio::test]
    async fn failed_commit_surfaces_as_storage_failure() {
        let (store, mut requests) = create_mock_store(4);
        let orders = OrderClient::new(store);

        let task = tokio::spawn(async move { orders.create(OrderCreate::new(ProductId(1), 2)).await });

        let mut tx = expect_begin(&mut requests).await.expect("Expected Begin");
        match next_statement(&mut tx).await {
            Some(TxRequest::GetProduct { id, respond_to }) => {
                assert_eq!(id, ProductId(1));
                respond_to.send(Ok(Some(widget(10)))).unwrap();
            }
            other => panic!("Unexpected statement: {:?}", other),
        }
        match next_statement(&mut tx).await {
            Some(TxRequest::InsertOrder { order, respond_to }) => {
                assert_eq!(order.state, OrderState::Pending);
                respond_to.send(Ok(OrderId(1))).unwrap();
            }
            other => panic!("Unexpected statement: {:?}", other),
        }
        let commit = expect_commit(&mut tx).await.expect("Expected Commit");
        commit.send(Err(InventoryError::storage("disk full"))).unwrap();

        let result = task.await.unwrap();
        assert_eq!(result, Err(InventoryError::storage("disk full")));
    }

    #[tokio::test]
    async fn failed_write_rolls_back_before_returning() {
        let (store, mut requests) = create_mock_store(4);
        let orders = OrderClient::new(store);

        let pending = Order {
            id: OrderId(3),
            product_id: ProductId(1),
            quantity: 4,
            state: OrderState::Pending,
        };
        let confirmed = pending.revised(4, OrderState::Confirmed);
        let task = tokio::spawn(async move { orders.update(confirmed).await });

        let mut tx = expect_begin(&mut requests).await.expect("Expected Begin");
        match next_statement(&mut tx).await {
            Some(TxRequest::GetOrder { respond_to, .. }) => respond_to.send(Ok(Some(pending))).unwrap(),
            other => panic!("Unexpected statement: {:?}", other),
        }
        match next_statement(&mut tx).await {
            Some(TxRequest::GetProduct { respond_to, .. }) => respond_to.send(Ok(Some(widget(10)))).unwrap(),
            other => panic!("Unexpected statement: {:?}", other),
        }
        match next_statement(&mut tx).await {
            Some(TxRequest::SetStock { expected, stock, respond_to, .. }) => {
                assert_eq!((expected, stock), (10, 6));
                respond_to.send(Ok(true)).unwrap();
            }
            other => panic!("Unexpected statement: {:?}", other),
        }
        match next_statement(&mut tx).await {
            Some(TxRequest::UpdateOrder { respond_to, .. }) => {
                respond_to.send(Err(InventoryError::storage("constraint failed"))).unwrap();
            }
            other => panic!("Unexpected statement: {:?}", other),
        }
        let rollback = expect_rollback(&mut tx).await.expect("Expected Rollback");
        rollback.send(Ok(())).unwrap();

        let result = task.await.unwrap();
        assert_eq!(result, Err(InventoryError::storage("constraint failed")));
    }

    #[tokio::test]
    async fn stock_moved_underneath_is_a_storage_failure() {
        let (store, mut requests) = create_mock_store(4);
        let orders = OrderClient::new(store);

        let confirmed = Order {
            id: OrderId(3),
            product_id: ProductId(1),
            quantity: 4,
            state: OrderState::Confirmed,
        };
        let cancelled = confirmed.revised(4, OrderState::Cancelled);
        let task = tokio::spawn(async move { orders.update(cancelled).await });

        let mut tx = expect_begin(&mut requests).await.expect("Expected Begin");
        match next_statement(&mut tx).await {
            Some(TxRequest::GetOrder { respond_to, .. }) => respond_to.send(Ok(Some(confirmed))).unwrap(),
            other => panic!("Unexpected statement: {:?}", other),
        }
        match next_statement(&mut tx).await {
            Some(TxRequest::GetProduct { respond_to, .. }) => respond_to.send(Ok(Some(widget(6)))).unwrap(),
            other => panic!("Unexpected statement: {:?}", other),
        }
        match next_statement(&mut tx).await {
            Some(TxRequest::SetStock { respond_to, .. }) => respond_to.send(Ok(false)).unwrap(),
            other => panic!("Unexpected statement: {:?}", other),
        }
        expect_rollback(&mut tx).await.expect("Expected Rollback").send(Ok(())).unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(InventoryError::StorageFailure(_))));
    }
}
