use tracing::{debug, error, info, instrument, warn};

use crate::domain::{Order, OrderCreate, OrderId, OrderState, ProductId};
use crate::error::InventoryError;
use crate::ledger::stock_delta;
use crate::store::{settle, Store, StoreTx};

/// Order capability and stock reconciliation engine.
///
/// Every mutation runs in one store transaction: the order row and, when the
/// order's held stock changes, the product's `stock_quantity` are written
/// together or not at all.
#[derive(Clone)]
pub struct OrderClient<S> {
    store: S,
}

impl_find_by_id!(OrderClient, Order, OrderId, order);

impl<S: Store> OrderClient<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an order in [`OrderState::Pending`].
    ///
    /// The requested quantity is checked against the product's current stock
    /// but nothing is reserved: pending orders hold no stock.
    #[instrument(skip(self), fields(product_id = %order.product_id, quantity = order.quantity))]
    pub async fn create(&self, order: OrderCreate) -> Result<Order, InventoryError> {
        info!("Processing create_order request");
        let mut tx = self.store.begin().await?;
        let result = Self::insert_pending(&mut tx, order).await;
        let order = settle(tx, result).await?;
        info!(order_id = %order.id, "Order created");
        Ok(order)
    }

    async fn insert_pending(tx: &mut S::Tx, mut order: OrderCreate) -> Result<Order, InventoryError> {
        let product = tx
            .get_product(order.product_id)
            .await?
            .ok_or_else(|| InventoryError::product_not_found(order.product_id))?;

        if order.state != OrderState::Pending {
            debug!(requested = %order.state, "Ignoring requested state, new orders start pending");
            order.state = OrderState::Pending;
        }

        if order.quantity > product.stock_quantity {
            warn!(available = product.stock_quantity, "Order exceeds available stock");
            return Err(InventoryError::InsufficientStock {
                requested: order.quantity,
                available: product.stock_quantity,
            });
        }

        let id = tx.insert_order(order.clone()).await?;
        Ok(Order::from_create(id, order))
    }

    /// Applies a new quantity and/or state to an existing order and moves the
    /// difference in held stock to or from the product.
    #[instrument(skip(self), fields(order_id = %order.id, quantity = order.quantity, state = %order.state))]
    pub async fn update(&self, order: Order) -> Result<Order, InventoryError> {
        info!("Processing update_order request");
        let mut tx = self.store.begin().await?;
        let result = Self::reconcile(&mut tx, order).await;
        match settle(tx, result).await {
            Ok(order) => {
                info!("Order updated");
                Ok(order)
            }
            Err(e) => {
                error!(error = %e, "Order update rolled back");
                Err(e)
            }
        }
    }

    async fn reconcile(tx: &mut S::Tx, after: Order) -> Result<Order, InventoryError> {
        let before = tx
            .get_order(after.id)
            .await?
            .ok_or_else(|| InventoryError::order_not_found(after.id))?;

        if before.product_id != after.product_id {
            return Err(InventoryError::InvalidArgument(format!(
                "cannot reassign product of order {} from {} to {}",
                after.id, before.product_id, after.product_id
            )));
        }

        let delta = stock_delta(&before, &after);
        if delta != 0 {
            let product = tx
                .get_product(after.product_id)
                .await?
                .ok_or_else(|| InventoryError::product_not_found(after.product_id))?;

            let new_stock = i64::from(product.stock_quantity) + delta;
            if new_stock < 0 {
                return Err(InventoryError::InsufficientStock {
                    requested: u32::try_from(-delta).unwrap_or(u32::MAX),
                    available: product.stock_quantity,
                });
            }
            let new_stock = u32::try_from(new_stock).map_err(|_| {
                InventoryError::InvalidArgument(format!(
                    "stock of product {} would exceed {}",
                    product.id,
                    u32::MAX
                ))
            })?;

            if !tx.set_stock(product.id, product.stock_quantity, new_stock).await? {
                return Err(InventoryError::storage(format!(
                    "stock of product {} changed concurrently",
                    product.id
                )));
            }
            debug!(
                product_id = %product.id,
                delta,
                from = product.stock_quantity,
                to = new_stock,
                "Stock adjusted"
            );
        }

        if tx.update_order(after.clone()).await? == 0 {
            return Err(InventoryError::order_not_found(after.id));
        }
        Ok(after)
    }

    /// Deletes the order row.
    ///
    /// Stock held by the order is not given back to the product, whatever its
    /// state. Cancel or return an order before deleting it to release stock.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete(&self, id: OrderId) -> Result<(), InventoryError> {
        info!("Processing delete_order request");
        let mut tx = self.store.begin().await?;
        let result = match tx.delete_order(id).await {
            Ok(0) => Err(InventoryError::order_not_found(id)),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        settle(tx, result).await?;
        info!("Order deleted");
        Ok(())
    }

    /// Orders referencing `product_id`, oldest first.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn find_by_product_id(&self, product_id: ProductId) -> Result<Vec<Order>, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result = match tx.get_product(product_id).await {
            Ok(Some(_)) => tx.list_orders(Some(product_id)).await,
            Ok(None) => Err(InventoryError::product_not_found(product_id)),
            Err(e) => Err(e),
        };
        settle(tx, result).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_orders(None).await;
        settle(tx, result).await
    }
}
