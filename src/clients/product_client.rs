use tracing::{debug, info, instrument};

use crate::domain::{Product, ProductCreate, ProductId};
use crate::error::InventoryError;
use crate::store::{settle, Store, StoreTx};

/// Product capability: plain CRUD over the `products` table.
///
/// Direct updates are not gated by order reconciliation; they overwrite the
/// stored stock as given.
#[derive(Clone)]
pub struct ProductClient<S> {
    store: S,
}

impl_find_by_id!(ProductClient, Product, ProductId, product);

impl<S: Store> ProductClient<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(name = %product.name, stock = product.stock_quantity))]
    pub async fn create(&self, product: ProductCreate) -> Result<ProductId, InventoryError> {
        debug!("Creating product");
        let mut tx = self.store.begin().await?;
        let result = tx.insert_product(product).await;
        let id = settle(tx, result).await?;
        info!(product_id = %id, "Product created");
        Ok(id)
    }

    #[instrument(skip(self), fields(product_id = %product.id))]
    pub async fn update(&self, product: Product) -> Result<Product, InventoryError> {
        debug!("Updating product");
        let mut tx = self.store.begin().await?;
        let result = match tx.update_product(product.clone()).await {
            Ok(0) => Err(InventoryError::product_not_found(product.id)),
            Ok(_) => Ok(product),
            Err(e) => Err(e),
        };
        settle(tx, result).await
    }

    /// Removes the product row. Orders that still reference it are left alone.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<(), InventoryError> {
        debug!("Deleting product");
        let mut tx = self.store.begin().await?;
        let result = match tx.delete_product(id).await {
            Ok(0) => Err(InventoryError::product_not_found(id)),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        settle(tx, result).await?;
        info!("Product deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, InventoryError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_products().await;
        settle(tx, result).await
    }
}
