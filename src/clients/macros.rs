/// Generates the read-only `find_by_id` lookup shared by the clients.
///
/// The lookup runs in its own short transaction and maps a missing row to
/// `InventoryError::NotFound`.
macro_rules! impl_find_by_id {
    ($client:ident, $entity:ty, $id:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl<S: crate::store::Store> $client<S> {
                #[tracing::instrument(skip(self), fields(id = %id))]
                pub async fn find_by_id(&self, id: $id) -> Result<$entity, crate::error::InventoryError> {
                    tracing::debug!("Looking up");
                    let mut tx = self.store.begin().await?;
                    let found = tx.[<get_ $entity_name_snake>](id).await;
                    crate::store::settle(tx, found)
                        .await?
                        .ok_or_else(|| crate::error::InventoryError::[<$entity_name_snake _not_found>](id))
                }
            }
        }
    };
}
