//! Optimistic client cart.
//!
//! Mutations apply locally first so the UI never waits on the network. While
//! signed in the same change is then sent to the storefront, and the server's
//! cart replaces the local one. A failed call leaves the local change in place
//! and returns the error; [`CartReplica::refresh`] brings the replica back in
//! line with the server.

use cartwright_core::api::{AddItemRequest, CartView, LocalCartItem, SkippedItem, SyncRequest};
use cartwright_core::{Cart, CartItemId, Money, ProductId, VariantId};

use crate::error::{RemoteError, ReplicaError};
use crate::persistence::ReplicaPersistence;
use crate::remote::CartRemote;

/// Client-side copy of the cart.
pub struct CartReplica<R, P> {
    remote: R,
    persistence: P,
    cart: Cart,
    signed_in: bool,
}

impl<R: CartRemote, P: ReplicaPersistence> CartReplica<R, P> {
    /// An empty, signed-out replica.
    #[must_use]
    pub fn new(remote: R, persistence: P) -> Self {
        Self {
            remote,
            persistence,
            cart: Cart::default(),
            signed_in: false,
        }
    }

    /// A signed-out replica holding whatever `persistence` saved last.
    ///
    /// # Errors
    ///
    /// Returns `ReplicaError::Persistence` if the saved cart cannot be read.
    pub async fn load(remote: R, persistence: P) -> Result<Self, ReplicaError> {
        let cart = persistence.load().await?.unwrap_or_default();
        tracing::debug!(lines = cart.items.len(), "Loaded saved cart");
        Ok(Self {
            remote,
            persistence,
            cart,
            signed_in: false,
        })
    }

    /// The current local cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The local cart in API shape.
    #[must_use]
    pub fn view(&self) -> CartView {
        CartView::from(&self.cart)
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    /// The remote, e.g. to log in before [`CartReplica::sign_in`].
    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Add units of a product at the price the UI is showing.
    ///
    /// The price is only a placeholder until the server answers; the server
    /// never reads it.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` if `quantity` is zero
    /// - `Persistence` if the local cart cannot be saved
    /// - `Remote` if the server refused the change (the local change stays)
    pub async fn add(
        &mut self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: u32,
        displayed_price: Money,
    ) -> Result<&Cart, ReplicaError> {
        if quantity == 0 {
            return Err(ReplicaError::InvalidQuantity);
        }

        self.cart.add((product_id, variant_id), quantity, displayed_price);
        self.persist().await?;

        if self.signed_in {
            let result = self
                .remote
                .add_item(AddItemRequest {
                    product_id,
                    quantity: i64::from(quantity),
                    variant_id,
                })
                .await;
            self.adopt(result).await?;
        }

        Ok(&self.cart)
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` if `quantity` is zero
    /// - `ItemNotFound` if the replica has no such line
    /// - `Persistence` if the local cart cannot be saved
    /// - `Remote` if the server refused the change (the local change stays)
    pub async fn update_quantity(&mut self, item_id: CartItemId, quantity: u32) -> Result<&Cart, ReplicaError> {
        if quantity == 0 {
            return Err(ReplicaError::InvalidQuantity);
        }

        let line = self.cart.item_mut(item_id).ok_or(ReplicaError::ItemNotFound)?;
        line.quantity = quantity;
        self.persist().await?;

        if self.signed_in {
            let result = self.remote.update_item(item_id, i64::from(quantity)).await;
            self.adopt(result).await?;
        }

        Ok(&self.cart)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// - `ItemNotFound` if the replica has no such line
    /// - `Persistence` if the local cart cannot be saved
    /// - `Remote` if the server refused the change (the local change stays)
    pub async fn remove(&mut self, item_id: CartItemId) -> Result<&Cart, ReplicaError> {
        if !self.cart.remove(item_id) {
            return Err(ReplicaError::ItemNotFound);
        }
        self.persist().await?;

        if self.signed_in {
            let result = self.remote.remove_item(item_id).await;
            self.adopt(result).await?;
        }

        Ok(&self.cart)
    }

    /// Merge the local cart into the server cart and switch to signed-in
    /// mode.
    ///
    /// Call after the remote holds a session. Returns the local lines the
    /// server refused to merge; the replica afterwards holds the server cart.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the sync call fails; the replica stays signed out
    /// with its local lines untouched.
    pub async fn sign_in(&mut self) -> Result<Vec<SkippedItem>, ReplicaError> {
        let items = self
            .cart
            .items
            .iter()
            .map(|item| LocalCartItem {
                product_id: item.product_id,
                variant_id: item.variant_id,
                quantity: i64::from(item.quantity),
            })
            .collect();

        let response = self.remote.sync(SyncRequest { items }).await?;

        self.cart = Cart::from(response.cart);
        self.signed_in = true;
        self.persist().await?;

        if !response.skipped.is_empty() {
            tracing::info!(skipped = response.skipped.len(), "Some local cart lines were not merged");
        }
        Ok(response.skipped)
    }

    /// Forget the cart and return to signed-out mode.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the emptied cart cannot be saved.
    pub async fn sign_out(&mut self) -> Result<(), ReplicaError> {
        self.signed_in = false;
        self.cart.clear();
        self.persist().await
    }

    /// Replace the replica with the server cart.
    ///
    /// Signed out there is no server cart, so this only returns the local one.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the fetch fails.
    pub async fn refresh(&mut self) -> Result<&Cart, ReplicaError> {
        if self.signed_in {
            let result = self.remote.get_cart().await;
            self.adopt(result).await?;
        }
        Ok(&self.cart)
    }

    async fn adopt(&mut self, result: Result<CartView, RemoteError>) -> Result<(), ReplicaError> {
        match result {
            Ok(view) => {
                self.cart = Cart::from(view);
                self.persist().await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Storefront rejected cart change; keeping local state");
                Err(e.into())
            }
        }
    }

    async fn persist(&self) -> Result<(), ReplicaError> {
        self.persistence.save(&self.cart).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use cartwright_core::api::{ErrorBody, SkipReason, SyncResponse};

    use super::*;
    use crate::persistence::MemoryReplicaStore;

    /// Server stand-in that prices everything at 10 and can be told to fail.
    #[derive(Default)]
    struct FakeRemote {
        cart: Mutex<Cart>,
        failing: Mutex<bool>,
        unknown: Mutex<Option<ProductId>>,
    }

    const SERVER_PRICE: i64 = 10;

    impl FakeRemote {
        async fn check(&self) -> Result<(), RemoteError> {
            if *self.failing.lock().await {
                return Err(RemoteError::Api {
                    status: 409,
                    body: ErrorBody::new("insufficient_stock", "not enough stock for some items"),
                });
            }
            Ok(())
        }

        async fn view(&self) -> CartView {
            CartView::from(&*self.cart.lock().await)
        }
    }

    #[async_trait]
    impl CartRemote for FakeRemote {
        async fn get_cart(&self) -> Result<CartView, RemoteError> {
            self.check().await?;
            Ok(self.view().await)
        }

        async fn add_item(&self, request: AddItemRequest) -> Result<CartView, RemoteError> {
            self.check().await?;
            let quantity = u32::try_from(request.quantity).unwrap();
            self.cart.lock().await.add(
                (request.product_id, request.variant_id),
                quantity,
                Money::from_units(SERVER_PRICE),
            );
            Ok(self.view().await)
        }

        async fn update_item(&self, item_id: CartItemId, quantity: i64) -> Result<CartView, RemoteError> {
            self.check().await?;
            if let Some(line) = self.cart.lock().await.item_mut(item_id) {
                line.quantity = u32::try_from(quantity).unwrap();
            }
            Ok(self.view().await)
        }

        async fn remove_item(&self, item_id: CartItemId) -> Result<CartView, RemoteError> {
            self.check().await?;
            self.cart.lock().await.remove(item_id);
            Ok(self.view().await)
        }

        async fn sync(&self, request: SyncRequest) -> Result<SyncResponse, RemoteError> {
            self.check().await?;
            let unknown = *self.unknown.lock().await;
            let mut skipped = Vec::new();
            {
                let mut cart = self.cart.lock().await;
                for item in request.items {
                    if Some(item.product_id) == unknown {
                        skipped.push(SkippedItem {
                            item,
                            reason: SkipReason::ProductNotFound,
                        });
                        continue;
                    }
                    let quantity = u32::try_from(item.quantity).unwrap();
                    cart.upsert((item.product_id, item.variant_id), quantity, Money::from_units(SERVER_PRICE));
                }
            }
            Ok(SyncResponse {
                cart: self.view().await,
                skipped,
            })
        }
    }

    type TestReplica = CartReplica<Arc<FakeRemote>, Arc<MemoryReplicaStore>>;

    fn replica() -> (TestReplica, Arc<FakeRemote>, Arc<MemoryReplicaStore>) {
        let remote = Arc::new(FakeRemote::default());
        let store = Arc::new(MemoryReplicaStore::new());
        (CartReplica::new(Arc::clone(&remote), Arc::clone(&store)), remote, store)
    }

    #[tokio::test]
    async fn test_signed_out_changes_stay_local() {
        let (mut replica, remote, store) = replica();
        let product = ProductId::generate();

        replica.add(product, None, 2, Money::from_units(25)).await.unwrap();
        replica.add(product, None, 1, Money::from_units(25)).await.unwrap();

        assert_eq!(replica.cart().items.len(), 1);
        assert_eq!(replica.cart().item_count(), 3);
        assert!(remote.cart.lock().await.is_empty());
        assert_eq!(store.load().await.unwrap().as_ref(), Some(replica.cart()));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (mut replica, _, _) = replica();
        let result = replica.add(ProductId::generate(), None, 0, Money::from_units(1)).await;
        assert!(matches!(result, Err(ReplicaError::InvalidQuantity)));
        assert!(replica.cart().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_merges_and_reports_skipped() {
        let (mut replica, remote, _) = replica();
        let kept = ProductId::generate();
        let gone = ProductId::generate();
        *remote.unknown.lock().await = Some(gone);

        replica.add(kept, None, 2, Money::from_units(99)).await.unwrap();
        replica.add(gone, None, 1, Money::from_units(5)).await.unwrap();

        let skipped = replica.sign_in().await.unwrap();

        assert!(replica.is_signed_in());
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped.first().unwrap().item.product_id, gone);
        assert_eq!(replica.cart().items.len(), 1);
        // Server price replaces the displayed one
        assert_eq!(replica.cart().total(), Money::from_units(20));
    }

    #[tokio::test]
    async fn test_signed_in_changes_adopt_server_cart() {
        let (mut replica, remote, _) = replica();
        replica.sign_in().await.unwrap();

        let product = ProductId::generate();
        replica.add(product, None, 3, Money::from_units(99)).await.unwrap();
        assert_eq!(replica.cart(), &*remote.cart.lock().await);

        let id = replica.cart().items.first().unwrap().id;
        replica.update_quantity(id, 1).await.unwrap();
        assert_eq!(replica.cart().total(), Money::from_units(10));

        replica.remove(id).await.unwrap();
        assert!(replica.cart().is_empty());
        assert!(remote.cart.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_local_change() {
        let (mut replica, remote, _) = replica();
        replica.sign_in().await.unwrap();
        *remote.failing.lock().await = true;

        let result = replica.add(ProductId::generate(), None, 1, Money::from_units(7)).await;

        let Err(ReplicaError::Remote(err)) = result else {
            panic!("expected remote error");
        };
        assert_eq!(err.code(), Some("insufficient_stock"));
        assert_eq!(replica.cart().item_count(), 1);

        // Refresh restores the server's view once it answers again
        *remote.failing.lock().await = false;
        replica.refresh().await.unwrap();
        assert!(replica.cart().is_empty());
    }

    #[tokio::test]
    async fn test_failed_sign_in_stays_signed_out() {
        let (mut replica, remote, _) = replica();
        replica.add(ProductId::generate(), None, 1, Money::from_units(7)).await.unwrap();
        *remote.failing.lock().await = true;

        assert!(replica.sign_in().await.is_err());
        assert!(!replica.is_signed_in());
        assert_eq!(replica.cart().item_count(), 1);
    }

    #[tokio::test]
    async fn test_sign_out_clears() {
        let (mut replica, _, store) = replica();
        replica.sign_in().await.unwrap();
        replica.add(ProductId::generate(), None, 1, Money::from_units(7)).await.unwrap();

        replica.sign_out().await.unwrap();

        assert!(!replica.is_signed_in());
        assert!(replica.cart().is_empty());
        assert_eq!(store.load().await.unwrap(), Some(Cart::default()));
    }

    #[tokio::test]
    async fn test_load_restores_saved_cart() {
        let (mut replica, remote, store) = replica();
        replica.add(ProductId::generate(), None, 4, Money::from_units(3)).await.unwrap();
        let saved = replica.cart().clone();
        drop(replica);

        let restored = CartReplica::load(remote, store).await.unwrap();
        assert_eq!(restored.cart(), &saved);
        assert!(!restored.is_signed_in());
    }

    #[tokio::test]
    async fn test_unknown_line() {
        let (mut replica, _, _) = replica();
        let result = replica.remove(CartItemId::generate()).await;
        assert!(matches!(result, Err(ReplicaError::ItemNotFound)));
    }
}
