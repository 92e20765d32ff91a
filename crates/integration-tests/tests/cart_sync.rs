//! Integration tests for client cart merging and the cart replica.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use axum::response::IntoResponse;

use cartwright_client::{CartRemote, CartReplica, MemoryReplicaStore, RemoteError, ReplicaError};
use cartwright_core::api::{AddItemRequest, CartView, ErrorBody, LocalCartItem, SkipReason, SyncRequest, SyncResponse};
use cartwright_core::{CartItemId, Money, ProductId, UserId, VariantId};
use cartwright_integration_tests::Shop;
use cartwright_storefront::error::AppError;
use cartwright_storefront::services::{CartService, ServiceError};

/// A remote that calls [`CartService`] directly, as the signed-in `user`.
struct ServiceRemote {
    carts: CartService,
    user: UserId,
}

impl ServiceRemote {
    fn new(shop: &Shop, user: UserId) -> Self {
        Self {
            carts: shop.state.carts().clone(),
            user,
        }
    }
}

/// Render a service error exactly as the HTTP API would.
async fn remote_error(err: ServiceError) -> RemoteError {
    let response = AppError::from(err).into_response();
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
    RemoteError::Api { status, body }
}

#[async_trait]
impl CartRemote for ServiceRemote {
    async fn get_cart(&self) -> Result<CartView, RemoteError> {
        match self.carts.get_or_create(self.user).await {
            Ok(cart) => Ok(CartView::from(&cart)),
            Err(e) => Err(remote_error(e).await),
        }
    }

    async fn add_item(&self, request: AddItemRequest) -> Result<CartView, RemoteError> {
        match self
            .carts
            .add_item(self.user, request.product_id, request.quantity, request.variant_id)
            .await
        {
            Ok(cart) => Ok(CartView::from(&cart)),
            Err(e) => Err(remote_error(e).await),
        }
    }

    async fn update_item(&self, item_id: CartItemId, quantity: i64) -> Result<CartView, RemoteError> {
        match self.carts.update_item_quantity(self.user, item_id, quantity).await {
            Ok(cart) => Ok(CartView::from(&cart)),
            Err(e) => Err(remote_error(e).await),
        }
    }

    async fn remove_item(&self, item_id: CartItemId) -> Result<CartView, RemoteError> {
        match self.carts.remove_item(self.user, item_id).await {
            Ok(cart) => Ok(CartView::from(&cart)),
            Err(e) => Err(remote_error(e).await),
        }
    }

    async fn sync(&self, request: SyncRequest) -> Result<SyncResponse, RemoteError> {
        match self.carts.sync_from_client(self.user, &request.items).await {
            Ok(outcome) => Ok(SyncResponse {
                cart: CartView::from(&outcome.cart),
                skipped: outcome.skipped,
            }),
            Err(e) => Err(remote_error(e).await),
        }
    }
}

// ============================================================================
// sync_from_client
// ============================================================================

#[tokio::test]
async fn test_sync_is_idempotent() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let teapot = shop.product("Teapot", 25, 10).await;
    let (cup, blue) = shop.product_with_color("Cup", 8, 2, 10).await;

    let items = [
        LocalCartItem {
            product_id: teapot.id,
            variant_id: None,
            quantity: 2,
        },
        LocalCartItem {
            product_id: cup.id,
            variant_id: Some(blue),
            quantity: 3,
        },
    ];

    let once = shop.state.carts().sync_from_client(user, &items).await.unwrap();
    let twice = shop.state.carts().sync_from_client(user, &items).await.unwrap();

    assert_eq!(once.cart, twice.cart);
    assert_eq!(twice.cart.item_count(), 5);
    assert_eq!(twice.cart.total(), Money::from_units(80));
}

#[tokio::test]
async fn test_sync_client_quantity_wins_and_stale_lines_skipped() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let teapot = shop.product("Teapot", 25, 10).await;
    let (cup, _) = shop.product_with_color("Cup", 8, 2, 10).await;

    shop.state.carts().add_item(user, teapot.id, 4, None).await.unwrap();

    let missing = ProductId::generate();
    let items = [
        LocalCartItem {
            product_id: teapot.id,
            variant_id: None,
            quantity: 1,
        },
        LocalCartItem {
            product_id: missing,
            variant_id: None,
            quantity: 1,
        },
        LocalCartItem {
            product_id: cup.id,
            variant_id: Some(VariantId::generate()),
            quantity: 1,
        },
        LocalCartItem {
            product_id: cup.id,
            variant_id: None,
            quantity: 0,
        },
    ];
    let outcome = shop.state.carts().sync_from_client(user, &items).await.unwrap();

    assert_eq!(outcome.cart.items.len(), 1);
    assert_eq!(outcome.cart.items.first().unwrap().quantity, 1);
    let reasons: Vec<SkipReason> = outcome.skipped.iter().map(|s| s.reason).collect();
    assert_eq!(
        reasons,
        [
            SkipReason::ProductNotFound,
            SkipReason::VariantNotFound,
            SkipReason::InvalidQuantity
        ]
    );
}

// ============================================================================
// CartReplica against the real services
// ============================================================================

#[tokio::test]
async fn test_replica_signed_out_then_sign_in() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let teapot = shop.product("Teapot", 25, 10).await;
    let gone = ProductId::generate();

    let mut replica = CartReplica::new(ServiceRemote::new(&shop, user), MemoryReplicaStore::new());

    // Displayed prices are stale on purpose
    replica.add(teapot.id, None, 2, Money::from_units(1)).await.unwrap();
    replica.add(gone, None, 1, Money::from_units(1)).await.unwrap();
    assert!(shop.state.carts().get_or_create(user).await.unwrap().is_empty());

    let skipped = replica.sign_in().await.unwrap();

    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped.first().unwrap().item.product_id, gone);
    assert_eq!(replica.cart().total(), Money::from_units(50));
    assert_eq!(replica.cart(), &shop.state.carts().get_or_create(user).await.unwrap());
}

#[tokio::test]
async fn test_replica_signed_in_mirrors_server() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let teapot = shop.product("Teapot", 25, 10).await;

    let mut replica = CartReplica::new(ServiceRemote::new(&shop, user), MemoryReplicaStore::new());
    replica.sign_in().await.unwrap();

    replica.add(teapot.id, None, 1, Money::from_units(25)).await.unwrap();
    let line = replica.cart().items.first().unwrap().id;
    replica.update_quantity(line, 3).await.unwrap();

    let server = shop.state.carts().get_or_create(user).await.unwrap();
    assert_eq!(replica.cart(), &server);
    assert_eq!(server.item_count(), 3);

    replica.remove(line).await.unwrap();
    assert!(shop.state.carts().get_or_create(user).await.unwrap().is_empty());

    replica.sign_out().await.unwrap();
    assert!(replica.cart().is_empty());
    assert!(!replica.is_signed_in());
}

#[tokio::test]
async fn test_replica_keeps_rejected_change_until_refresh() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let scarce = shop.product("Vase", 60, 1).await;

    let mut replica = CartReplica::new(ServiceRemote::new(&shop, user), MemoryReplicaStore::new());
    replica.sign_in().await.unwrap();

    let result = replica.add(scarce.id, None, 2, Money::from_units(60)).await;

    let Err(ReplicaError::Remote(err)) = result else {
        panic!("expected the server to refuse");
    };
    assert_eq!(err.code(), Some("insufficient_stock"));
    assert_eq!(replica.cart().item_count(), 2);

    replica.refresh().await.unwrap();
    assert!(replica.cart().is_empty());
}
