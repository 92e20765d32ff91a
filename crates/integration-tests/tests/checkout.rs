//! Integration tests for order placement.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};

use cartwright_core::{FlashSale, Money, OrderStatus, PaymentStatus};
use cartwright_integration_tests::{Shop, address, card, cash_order};
use cartwright_storefront::models::PaymentMethod;
use cartwright_storefront::services::{PaymentSelection, PlaceOrderRequest, ServiceError, ShippingSelection};

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_checkout_totals_stock_and_notification() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let teapot = shop.product("Teapot", 25, 10).await;
    let cup = shop.product("Cup", 40, 5).await;

    shop.state.carts().add_item(user, teapot.id, 2, None).await.unwrap();
    shop.state.carts().add_item(user, cup.id, 1, None).await.unwrap();

    let order = shop.state.checkout().place_order(user, cash_order()).await.unwrap();

    assert_eq!(order.subtotal, Money::from_units(90));
    assert_eq!(order.shipping, Money::from_units(10));
    assert_eq!(order.total, Money::from_units(100));
    assert_eq!(order.order_status, OrderStatus::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 2);

    assert!(shop.state.carts().get_or_create(user).await.unwrap().is_empty());
    assert_eq!(shop.stock(teapot.id).await, 8);
    assert_eq!(shop.stock(cup.id).await, 4);

    let sent = shop.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent.first().unwrap().0, "ada@cartwright.test");
    assert_eq!(sent.first().unwrap().1, format!("Order {} confirmed", order.order_number));

    let history = shop.state.orders().list_orders(user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.first().unwrap().order_number, order.order_number);
}

#[tokio::test]
async fn test_checkout_uses_default_address_and_card() {
    let shop = Shop::new();
    let user = shop.customer("grace@cartwright.test").await;
    let lamp = shop.product("Lamp", 120, 3).await;

    shop.state
        .addresses()
        .add(user, address("Grace Hopper"), false)
        .await
        .unwrap();
    let cards = shop
        .state
        .vault()
        .add(user, cartwright_integration_tests::PASSWORD, card("5500 0000 0000 0004"), false)
        .await
        .unwrap();
    let card_id = cards.first().unwrap().id;

    shop.state.carts().add_item(user, lamp.id, 1, None).await.unwrap();
    let request = PlaceOrderRequest {
        shipping: ShippingSelection::default(),
        payment: PaymentSelection {
            method: PaymentMethod::Card,
            payment_option_id: Some(card_id),
        },
    };
    let order = shop.state.checkout().place_order(user, request).await.unwrap();

    assert_eq!(order.shipping_address.full_name, "Grace Hopper");
    assert_eq!(order.payment.card_number.as_deref(), Some("5500********0004"));
    // Above the threshold, so no shipping
    assert_eq!(order.total, Money::from_units(120));
}

#[tokio::test]
async fn test_variant_price_is_snapshotted() {
    let shop = Shop::new();
    let user = shop.customer("lin@cartwright.test").await;
    let (teapot, blue) = shop.product_with_color("Teapot", 30, 5, 4).await;

    shop.state.carts().add_item(user, teapot.id, 2, Some(blue)).await.unwrap();
    let order = shop.state.checkout().place_order(user, cash_order()).await.unwrap();

    let line = order.items.first().unwrap();
    assert_eq!(line.price, Money::from_units(35));
    assert_eq!(line.variant_label.as_deref(), Some("Color: Blue"));
    assert_eq!(order.subtotal, Money::from_units(70));
}

// ============================================================================
// Repricing at checkout
// ============================================================================

fn sale(percent: u8, ends_in: Duration) -> FlashSale {
    let now = Utc::now();
    FlashSale {
        is_on_flash_sale: true,
        discount_percentage: percent,
        flash_sale_start_date: now - Duration::hours(1),
        flash_sale_end_date: now + ends_in,
    }
}

#[tokio::test]
async fn test_sale_starting_after_add_applies_at_checkout() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let mut clock = shop.product("Clock", 100, 5).await;

    let cart = shop.state.carts().add_item(user, clock.id, 1, None).await.unwrap();
    assert_eq!(cart.items.first().unwrap().price, Money::from_units(100));

    clock.flash_sale = Some(sale(20, Duration::hours(1)));
    shop.save_product(&clock).await;

    let order = shop.state.checkout().place_order(user, cash_order()).await.unwrap();

    assert_eq!(order.items.first().unwrap().price, Money::from_units(80));
    assert_eq!(order.subtotal, Money::from_units(80));
    assert_eq!(order.total, Money::from_units(90));
}

#[tokio::test]
async fn test_sale_ending_after_add_is_not_honoured() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let mut clock = shop.product("Clock", 100, 5).await;
    clock.flash_sale = Some(sale(20, Duration::hours(1)));
    shop.save_product(&clock).await;

    let cart = shop.state.carts().add_item(user, clock.id, 1, None).await.unwrap();
    assert_eq!(cart.items.first().unwrap().price, Money::from_units(80));

    clock.flash_sale = Some(sale(20, -Duration::minutes(30)));
    shop.save_product(&clock).await;

    let order = shop.state.checkout().place_order(user, cash_order()).await.unwrap();

    assert_eq!(order.items.first().unwrap().price, Money::from_units(100));
    assert_eq!(order.subtotal, Money::from_units(100));
    // 100 is not above the free-shipping threshold
    assert_eq!(order.total, Money::from_units(110));
}

// ============================================================================
// Refusals leave no trace
// ============================================================================

#[tokio::test]
async fn test_insufficient_stock_is_atomic() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let teapot = shop.product("Teapot", 25, 10).await;
    let cup = shop.product("Cup", 40, 10).await;

    shop.state.carts().add_item(user, teapot.id, 1, None).await.unwrap();
    shop.state.carts().add_item(user, cup.id, 5, None).await.unwrap();

    // Stock drops after the items were carted
    let mut cup_now = cup.clone();
    cup_now.stock = 3;
    shop.save_product(&cup_now).await;

    let cart_before = shop.state.carts().get_or_create(user).await.unwrap();
    let result = shop.state.checkout().place_order(user, cash_order()).await;

    let Err(ServiceError::InsufficientStock(shortfalls)) = result else {
        panic!("expected insufficient stock, got {result:?}");
    };
    assert_eq!(shortfalls.len(), 1);
    let shortfall = shortfalls.first().unwrap();
    assert_eq!(shortfall.product_id, cup.id);
    assert_eq!(shortfall.requested, 5);
    assert_eq!(shortfall.available, 3);

    assert_eq!(shop.store.order_count().await, 0);
    assert_eq!(shop.state.carts().get_or_create(user).await.unwrap(), cart_before);
    assert_eq!(shop.stock(teapot.id).await, 10);
    assert_eq!(shop.stock(cup.id).await, 3);
    assert!(shop.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;

    let result = shop.state.checkout().place_order(user, cash_order()).await;
    assert!(matches!(result, Err(ServiceError::EmptyCart)));
    assert_eq!(shop.store.order_count().await, 0);
}

// ============================================================================
// Immutability
// ============================================================================

#[tokio::test]
async fn test_order_ignores_later_catalog_and_address_edits() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let teapot = shop.product("Teapot", 25, 10).await;

    let book = shop
        .state
        .addresses()
        .add(user, address("Ada Lovelace"), true)
        .await
        .unwrap();
    let address_id = book.first().unwrap().id;

    shop.state.carts().add_item(user, teapot.id, 1, None).await.unwrap();
    let request = PlaceOrderRequest {
        shipping: ShippingSelection {
            address_id: Some(address_id),
            address: None,
        },
        ..cash_order()
    };
    let placed = shop.state.checkout().place_order(user, request).await.unwrap();

    let mut renamed = teapot.clone();
    renamed.name = "Kettle".to_owned();
    renamed.price = Money::from_units(99);
    shop.save_product(&renamed).await;
    shop.state
        .addresses()
        .update(
            user,
            address_id,
            cartwright_storefront::models::AddressPatch {
                city: Some("Shelbyville".to_owned()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = shop
        .state
        .orders()
        .get_order(user, &placed.order_number)
        .await
        .unwrap();
    assert_eq!(stored, placed);
    assert_eq!(stored.items.first().unwrap().name, "Teapot");
    assert_eq!(stored.items.first().unwrap().price, Money::from_units(25));
    assert_eq!(stored.shipping_address.city, "Springfield");
}

#[tokio::test]
async fn test_cancel_then_no_further_changes() {
    let shop = Shop::new();
    let user = shop.customer("ada@cartwright.test").await;
    let teapot = shop.product("Teapot", 25, 10).await;
    shop.state.carts().add_item(user, teapot.id, 1, None).await.unwrap();
    let order = shop.state.checkout().place_order(user, cash_order()).await.unwrap();

    let cancelled = shop
        .state
        .orders()
        .cancel_order(user, &order.order_number)
        .await
        .unwrap();
    assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
    assert_eq!(cancelled.items, order.items);

    let again = shop.state.orders().cancel_order(user, &order.order_number).await;
    assert!(matches!(again, Err(ServiceError::InvalidTransition(_))));
}

#[tokio::test]
async fn test_orders_are_private() {
    let shop = Shop::new();
    let owner = shop.customer("ada@cartwright.test").await;
    let other = shop.customer("eve@cartwright.test").await;
    let teapot = shop.product("Teapot", 25, 10).await;
    shop.state.carts().add_item(owner, teapot.id, 1, None).await.unwrap();
    let order = shop.state.checkout().place_order(owner, cash_order()).await.unwrap();

    assert!(matches!(
        shop.state.orders().get_order(other, &order.order_number).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(shop.state.orders().list_orders(other).await.unwrap().is_empty());
}
