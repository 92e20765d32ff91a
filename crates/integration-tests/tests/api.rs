//! Integration tests for the JSON API, driven through the full router.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use cartwright_core::Money;
use cartwright_core::api::CartView;
use cartwright_integration_tests::{PASSWORD, Shop, cash_order, test_config};
use cartwright_storefront::middleware::create_session_layer;
use cartwright_storefront::models::Order;

/// A browser stand-in: one router, one cookie jar of size one.
struct Browser {
    router: Router,
    cookie: Option<String>,
}

impl Browser {
    fn new(shop: &Shop) -> Self {
        let sessions = create_session_layer(tower_sessions::MemoryStore::default(), &test_config());
        Self {
            router: cartwright_storefront::app(shop.state.clone(), sessions),
            cookie: None,
        }
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            // Rate limiting keys on the client IP
            .header("x-forwarded-for", "203.0.113.10");
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_owned();
            self.cookie = Some(pair);
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn register(&mut self, email: &str) {
        let (status, body) = self
            .post("/api/auth/register", json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["email"], email);
    }
}

// ============================================================================
// Health & auth
// ============================================================================

#[tokio::test]
async fn test_health() {
    let shop = Shop::new();
    let mut browser = Browser::new(&shop);

    assert_eq!(browser.get("/health").await.0, StatusCode::OK);
    assert_eq!(browser.get("/health/ready").await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_cart_requires_session() {
    let shop = Shop::new();
    let mut browser = Browser::new(&shop);

    let (status, body) = browser.get("/api/cart").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_login_logout() {
    let shop = Shop::new();
    let mut browser = Browser::new(&shop);
    browser.register("ada@cartwright.test").await;

    assert_eq!(browser.send(Method::POST, "/api/auth/logout", None).await.0, StatusCode::NO_CONTENT);
    assert_eq!(browser.get("/api/cart").await.0, StatusCode::UNAUTHORIZED);

    let (status, _) = browser
        .post(
            "/api/auth/login",
            json!({ "email": "ada@cartwright.test", "password": "not it" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = browser
        .post(
            "/api/auth/login",
            json!({ "email": "ada@cartwright.test", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(browser.get("/api/cart").await.0, StatusCode::OK);
}

// ============================================================================
// Cart & checkout
// ============================================================================

#[tokio::test]
async fn test_cart_to_order_over_http() {
    let shop = Shop::new();
    let teapot = shop.product("Teapot", 25, 10).await;
    let cup = shop.product("Cup", 40, 10).await;
    let mut browser = Browser::new(&shop);
    browser.register("ada@cartwright.test").await;

    let (status, _) = browser
        .post("/api/cart/items", json!({ "productId": teapot.id, "quantity": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = browser
        .post("/api/cart/items", json!({ "productId": cup.id, "quantity": 1 }))
        .await;
    let cart: CartView = serde_json::from_value(body).unwrap();
    assert_eq!(cart.total, Money::from_units(90));
    assert_eq!(cart.item_count, 3);

    let (status, body) = browser
        .post("/api/orders", serde_json::to_value(cash_order()).unwrap())
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order: Order = serde_json::from_value(body).unwrap();
    assert_eq!(order.total, Money::from_units(100));

    let (_, body) = browser.get("/api/cart").await;
    assert_eq!(body["items"], json!([]));

    let (_, body) = browser.get("/api/orders").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = browser
        .send(Method::POST, &format!("/api/orders/{}/cancel", order.order_number), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orderStatus"], "cancelled");
}

#[tokio::test]
async fn test_invalid_quantity_and_unknown_product() {
    let shop = Shop::new();
    let teapot = shop.product("Teapot", 25, 10).await;
    let mut browser = Browser::new(&shop);
    browser.register("ada@cartwright.test").await;

    let (status, body) = browser
        .post("/api/cart/items", json!({ "productId": teapot.id, "quantity": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = browser
        .post(
            "/api/cart/items",
            json!({ "productId": cartwright_core::ProductId::generate(), "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shortfall_reported_over_http() {
    let shop = Shop::new();
    let vase = shop.product("Vase", 60, 5).await;
    let mut browser = Browser::new(&shop);
    browser.register("ada@cartwright.test").await;

    browser
        .post("/api/cart/items", json!({ "productId": vase.id, "quantity": 5 }))
        .await;
    let mut fewer = vase.clone();
    fewer.stock = 3;
    shop.save_product(&fewer).await;

    let (status, body) = browser
        .post("/api/orders", serde_json::to_value(cash_order()).unwrap())
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["shortfalls"][0]["requested"], 5);
    assert_eq!(body["shortfalls"][0]["available"], 3);

    let (_, body) = browser.get("/api/cart").await;
    assert_eq!(body["itemCount"], 5);
}

#[tokio::test]
async fn test_empty_cart_checkout() {
    let shop = Shop::new();
    let mut browser = Browser::new(&shop);
    browser.register("ada@cartwright.test").await;

    let (status, body) = browser
        .post("/api/orders", serde_json::to_value(cash_order()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "empty_cart");
}

// ============================================================================
// Account
// ============================================================================

#[tokio::test]
async fn test_payment_vault_over_http() {
    let shop = Shop::new();
    let mut browser = Browser::new(&shop);
    browser.register("ada@cartwright.test").await;

    let card = json!({
        "cardholderName": "Ada Lovelace",
        "cardNumber": "5500 0000 0000 0004",
        "expiryMonth": 12,
        "expiryYear": 2030,
    });

    let mut wrong = card.clone();
    wrong["password"] = json!("guess");
    let (status, _) = browser.post("/api/account/payments", wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut right = card;
    right["password"] = json!(PASSWORD);
    let (status, body) = browser.post("/api/account/payments", right).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body[0]["cardNumber"], "5500********0004");
    assert_eq!(body[0]["isDefault"], true);
    assert!(!body.to_string().contains("5500000000000004"));
}

#[tokio::test]
async fn test_addresses_over_http() {
    let shop = Shop::new();
    let mut browser = Browser::new(&shop);
    browser.register("ada@cartwright.test").await;

    let (status, body) = browser
        .post(
            "/api/account/addresses",
            json!({
                "fullName": "Ada Lovelace",
                "line1": "1 Market Street",
                "city": "Springfield",
                "region": "OR",
                "postalCode": "97477",
                "country": "US",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body[0]["isDefault"], true);
    assert_eq!(body[0]["region"], "OR");

    let id = body[0]["id"].as_str().unwrap().to_owned();
    let (status, body) = browser
        .send(
            Method::PATCH,
            &format!("/api/account/addresses/{id}"),
            Some(json!({ "region": null, "city": "Eugene" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body[0]["region"], Value::Null);
    assert_eq!(body[0]["city"], "Eugene");

    let (status, body) = browser
        .post("/api/account/addresses", json!({ "fullName": "Nobody" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}
