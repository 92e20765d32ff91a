//! Storefront cart API access.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use cartwright_core::CartItemId;
use cartwright_core::api::{AddItemRequest, CartView, ErrorBody, SyncRequest, SyncResponse, UpdateQuantityRequest};

use crate::error::RemoteError;

/// The server side of a [`crate::CartReplica`].
///
/// Every call acts on the signed-in user's authoritative cart and returns
/// the cart as the server now sees it.
#[async_trait]
pub trait CartRemote: Send + Sync {
    /// Fetch the current cart.
    async fn get_cart(&self) -> Result<CartView, RemoteError>;

    /// Add units of a product.
    async fn add_item(&self, request: AddItemRequest) -> Result<CartView, RemoteError>;

    /// Set the quantity of a line.
    async fn update_item(&self, item_id: CartItemId, quantity: i64) -> Result<CartView, RemoteError>;

    /// Remove a line.
    async fn remove_item(&self, item_id: CartItemId) -> Result<CartView, RemoteError>;

    /// Merge a client cart into the server cart.
    async fn sync(&self, request: SyncRequest) -> Result<SyncResponse, RemoteError>;
}

#[async_trait]
impl<R: CartRemote + ?Sized> CartRemote for Arc<R> {
    async fn get_cart(&self) -> Result<CartView, RemoteError> {
        (**self).get_cart().await
    }

    async fn add_item(&self, request: AddItemRequest) -> Result<CartView, RemoteError> {
        (**self).add_item(request).await
    }

    async fn update_item(&self, item_id: CartItemId, quantity: i64) -> Result<CartView, RemoteError> {
        (**self).update_item(item_id, quantity).await
    }

    async fn remove_item(&self, item_id: CartItemId) -> Result<CartView, RemoteError> {
        (**self).remove_item(item_id).await
    }

    async fn sync(&self, request: SyncRequest) -> Result<SyncResponse, RemoteError> {
        (**self).sync(request).await
    }
}

#[derive(serde::Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// [`CartRemote`] over the storefront JSON API.
///
/// Keeps the session cookie from [`HttpCartRemote::login`] for later calls.
/// Cheaply cloneable; clones share the cookie jar.
#[derive(Clone)]
pub struct HttpCartRemote {
    inner: Arc<HttpCartRemoteInner>,
}

struct HttpCartRemoteInner {
    client: Client,
    base_url: Url,
}

impl HttpCartRemote {
    /// Create a remote for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("cartwright-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpCartRemoteInner { client, base_url }),
        })
    }

    /// Sign in and keep the session cookie.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Api` with status 401 for wrong credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), RemoteError> {
        let request = self
            .request(Method::POST, "api/auth/login")?
            .json(&Credentials { email, password });
        let _: serde_json::Value = self.execute(request).await?;
        Ok(())
    }

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storefront cannot be reached.
    pub async fn logout(&self) -> Result<(), RemoteError> {
        let response = self.request(Method::POST, "api/auth/logout")?.send().await?;
        check_status(response).await.map(drop)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RemoteError> {
        let url = self.inner.base_url.join(path)?;
        Ok(self.inner.client.request(method, url))
    }

    /// Send a request and decode a JSON success body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }
}

/// Pass successful responses through; decode error bodies.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await?;
    let status = status.as_u16();
    tracing::debug!(status, body = %text, "Storefront request failed");

    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(RemoteError::Api { status, body }),
        Err(_) => Err(RemoteError::Unexpected { status, body: text }),
    }
}

#[async_trait]
impl CartRemote for HttpCartRemote {
    async fn get_cart(&self) -> Result<CartView, RemoteError> {
        self.execute(self.request(Method::GET, "api/cart")?).await
    }

    async fn add_item(&self, request: AddItemRequest) -> Result<CartView, RemoteError> {
        self.execute(self.request(Method::POST, "api/cart/items")?.json(&request))
            .await
    }

    async fn update_item(&self, item_id: CartItemId, quantity: i64) -> Result<CartView, RemoteError> {
        let request = self
            .request(Method::PATCH, &format!("api/cart/items/{item_id}"))?
            .json(&UpdateQuantityRequest { quantity });
        self.execute(request).await
    }

    async fn remove_item(&self, item_id: CartItemId) -> Result<CartView, RemoteError> {
        self.execute(self.request(Method::DELETE, &format!("api/cart/items/{item_id}"))?)
            .await
    }

    async fn sync(&self, request: SyncRequest) -> Result<SyncResponse, RemoteError> {
        self.execute(self.request(Method::POST, "api/cart/sync")?.json(&request))
            .await
    }
}
