//! Cartwright Client - an optimistic copy of the storefront cart.
//!
//! [`CartReplica`] keeps a cart on the client so the UI can update
//! instantly, works while signed out, and survives restarts through a
//! [`ReplicaPersistence`]. While signed in every change is forwarded to the
//! storefront through a [`CartRemote`], and the server's answer replaces the
//! local copy.
//!
//! # Example
//!
//! ```rust,ignore
//! use cartwright_client::{CartReplica, FileReplicaStore, HttpCartRemote};
//!
//! let remote = HttpCartRemote::new("https://shop.example.com")?;
//! let mut replica = CartReplica::load(remote, FileReplicaStore::new("cart.json")).await?;
//!
//! replica.add(product_id, None, 2, displayed_price).await?;
//!
//! replica.remote().login("me@example.com", "password").await?;
//! let skipped = replica.sign_in().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod error;
mod persistence;
mod remote;
mod replica;

pub use error::{PersistenceError, RemoteError, ReplicaError};
pub use persistence::{FileReplicaStore, MemoryReplicaStore, ReplicaPersistence};
pub use remote::{CartRemote, HttpCartRemote};
pub use replica::CartReplica;
