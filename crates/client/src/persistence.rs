//! Saving the replica between sessions.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cartwright_core::Cart;

use crate::error::PersistenceError;

/// Where a [`crate::CartReplica`] keeps its cart while the app is closed.
#[async_trait]
pub trait ReplicaPersistence: Send + Sync {
    /// The saved cart, or `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<Cart>, PersistenceError>;

    /// Replace the saved cart.
    async fn save(&self, cart: &Cart) -> Result<(), PersistenceError>;
}

/// Cart saved as a JSON file.
#[derive(Debug, Clone)]
pub struct FileReplicaStore {
    path: PathBuf,
}

impl FileReplicaStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(".tmp");
        path.into()
    }
}

#[async_trait]
impl ReplicaPersistence for FileReplicaStore {
    async fn load(&self) -> Result<Option<Cart>, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, cart: &Cart) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec(cart)?;
        // Write then rename so a crash never leaves half a file
        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

/// Cart kept in memory, for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryReplicaStore {
    cart: Mutex<Option<Cart>>,
}

impl MemoryReplicaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReplicaPersistence for MemoryReplicaStore {
    async fn load(&self) -> Result<Option<Cart>, PersistenceError> {
        Ok(self.cart.lock().await.clone())
    }

    async fn save(&self, cart: &Cart) -> Result<(), PersistenceError> {
        *self.cart.lock().await = Some(cart.clone());
        Ok(())
    }
}

#[async_trait]
impl<P: ReplicaPersistence + ?Sized> ReplicaPersistence for std::sync::Arc<P> {
    async fn load(&self) -> Result<Option<Cart>, PersistenceError> {
        (**self).load().await
    }

    async fn save(&self, cart: &Cart) -> Result<(), PersistenceError> {
        (**self).save(cart).await
    }
}
