//! Saved shipping addresses.
//!
//! The list is loaded, changed through [`DefaultCollection`] and written back
//! as a single document, so the "exactly one default" rule holds after every
//! call.

use std::sync::Arc;

use tracing::instrument;

use cartwright_core::{AddressId, DefaultCollection, UserId};

use super::ServiceError;
use crate::db::Store;
use crate::models::{Address, AddressInput, AddressPatch};

/// A user's address book.
#[derive(Clone)]
pub struct AddressBook {
    store: Arc<dyn Store>,
}

impl AddressBook {
    /// Create an address book over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All saved addresses, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storage fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, ServiceError> {
        Ok(self.load(user_id).await?.into_vec())
    }

    /// One saved address.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the address does not exist.
    pub async fn get(&self, user_id: UserId, id: AddressId) -> Result<Address, ServiceError> {
        self.load(user_id)
            .await?
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("address"))
    }

    /// The default address, if any.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storage fails.
    pub async fn default_address(&self, user_id: UserId) -> Result<Option<Address>, ServiceError> {
        Ok(self.load(user_id).await?.default_item().cloned())
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if a required field is missing.
    #[instrument(skip_all, fields(%user_id))]
    pub async fn add(
        &self,
        user_id: UserId,
        input: AddressInput,
        make_default: bool,
    ) -> Result<Vec<Address>, ServiceError> {
        input.validate().map_err(ServiceError::Validation)?;

        let mut book = self.load(user_id).await?;
        book.add(input.into_address(), make_default);
        self.save(user_id, book).await
    }

    /// Edit an address. `patch.is_default = Some(true)` makes it the default.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown ID and `Validation` if the result
    /// would be missing a required field.
    #[instrument(skip_all, fields(%user_id, %id))]
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        patch: AddressPatch,
    ) -> Result<Vec<Address>, ServiceError> {
        let mut book = self.load(user_id).await?;
        let current = book.get(id).ok_or_else(|| ServiceError::not_found("address"))?;
        let next = patch.apply_to(current).map_err(ServiceError::Validation)?;

        book.update(id, patch.is_default, |address| *address = next)
            .map_err(|e| ServiceError::from_collection(e, "address"))?;
        self.save(user_id, book).await
    }

    /// Delete an address. Deleting the default promotes the first remaining one.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown ID.
    #[instrument(skip_all, fields(%user_id, %id))]
    pub async fn remove(&self, user_id: UserId, id: AddressId) -> Result<Vec<Address>, ServiceError> {
        let mut book = self.load(user_id).await?;
        book.remove(id)
            .map_err(|e| ServiceError::from_collection(e, "address"))?;
        self.save(user_id, book).await
    }

    async fn load(&self, user_id: UserId) -> Result<DefaultCollection<Address>, ServiceError> {
        let stored = self.store.get_addresses(user_id).await?;
        Ok(DefaultCollection::from_vec(stored))
    }

    async fn save(&self, user_id: UserId, book: DefaultCollection<Address>) -> Result<Vec<Address>, ServiceError> {
        let addresses = book.into_vec();
        self.store.save_addresses(user_id, &addresses).await?;
        Ok(addresses)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn input(city: &str) -> AddressInput {
        AddressInput {
            full_name: "Grace Hopper".to_owned(),
            line1: "1 Navy Way".to_owned(),
            line2: None,
            city: city.to_owned(),
            region: Some("VA".to_owned()),
            postal_code: "22202".to_owned(),
            country: "US".to_owned(),
            phone: None,
        }
    }

    fn default_count(list: &[Address]) -> usize {
        list.iter().filter(|a| a.is_default).count()
    }

    #[tokio::test]
    async fn test_first_address_becomes_default() {
        let book = AddressBook::new(Arc::new(MemoryStore::new()));
        let user = UserId::generate();
        let list = book.add(user, input("Arlington"), false).await.unwrap();
        assert!(list.first().unwrap().is_default);
    }

    #[tokio::test]
    async fn test_update_moves_default_and_remove_promotes() {
        let book = AddressBook::new(Arc::new(MemoryStore::new()));
        let user = UserId::generate();
        book.add(user, input("Arlington"), false).await.unwrap();
        let list = book.add(user, input("Norfolk"), false).await.unwrap();
        let second = list.get(1).unwrap().id;

        let patch = AddressPatch {
            is_default: Some(true),
            ..AddressPatch::default()
        };
        let list = book.update(user, second, patch).await.unwrap();
        assert_eq!(default_count(&list), 1);
        assert_eq!(book.default_address(user).await.unwrap().unwrap().id, second);

        let list = book.remove(user, second).await.unwrap();
        assert_eq!(default_count(&list), 1);
        assert_eq!(list.first().unwrap().city, "Arlington");
    }

    #[tokio::test]
    async fn test_validation_and_not_found() {
        let book = AddressBook::new(Arc::new(MemoryStore::new()));
        let user = UserId::generate();
        assert!(matches!(
            book.add(user, input(""), false).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            book.remove(user, AddressId::generate()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            book.update(user, AddressId::generate(), AddressPatch::default()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
