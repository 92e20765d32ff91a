//! Saved payment cards, gated by the account password.
//!
//! Every mutation verifies a freshly supplied password before touching the
//! list. A failed check returns `Unauthorized` with the same message whether
//! the password was close, empty or the account has no hash.

use std::sync::Arc;

use tracing::instrument;

use cartwright_core::{DefaultCollection, PaymentOptionId, UserId};

use super::ServiceError;
use super::auth::CredentialVerifier;
use crate::db::Store;
use crate::models::{PaymentOption, PaymentOptionInput, PaymentOptionPatch, PaymentOptionView};

/// A user's saved cards.
#[derive(Clone)]
pub struct PaymentVault {
    store: Arc<dyn Store>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl PaymentVault {
    /// Create a vault over `store`, checking passwords with `verifier`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Masked views of every saved card.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storage fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<PaymentOptionView>, ServiceError> {
        Ok(views(self.load(user_id).await?.items()))
    }

    /// The stored card, for snapshotting into an order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the card does not exist.
    pub(crate) async fn get(&self, user_id: UserId, id: PaymentOptionId) -> Result<PaymentOption, ServiceError> {
        self.load(user_id)
            .await?
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("payment option"))
    }

    /// Save a new card.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the password is wrong and `Validation` if
    /// the card details are malformed.
    #[instrument(skip_all, fields(%user_id))]
    pub async fn add(
        &self,
        user_id: UserId,
        password: &str,
        input: PaymentOptionInput,
        make_default: bool,
    ) -> Result<Vec<PaymentOptionView>, ServiceError> {
        self.authorize(user_id, password).await?;
        let option = input.into_option().map_err(ServiceError::Validation)?;

        let mut vault = self.load(user_id).await?;
        vault.add(option, make_default);
        self.save(user_id, vault).await
    }

    /// Edit a card. `patch.is_default = Some(true)` makes it the default.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the password is wrong, `NotFound` for an
    /// unknown ID and `Validation` for malformed details.
    #[instrument(skip_all, fields(%user_id, %id))]
    pub async fn update(
        &self,
        user_id: UserId,
        password: &str,
        id: PaymentOptionId,
        patch: PaymentOptionPatch,
    ) -> Result<Vec<PaymentOptionView>, ServiceError> {
        self.authorize(user_id, password).await?;

        let mut vault = self.load(user_id).await?;
        let current = vault
            .get(id)
            .ok_or_else(|| ServiceError::not_found("payment option"))?;
        let next = patch.apply_to(current).map_err(ServiceError::Validation)?;

        vault
            .update(id, patch.is_default, |option| *option = next)
            .map_err(|e| ServiceError::from_collection(e, "payment option"))?;
        self.save(user_id, vault).await
    }

    /// Delete a card. Deleting the default promotes the first remaining one.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the password is wrong and `NotFound` for an
    /// unknown ID.
    #[instrument(skip_all, fields(%user_id, %id))]
    pub async fn remove(
        &self,
        user_id: UserId,
        password: &str,
        id: PaymentOptionId,
    ) -> Result<Vec<PaymentOptionView>, ServiceError> {
        self.authorize(user_id, password).await?;

        let mut vault = self.load(user_id).await?;
        vault
            .remove(id)
            .map_err(|e| ServiceError::from_collection(e, "payment option"))?;
        self.save(user_id, vault).await
    }

    async fn authorize(&self, user_id: UserId, password: &str) -> Result<(), ServiceError> {
        if self.verifier.verify(user_id, password).await? {
            Ok(())
        } else {
            tracing::warn!(%user_id, "Payment vault password check failed");
            Err(ServiceError::Unauthorized)
        }
    }

    async fn load(&self, user_id: UserId) -> Result<DefaultCollection<PaymentOption>, ServiceError> {
        let stored = self.store.get_payment_options(user_id).await?;
        Ok(DefaultCollection::from_vec(stored))
    }

    async fn save(
        &self,
        user_id: UserId,
        vault: DefaultCollection<PaymentOption>,
    ) -> Result<Vec<PaymentOptionView>, ServiceError> {
        let options = vault.into_vec();
        self.store.save_payment_options(user_id, &options).await?;
        Ok(views(&options))
    }
}

fn views(options: &[PaymentOption]) -> Vec<PaymentOptionView> {
    options.iter().map(PaymentOptionView::from).collect()
}
