//! Owned lists with at most one default element.
//!
//! The address book and the payment vault are both per-user lists where at
//! most one element carries `is_default = true`, and exactly one does whenever
//! the list is non-empty. [`DefaultCollection`] owns that rule so neither
//! service re-implements it:
//!
//! - adding to an empty list forces the new element to be the default
//! - asking for a new default clears the flag everywhere else first
//! - the default can be moved but never cleared in place
//! - removing the default promotes the first remaining element

use core::fmt;

use thiserror::Error;

/// Access to an element's identity and default flag.
pub trait DefaultFlag {
    /// Element identifier type.
    type Id: Copy + Eq + fmt::Debug;

    /// The element's ID.
    fn id(&self) -> Self::Id;

    /// Whether the element is currently the default.
    fn is_default(&self) -> bool;

    /// Set or clear the default flag.
    fn set_default(&mut self, is_default: bool);
}

/// Errors from collection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// No element has the requested ID.
    #[error("element not found")]
    NotFound,
}

/// A list that keeps the "exactly one default when non-empty" invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultCollection<T> {
    items: Vec<T>,
}

impl<T> Default for DefaultCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: DefaultFlag> DefaultCollection<T> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap stored elements, repairing the invariant if the data violates it.
    ///
    /// The first flagged element keeps the flag; if none is flagged the first
    /// element becomes the default.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        let mut collection = Self { items };
        collection.repair();
        collection
    }

    /// Borrow the elements in insertion order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Take the elements out.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find an element by ID.
    #[must_use]
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// The current default element.
    #[must_use]
    pub fn default_item(&self) -> Option<&T> {
        self.items.iter().find(|item| item.is_default())
    }

    /// Insert an element, returning its ID.
    ///
    /// The element becomes the default if the list was empty or
    /// `want_default` is set; otherwise it is inserted as non-default
    /// regardless of its own flag.
    pub fn add(&mut self, mut item: T, want_default: bool) -> T::Id {
        let make_default = want_default || self.items.is_empty();
        if make_default {
            self.clear_defaults();
        }
        item.set_default(make_default);

        let id = item.id();
        self.items.push(item);
        id
    }

    /// Apply `patch` to the element with `id`.
    ///
    /// `make_default = Some(true)` moves the default to this element.
    /// `Some(false)` on the current default is ignored, since the list would
    /// otherwise be left without one. The patch itself cannot change the flag.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::NotFound` if no element has `id`.
    pub fn update<F>(&mut self, id: T::Id, make_default: Option<bool>, patch: F) -> Result<(), CollectionError>
    where
        F: FnOnce(&mut T),
    {
        let position = self.position(id).ok_or(CollectionError::NotFound)?;

        if make_default == Some(true) {
            self.clear_defaults();
        }

        let item = self
            .items
            .get_mut(position)
            .ok_or(CollectionError::NotFound)?;
        let was_default = item.is_default();
        patch(item);
        item.set_default(was_default || make_default == Some(true));

        Ok(())
    }

    /// Remove the element with `id`, promoting a new default if needed.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::NotFound` if no element has `id`.
    pub fn remove(&mut self, id: T::Id) -> Result<T, CollectionError> {
        let position = self.position(id).ok_or(CollectionError::NotFound)?;
        let removed = self.items.remove(position);

        if removed.is_default()
            && let Some(first) = self.items.first_mut()
        {
            first.set_default(true);
        }

        Ok(removed)
    }

    fn position(&self, id: T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    fn clear_defaults(&mut self) {
        for item in &mut self.items {
            item.set_default(false);
        }
    }

    fn repair(&mut self) {
        let mut seen = false;
        for item in &mut self.items {
            if item.is_default() {
                if seen {
                    item.set_default(false);
                }
                seen = true;
            }
        }
        if !seen && let Some(first) = self.items.first_mut() {
            first.set_default(true);
        }
    }
}
