use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    collections::{
        collection_change::CollectionChange,
        notifier::{Notifier, Observer, Subscription},
    },
    error::CollectionError,
};

struct ObservableInner<T> {
    items: RwLock<Vec<T>>,
    notifier: Notifier<CollectionChange<T>>,
}

/// An ordered list that raises a [`CollectionChange`] for every mutation.
///
/// Cloning yields another handle to the same list.
pub struct ObservableCollection<T> {
    inner: Arc<ObservableInner<T>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ObservableCollection<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                items: RwLock::new(items),
                notifier: Notifier::new(),
            }),
        }
    }

    fn items(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.inner
            .items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn items_mut(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.inner
            .items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Queries

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items().get(index).cloned()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items().contains(item)
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items().iter().position(|existing| existing == item)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items().clone()
    }

    // Mutations

    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.items_mut();
            items.push(item.clone());
            items.len() - 1
        };
        self.inner.notifier.notify(&CollectionChange::added(index, item));
    }

    pub fn insert(&self, index: usize, item: T) -> Result<(), CollectionError> {
        {
            let mut items = self.items_mut();
            if index > items.len() {
                return Err(CollectionError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, item.clone());
        }
        self.inner.notifier.notify(&CollectionChange::added(index, item));
        Ok(())
    }

    pub fn extend(&self, new_items: Vec<T>) {
        if new_items.is_empty() {
            return;
        }
        let index = {
            let mut items = self.items_mut();
            let index = items.len();
            items.extend(new_items.iter().cloned());
            index
        };
        self.inner.notifier.notify(&CollectionChange::Add {
            index,
            items: new_items,
        });
    }

    pub fn remove_at(&self, index: usize) -> Result<T, CollectionError> {
        let item = {
            let mut items = self.items_mut();
            if index >= items.len() {
                return Err(CollectionError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index)
        };
        self.inner
            .notifier
            .notify(&CollectionChange::removed(index, item.clone()));
        Ok(item)
    }

    pub fn remove(&self, item: &T) -> Result<(), CollectionError> {
        let index = self.index_of(item).ok_or(CollectionError::ItemNotFound)?;
        self.remove_at(index).map(|_| ())
    }

    pub fn replace(&self, index: usize, item: T) -> Result<T, CollectionError> {
        let old_item = {
            let mut items = self.items_mut();
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(CollectionError::IndexOutOfBounds { index, len })?;
            std::mem::replace(slot, item.clone())
        };
        self.inner
            .notifier
            .notify(&CollectionChange::replaced(index, old_item.clone(), item));
        Ok(old_item)
    }

    pub fn clear(&self) {
        self.items_mut().clear();
        self.inner.notifier.notify(&CollectionChange::Reset);
    }

    /// Replaces the whole contents, raising a single `Reset`.
    pub fn reset(&self, items: Vec<T>) {
        *self.items_mut() = items;
        self.inner.notifier.notify(&CollectionChange::Reset);
    }

    // Notifications

    pub fn subscribe<O: Observer<CollectionChange<T>> + 'static>(
        &self,
        observer: &Arc<O>,
    ) -> Subscription {
        self.inner.notifier.subscribe(observer)
    }

    pub(crate) fn notifier(&self) -> &Notifier<CollectionChange<T>> {
        &self.inner.notifier
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Default for ObservableCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ObservableCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
