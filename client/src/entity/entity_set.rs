use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak},
};

use log::{debug, warn};

use ferry_shared::Entity;

use crate::{
    collections::{CollectionChange, Notifier, Observer, Subscription},
    entity::{
        change_set::EntityChangeSet, entity_ref::EntityRef, entity_state::EntityState,
        load_behavior::LoadBehavior,
    },
    error::EntitySetError,
};

pub type EntitySetChange<E> = CollectionChange<EntityRef<E>>;

struct EntitySetState<E: Entity> {
    // contained entities in the order they joined the set
    entities: Vec<EntityRef<E>>,
    contained: HashSet<EntityRef<E>>,
    // server-known instances by key, including pending deletes
    identity_map: HashMap<E::Key, EntityRef<E>>,
    pending_deletes: Vec<EntityRef<E>>,
}

impl<E: Entity> EntitySetState<E> {
    fn new() -> Self {
        Self {
            entities: Vec::new(),
            contained: HashSet::new(),
            identity_map: HashMap::new(),
            pending_deletes: Vec::new(),
        }
    }

    fn push(&mut self, entity: EntityRef<E>) -> usize {
        self.contained.insert(entity.clone());
        self.entities.push(entity);
        self.entities.len() - 1
    }

    fn take(&mut self, entity: &EntityRef<E>) -> Option<usize> {
        let index = self.entities.iter().position(|candidate| candidate == entity)?;
        self.entities.remove(index);
        self.contained.remove(entity);
        Some(index)
    }

    fn take_pending_delete(&mut self, entity: &EntityRef<E>) -> bool {
        match self
            .pending_deletes
            .iter()
            .position(|candidate| candidate == entity)
        {
            Some(index) => {
                self.pending_deletes.remove(index);
                true
            }
            None => false,
        }
    }

    fn forget_key(&mut self, entity: &EntityRef<E>) {
        let key = entity.key();
        if self
            .identity_map
            .get(&key)
            .is_some_and(|cached| cached == entity)
        {
            self.identity_map.remove(&key);
        }
    }
}

struct EntitySetInner<E: Entity> {
    state: RwLock<EntitySetState<E>>,
    notifier: Notifier<EntitySetChange<E>>,
}

/// The tracked set: every entity the runtime currently knows about, with
/// their pending changes.
///
/// A set is shared by every list bound to it; cloning yields another handle.
/// Change notifications are raised after the internal lock is released, so
/// observers may call straight back into the set.
pub struct EntitySet<E: Entity> {
    inner: Arc<EntitySetInner<E>>,
}

impl<E: Entity> EntitySet<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EntitySetInner {
                state: RwLock::new(EntitySetState::new()),
                notifier: Notifier::new(),
            }),
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, EntitySetState<E>> {
        self.inner
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, EntitySetState<E>> {
        self.inner
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, change: EntitySetChange<E>) {
        self.inner.notifier.notify(&change);
    }

    // Membership

    pub fn contains(&self, entity: &EntityRef<E>) -> bool {
        self.state().contained.contains(entity)
    }

    pub fn len(&self) -> usize {
        self.state().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entities.is_empty()
    }

    pub fn to_vec(&self) -> Vec<EntityRef<E>> {
        self.state().entities.clone()
    }

    /// Looks up a contained, server-known entity by key.
    pub fn find(&self, key: &E::Key) -> Option<EntityRef<E>> {
        let state = self.state();
        state
            .identity_map
            .get(key)
            .filter(|entity| state.contained.contains(*entity))
            .cloned()
    }

    /// Adds an entity for insertion on the next submission. Adding an entity
    /// whose deletion is still pending undoes the deletion instead.
    pub fn add(&self, entity: &EntityRef<E>) -> Result<(), EntitySetError> {
        let index = {
            let mut state = self.state_mut();
            if state.contained.contains(entity) {
                return Err(EntitySetError::AlreadyInSet);
            }
            let current = entity.state();
            if current == EntityState::Detached {
                entity.set_state(EntityState::New);
            } else if current == EntityState::Deleted && state.take_pending_delete(entity) {
                entity.restore_from_delete();
            } else {
                return Err(EntitySetError::TrackedElsewhere {
                    state: current.as_str(),
                });
            }
            state.push(entity.clone())
        };
        self.notify(CollectionChange::added(index, entity.clone()));
        Ok(())
    }

    /// Removes an entity. A new entity simply leaves the set; anything the
    /// server knows becomes a pending deletion.
    pub fn remove(&self, entity: &EntityRef<E>) -> Result<(), EntitySetError> {
        let index = {
            let mut state = self.state_mut();
            let index = state.take(entity).ok_or(EntitySetError::NotInSet)?;
            if entity.state() == EntityState::New {
                entity.set_state(EntityState::Detached);
            } else {
                entity.set_state(EntityState::Deleted);
                state.pending_deletes.push(entity.clone());
            }
            index
        };
        self.notify(CollectionChange::removed(index, entity.clone()));
        Ok(())
    }

    /// Starts tracking an entity the server already knows, with no pending
    /// change.
    pub fn attach(&self, entity: &EntityRef<E>) -> Result<(), EntitySetError> {
        let index = {
            let mut state = self.state_mut();
            if state.contained.contains(entity) {
                return Err(EntitySetError::AlreadyInSet);
            }
            let current = entity.state();
            if current != EntityState::Detached {
                return Err(EntitySetError::TrackedElsewhere {
                    state: current.as_str(),
                });
            }
            let key = entity.key();
            if state.identity_map.contains_key(&key) {
                return Err(EntitySetError::DuplicateKey {
                    key: format!("{:?}", key),
                });
            }
            entity.set_state(EntityState::Unmodified);
            state.identity_map.insert(key, entity.clone());
            state.push(entity.clone())
        };
        self.notify(CollectionChange::added(index, entity.clone()));
        Ok(())
    }

    /// Stops tracking an entity without scheduling anything for submission.
    pub fn detach(&self, entity: &EntityRef<E>) -> Result<(), EntitySetError> {
        let removed_index = {
            let mut state = self.state_mut();
            let index = state.take(entity);
            if index.is_none() && !state.take_pending_delete(entity) {
                return Err(EntitySetError::NotInSet);
            }
            state.forget_key(entity);
            entity.set_state(EntityState::Detached);
            index
        };
        if let Some(index) = removed_index {
            self.notify(CollectionChange::removed(index, entity.clone()));
        }
        Ok(())
    }

    /// Merges loaded values into the set by key and returns the cached
    /// instance for every loaded value, in load order.
    pub fn load(&self, loaded: Vec<E>, behavior: LoadBehavior) -> Vec<EntityRef<E>> {
        let mut results = Vec::with_capacity(loaded.len());
        let mut added = Vec::new();
        let first_index = {
            let mut state = self.state_mut();
            let first_index = state.entities.len();
            for value in loaded {
                let key = value.key();
                if let Some(cached) = state.identity_map.get(&key).cloned() {
                    cached.merge_loaded(value, behavior);
                    results.push(cached);
                    continue;
                }
                let entity = EntityRef::new(value);
                entity.set_state(EntityState::Unmodified);
                state.identity_map.insert(key, entity.clone());
                state.push(entity.clone());
                added.push(entity.clone());
                results.push(entity);
            }
            first_index
        };
        debug!(
            "Loaded {} entities into entity set ({} new)",
            results.len(),
            added.len()
        );
        if !added.is_empty() {
            self.notify(CollectionChange::Add {
                index: first_index,
                items: added,
            });
        }
        results
    }

    // Change tracking

    pub fn get_changes(&self) -> EntityChangeSet<E> {
        let state = self.state();
        let mut added = Vec::new();
        let mut modified = Vec::new();
        for entity in &state.entities {
            match entity.state() {
                EntityState::New => added.push(entity.clone()),
                EntityState::Modified => modified.push(entity.clone()),
                EntityState::Unmodified if entity.pending_action().is_some() => {
                    modified.push(entity.clone())
                }
                _ => {}
            }
        }
        EntityChangeSet::new(added, modified, state.pending_deletes.clone())
    }

    pub fn has_changes(&self) -> bool {
        let state = self.state();
        !state.pending_deletes.is_empty() || state.entities.iter().any(EntityRef::has_changes)
    }

    /// Marks a submitted changeset as persisted.
    pub fn accept_changes(&self, change_set: &EntityChangeSet<E>) {
        let mut state = self.state_mut();
        for entity in change_set.added() {
            entity.accept_changes();
            let key = entity.key();
            if state.identity_map.contains_key(&key) {
                warn!(
                    "Inserted entity with key {:?} collides with a cached instance; keeping the cached one in the identity map",
                    key
                );
            } else {
                state.identity_map.insert(key, entity.clone());
            }
        }
        for entity in change_set.modified() {
            entity.accept_changes();
        }
        for entity in change_set.removed() {
            state.take_pending_delete(entity);
            state.forget_key(entity);
            entity.accept_changes();
        }
    }

    /// Undoes every pending change: new entities leave the set, edits are
    /// rolled back, and pending deletions rejoin the set.
    pub fn reject_changes(&self) {
        let mut changes = Vec::new();
        {
            let mut state = self.state_mut();
            let new_entities: Vec<EntityRef<E>> = state
                .entities
                .iter()
                .filter(|entity| entity.state() == EntityState::New)
                .cloned()
                .collect();
            for entity in new_entities {
                if let Some(index) = state.take(&entity) {
                    entity.reject_edits();
                    entity.set_state(EntityState::Detached);
                    changes.push(CollectionChange::removed(index, entity));
                }
            }
            for entity in &state.entities {
                entity.reject_edits();
            }
            let deleted = std::mem::take(&mut state.pending_deletes);
            for entity in deleted {
                entity.reject_edits();
                entity.restore_from_delete();
                let index = state.push(entity.clone());
                changes.push(CollectionChange::added(index, entity));
            }
        }
        for change in changes {
            self.notify(change);
        }
    }

    /// Detaches everything and raises a single `Reset`.
    pub fn clear(&self) {
        {
            let mut state = self.state_mut();
            for entity in state.entities.iter().chain(state.pending_deletes.iter()) {
                entity.set_state(EntityState::Detached);
            }
            *state = EntitySetState::new();
        }
        self.notify(CollectionChange::Reset);
    }

    // Notifications

    pub fn subscribe<O: Observer<EntitySetChange<E>> + 'static>(
        &self,
        observer: &Arc<O>,
    ) -> Subscription {
        self.inner.notifier.subscribe(observer)
    }

    pub(crate) fn subscribe_weak(
        &self,
        observer: Weak<dyn Observer<EntitySetChange<E>>>,
    ) -> Subscription {
        self.inner.notifier.subscribe_weak(observer)
    }

    #[cfg(test)]
    pub(crate) fn notifier(&self) -> &Notifier<EntitySetChange<E>> {
        &self.inner.notifier
    }
}

impl<E: Entity> Default for EntitySet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for EntitySet<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
