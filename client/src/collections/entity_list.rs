use std::sync::{
    atomic::AtomicBool, Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

use log::debug;

use ferry_shared::{CheckedSet, Entity};

use crate::{
    collections::{
        collection_change::CollectionChange,
        entity_source::{EntitySource, SourceChange},
        notifier::{Notifier, Observer, Subscription},
        update_guard::UpdateGuard,
    },
    entity::{EntityRef, EntitySet, EntitySetChange},
    error::{CollectionError, EntityListError},
};

pub type EntityListChange<E> = CollectionChange<EntityRef<E>>;

struct ListState<E: Entity> {
    source: Option<Box<dyn EntitySource<E>>>,
    // entities that logically belong to the list, visible or not
    membership: CheckedSet<EntityRef<E>>,
    items: Vec<EntityRef<E>>,
}

impl<E: Entity> ListState<E> {
    fn source_contains(&self, entity: &EntityRef<E>) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.contains(entity))
    }

    fn position(&self, entity: &EntityRef<E>) -> Option<usize> {
        self.items.iter().position(|item| item == entity)
    }

    /// Visible index for an entity sitting at `source_index` in the source:
    /// right after the nearest preceding source entity that is still shown.
    fn visible_index(&self, source_index: usize) -> usize {
        let Some(source) = self.source.as_ref() else {
            return self.items.len();
        };
        let snapshot = source.snapshot();
        snapshot[..source_index.min(snapshot.len())]
            .iter()
            .rev()
            .find_map(|entity| self.position(entity))
            .map_or(0, |at| at + 1)
    }

    fn reload(&mut self) {
        self.membership.clear();
        self.items.clear();
        let snapshot = self
            .source
            .as_ref()
            .map(|source| source.snapshot())
            .unwrap_or_default();
        for entity in snapshot {
            if self.membership.contains(&entity) {
                continue;
            }
            self.membership.insert(entity.clone());
            self.items.push(entity);
        }
    }

    fn insert_member(
        &mut self,
        index: usize,
        entity: &EntityRef<E>,
        events: &mut Vec<EntityListChange<E>>,
    ) {
        if self.membership.contains(entity) {
            return;
        }
        self.membership.insert(entity.clone());
        let at = index.min(self.items.len());
        self.items.insert(at, entity.clone());
        events.push(CollectionChange::added(at, entity.clone()));
    }

    fn remove_visible(
        &mut self,
        entity: &EntityRef<E>,
        events: &mut Vec<EntityListChange<E>>,
    ) -> Option<usize> {
        let at = self.position(entity)?;
        self.items.remove(at);
        events.push(CollectionChange::removed(at, entity.clone()));
        Some(at)
    }

    fn show_member(&mut self, entity: &EntityRef<E>, events: &mut Vec<EntityListChange<E>>) {
        if !self.membership.contains(entity) || self.position(entity).is_some() {
            return;
        }
        self.items.push(entity.clone());
        events.push(CollectionChange::added(self.items.len() - 1, entity.clone()));
    }
}

struct SourceLink<E: Entity> {
    list: Weak<EntityListInner<E>>,
}

impl<E: Entity> Observer<SourceChange<E>> for SourceLink<E> {
    fn notify(&self, change: &SourceChange<E>) {
        if let Some(list) = self.list.upgrade() {
            list.on_source_changed(change);
        }
    }
}

struct TrackedSetLink<E: Entity> {
    list: Weak<EntityListInner<E>>,
}

impl<E: Entity> Observer<EntitySetChange<E>> for TrackedSetLink<E> {
    fn notify(&self, change: &EntitySetChange<E>) {
        if let Some(list) = self.list.upgrade() {
            list.on_entity_set_changed(change);
        }
    }
}

struct EntityListInner<E: Entity> {
    entity_set: EntitySet<E>,
    state: RwLock<ListState<E>>,
    updating: AtomicBool,
    notifier: Notifier<EntityListChange<E>>,
    source_link: Arc<SourceLink<E>>,
    set_link: Arc<TrackedSetLink<E>>,
    source_subscription: Mutex<Option<Subscription>>,
    _set_subscription: Mutex<Option<Subscription>>,
}

impl<E: Entity> EntityListInner<E> {
    fn state(&self) -> RwLockReadGuard<'_, ListState<E>> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, ListState<E>> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_source_subscription(&self, subscription: Option<Subscription>) {
        let previous = {
            let mut slot = self
                .source_subscription
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *slot, subscription)
        };
        drop(previous);
    }

    fn publish(&self, events: Vec<EntityListChange<E>>) {
        for event in events {
            self.notifier.notify(&event);
        }
    }

    fn rebind(&self, source: Option<Box<dyn EntitySource<E>>>) -> Result<(), EntityListError> {
        let Some(_guard) = UpdateGuard::enter(&self.updating) else {
            return Err(EntityListError::UpdateInProgress);
        };

        self.set_source_subscription(None);

        let link: Weak<dyn Observer<SourceChange<E>>> =
            Arc::downgrade(&self.source_link) as Weak<dyn Observer<SourceChange<E>>>;
        let subscription = source.as_ref().and_then(|source| source.subscribe(link));
        {
            let mut state = self.state_mut();
            state.source = source;
            state.reload();
        }
        self.set_source_subscription(subscription);

        self.notifier.notify(&CollectionChange::Reset);
        Ok(())
    }

    fn on_source_changed(&self, change: &SourceChange<E>) {
        let Some(_guard) = UpdateGuard::enter(&self.updating) else {
            debug!("Ignoring source change raised while the entity list is propagating");
            return;
        };

        let mut events = Vec::new();
        {
            let mut state = self.state_mut();
            match change {
                CollectionChange::Add { index, items } => {
                    for (offset, entity) in items.iter().enumerate() {
                        let at = state.visible_index(index + offset);
                        state.insert_member(at, entity, &mut events);
                    }
                }
                CollectionChange::Remove { items, .. } => {
                    for entity in items {
                        // a duplicate may still be present in the source
                        if state.source_contains(entity) {
                            continue;
                        }
                        if state.membership.contains(entity) {
                            state.membership.remove(entity);
                        }
                        state.remove_visible(entity, &mut events);
                    }
                }
                CollectionChange::Replace {
                    index,
                    old_items,
                    new_items,
                } => {
                    for entity in old_items {
                        if state.source_contains(entity) {
                            continue;
                        }
                        if state.membership.contains(entity) {
                            state.membership.remove(entity);
                        }
                        state.remove_visible(entity, &mut events);
                    }
                    for (offset, entity) in new_items.iter().enumerate() {
                        let at = state.visible_index(index + offset);
                        state.insert_member(at, entity, &mut events);
                    }
                }
                CollectionChange::Reset => {
                    state.reload();
                    events.push(CollectionChange::Reset);
                }
            }
        }
        self.publish(events);
    }

    fn on_entity_set_changed(&self, change: &EntitySetChange<E>) {
        let Some(_guard) = UpdateGuard::enter(&self.updating) else {
            debug!("Ignoring entity set change raised by this entity list's own propagation");
            return;
        };

        let mut events = Vec::new();
        match change {
            CollectionChange::Add { items, .. } => {
                let mut state = self.state_mut();
                for entity in items {
                    state.show_member(entity, &mut events);
                }
            }
            CollectionChange::Remove { items, .. } => {
                let mut state = self.state_mut();
                for entity in items {
                    state.remove_visible(entity, &mut events);
                }
            }
            CollectionChange::Replace {
                old_items,
                new_items,
                ..
            } => {
                let mut state = self.state_mut();
                for entity in old_items {
                    state.remove_visible(entity, &mut events);
                }
                for entity in new_items {
                    state.show_member(entity, &mut events);
                }
            }
            CollectionChange::Reset => {
                let tracked = self.entity_set.to_vec();
                let mut state = self.state_mut();
                state.items.retain(|entity| tracked.contains(entity));
                for entity in &tracked {
                    if state.membership.contains(entity) && state.position(entity).is_none() {
                        state.items.push(entity.clone());
                    }
                }
                events.push(CollectionChange::Reset);
            }
        }
        self.publish(events);
    }

    fn insert(&self, index: usize, entity: &EntityRef<E>) -> Result<usize, EntityListError> {
        let Some(_guard) = UpdateGuard::enter(&self.updating) else {
            return Err(EntityListError::UpdateInProgress);
        };

        {
            let state = self.state();
            if state.position(entity).is_some() {
                return Err(EntityListError::DuplicateEntity);
            }
            if index > state.items.len() {
                return Err(CollectionError::IndexOutOfBounds {
                    index,
                    len: state.items.len(),
                }
                .into());
            }
        }

        if !self.entity_set.contains(entity) {
            self.entity_set.add(entity)?;
        }

        let at = {
            let mut state = self.state_mut();
            if !state.membership.contains(entity) {
                state.membership.insert(entity.clone());
            }
            let at = index.min(state.items.len());
            state.items.insert(at, entity.clone());
            at
        };
        self.notifier
            .notify(&CollectionChange::added(at, entity.clone()));
        Ok(at)
    }

    fn remove_at(&self, index: usize) -> Result<EntityRef<E>, EntityListError> {
        let Some(_guard) = UpdateGuard::enter(&self.updating) else {
            return Err(EntityListError::UpdateInProgress);
        };

        let entity = {
            let state = self.state();
            state
                .items
                .get(index)
                .cloned()
                .ok_or(CollectionError::IndexOutOfBounds {
                    index,
                    len: state.items.len(),
                })?
        };

        if self.entity_set.contains(&entity) {
            self.entity_set.remove(&entity)?;
        }

        let at = {
            let mut state = self.state_mut();
            let at = state.position(&entity).unwrap_or(index);
            state.items.remove(at);
            // members that came through the source stay members so that an
            // undone removal can surface again
            if state.membership.contains(&entity) && !state.source_contains(&entity) {
                state.membership.remove(&entity);
            }
            at
        };
        self.notifier
            .notify(&CollectionChange::removed(at, entity.clone()));
        Ok(entity)
    }

    fn clear(&self) -> Result<(), EntityListError> {
        let Some(_guard) = UpdateGuard::enter(&self.updating) else {
            return Err(EntityListError::UpdateInProgress);
        };

        let items = self.state().items.clone();
        for entity in &items {
            if self.entity_set.contains(entity) {
                self.entity_set.remove(entity)?;
            }
        }

        {
            let mut state = self.state_mut();
            state.items.clear();
            for entity in &items {
                if state.membership.contains(entity) && !state.source_contains(entity) {
                    state.membership.remove(entity);
                }
            }
        }
        self.notifier.notify(&CollectionChange::Reset);
        Ok(())
    }
}

/// An observable list kept consistent with a tracked [`EntitySet`] and an
/// optional external [`EntitySource`].
///
/// * Source changes are mirrored into the list.
/// * Entities inserted into the list join the tracked set if they are not
///   tracked yet; entities removed from the list leave it.
/// * Tracked-set changes are mirrored into the list only for entities that
///   belong to the list, so an undone removal reappears while unrelated
///   additions to the set do not.
///
/// Propagations are guarded per list: a change notification caused by the
/// list's own propagation is ignored rather than processed recursively.
///
/// The list holds the tracked set strongly and is observed weakly by it and
/// by its source. Dropping the last handle releases both subscriptions.
pub struct EntityList<E: Entity> {
    inner: Arc<EntityListInner<E>>,
}

impl<E: Entity> EntityList<E> {
    pub fn new(entity_set: &EntitySet<E>) -> Self {
        let inner = Arc::new_cyclic(|list: &Weak<EntityListInner<E>>| EntityListInner {
            entity_set: entity_set.clone(),
            state: RwLock::new(ListState {
                source: None,
                membership: CheckedSet::new(),
                items: Vec::new(),
            }),
            updating: AtomicBool::new(false),
            notifier: Notifier::new(),
            source_link: Arc::new(SourceLink { list: list.clone() }),
            set_link: Arc::new(TrackedSetLink { list: list.clone() }),
            source_subscription: Mutex::new(None),
            _set_subscription: Mutex::new(None),
        });

        let link: Weak<dyn Observer<EntitySetChange<E>>> =
            Arc::downgrade(&inner.set_link) as Weak<dyn Observer<EntitySetChange<E>>>;
        let subscription = entity_set.subscribe_weak(link);
        *inner
            ._set_subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(subscription);

        Self { inner }
    }

    pub fn with_source(
        entity_set: &EntitySet<E>,
        source: impl EntitySource<E> + 'static,
    ) -> Result<Self, EntityListError> {
        let list = Self::new(entity_set);
        list.set_source(source)?;
        Ok(list)
    }

    pub fn entity_set(&self) -> &EntitySet<E> {
        &self.inner.entity_set
    }

    // Source

    /// Binds a new source, replacing the list contents with the source's
    /// current contents.
    pub fn set_source(&self, source: impl EntitySource<E> + 'static) -> Result<(), EntityListError> {
        self.inner.rebind(Some(Box::new(source)))
    }

    /// Unbinds the source and empties the list.
    pub fn clear_source(&self) -> Result<(), EntityListError> {
        self.inner.rebind(None)
    }

    pub fn has_source(&self) -> bool {
        self.inner.state().source.is_some()
    }

    // Queries

    pub fn len(&self) -> usize {
        self.inner.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state().items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<EntityRef<E>> {
        self.inner.state().items.get(index).cloned()
    }

    pub fn contains(&self, entity: &EntityRef<E>) -> bool {
        self.inner.state().position(entity).is_some()
    }

    pub fn index_of(&self, entity: &EntityRef<E>) -> Option<usize> {
        self.inner.state().position(entity)
    }

    pub fn to_vec(&self) -> Vec<EntityRef<E>> {
        self.inner.state().items.clone()
    }

    /// Whether the entity logically belongs to this list, visible or not.
    pub fn is_member(&self, entity: &EntityRef<E>) -> bool {
        self.inner.state().membership.contains(entity)
    }

    pub fn member_count(&self) -> usize {
        self.inner.state().membership.len()
    }

    // Mutations

    pub fn add(&self, entity: &EntityRef<E>) -> Result<(), EntityListError> {
        let len = self.len();
        self.inner.insert(len, entity).map(|_| ())
    }

    pub fn insert(&self, index: usize, entity: &EntityRef<E>) -> Result<(), EntityListError> {
        self.inner.insert(index, entity).map(|_| ())
    }

    pub fn remove(&self, entity: &EntityRef<E>) -> Result<(), EntityListError> {
        let index = self
            .index_of(entity)
            .ok_or(EntityListError::Collection(CollectionError::ItemNotFound))?;
        self.inner.remove_at(index).map(|_| ())
    }

    pub fn remove_at(&self, index: usize) -> Result<EntityRef<E>, EntityListError> {
        self.inner.remove_at(index)
    }

    /// Removes every visible entity, propagating each removal to the
    /// tracked set, and raises a single `Reset`.
    pub fn clear(&self) -> Result<(), EntityListError> {
        self.inner.clear()
    }

    // Notifications

    pub fn subscribe<O: Observer<EntityListChange<E>> + 'static>(
        &self,
        observer: &Arc<O>,
    ) -> Subscription {
        self.inner.notifier.subscribe(observer)
    }
}

impl<E: Entity> Clone for EntityList<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
