use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use ferry_shared::{Entity, EntityAction, EntityConflict, ValidationResult};

use crate::{
    entity::{entity_state::EntityState, load_behavior::LoadBehavior},
    error::EntityError,
};

struct EntityData<E: Entity> {
    current: E,
    original: Option<E>,
    state: EntityState,
    action: Option<EntityAction>,
    validation_errors: Vec<ValidationResult>,
    conflict: Option<EntityConflict<E>>,
    submitting: bool,
}

/// Shared handle to one client-side entity instance.
///
/// Handles compare and hash by identity: two handles are equal only when
/// they point at the same instance, regardless of the values inside. This is
/// what lets the tracked set, the entity lists and the changeset correlator
/// agree on "the same entity" while its values change.
pub struct EntityRef<E: Entity> {
    data: Arc<RwLock<EntityData<E>>>,
}

impl<E: Entity> EntityRef<E> {
    /// Wraps a fresh, untracked entity.
    pub fn new(entity: E) -> Self {
        Self {
            data: Arc::new(RwLock::new(EntityData {
                current: entity,
                original: None,
                state: EntityState::Detached,
                action: None,
                validation_errors: Vec::new(),
                conflict: None,
                submitting: false,
            })),
        }
    }

    // Every write below is a plain field assignment, so a poisoned lock still
    // guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, EntityData<E>> {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntityData<E>> {
        self.data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Values

    pub fn get(&self) -> E {
        self.read().current.clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.read().current)
    }

    pub fn key(&self) -> E::Key {
        self.read().current.key()
    }

    /// Values as last accepted from the server, present while modified.
    pub fn original(&self) -> Option<E> {
        self.read().original.clone()
    }

    pub fn state(&self) -> EntityState {
        self.read().state
    }

    pub fn has_changes(&self) -> bool {
        let data = self.read();
        match data.state {
            EntityState::New | EntityState::Modified | EntityState::Deleted => true,
            EntityState::Unmodified => data.action.is_some(),
            EntityState::Detached => false,
        }
    }

    /// Applies `f` to the current values, moving an unmodified entity to
    /// `Modified` and remembering its original values.
    pub fn edit(&self, f: impl FnOnce(&mut E)) -> Result<(), EntityError> {
        let mut data = self.write();
        if data.submitting {
            return Err(EntityError::Submitting { operation: "edit" });
        }
        match data.state {
            EntityState::Deleted => {
                return Err(EntityError::EntityDeleted { operation: "edit" });
            }
            EntityState::Unmodified => {
                data.original = Some(data.current.clone());
                data.state = EntityState::Modified;
            }
            EntityState::Detached | EntityState::New | EntityState::Modified => {}
        }
        f(&mut data.current);
        Ok(())
    }

    /// Schedules a custom action to run against this entity on the next
    /// submission. Only one action can be pending at a time; a second call
    /// replaces the first.
    pub fn invoke_action(&self, name: impl Into<String>) -> Result<(), EntityError> {
        let name = name.into();
        let mut data = self.write();
        if data.submitting {
            return Err(EntityError::Submitting {
                operation: "invoke an action on",
            });
        }
        match data.state {
            EntityState::Unmodified | EntityState::Modified => {
                data.action = Some(EntityAction::new(name));
                Ok(())
            }
            state => Err(EntityError::ActionNotAllowed {
                action: name,
                state: state.as_str(),
            }),
        }
    }

    pub fn pending_action(&self) -> Option<EntityAction> {
        self.read().action.clone()
    }

    // Submission outcome

    pub fn validation_errors(&self) -> Vec<ValidationResult> {
        self.read().validation_errors.clone()
    }

    pub fn has_validation_errors(&self) -> bool {
        !self.read().validation_errors.is_empty()
    }

    pub fn conflict(&self) -> Option<EntityConflict<E>> {
        self.read().conflict.clone()
    }

    pub fn has_conflict(&self) -> bool {
        self.read().conflict.is_some()
    }

    /// True while a submission carrying this entity is in flight. Edits and
    /// actions are refused until it completes or is canceled.
    pub fn is_submitting(&self) -> bool {
        self.read().submitting
    }

    /// Accepts the store's values as the new baseline so that the local
    /// edits can be resubmitted over them.
    pub fn resolve_conflict(&self) -> Result<(), EntityError> {
        let mut data = self.write();
        let conflict = data.conflict.take().ok_or(EntityError::NoConflict)?;
        let Some(store_entity) = conflict.store_entity().cloned() else {
            data.conflict = Some(conflict);
            return Err(EntityError::ConflictNotResolvable);
        };
        data.original = Some(store_entity);
        if data.state == EntityState::Unmodified {
            data.state = EntityState::Modified;
        }
        Ok(())
    }

    /// True when both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    // Tracked set transitions

    pub(crate) fn set_state(&self, state: EntityState) {
        self.write().state = state;
    }

    /// State an entity returns to when a pending deletion is undone.
    pub(crate) fn restore_from_delete(&self) {
        let mut data = self.write();
        data.state = if data.original.is_some() {
            EntityState::Modified
        } else {
            EntityState::Unmodified
        };
    }

    pub(crate) fn accept_changes(&self) {
        let mut data = self.write();
        data.original = None;
        data.action = None;
        data.validation_errors.clear();
        data.conflict = None;
        data.state = match data.state {
            EntityState::Deleted | EntityState::Detached => EntityState::Detached,
            _ => EntityState::Unmodified,
        };
    }

    /// Rolls back local edits and pending actions. The tracked set decides
    /// what happens to `New` and `Deleted` entities.
    pub(crate) fn reject_edits(&self) {
        let mut data = self.write();
        if let Some(original) = data.original.take() {
            data.current = original;
        }
        data.action = None;
        data.validation_errors.clear();
        data.conflict = None;
        if data.state == EntityState::Modified {
            data.state = EntityState::Unmodified;
        }
    }

    pub(crate) fn merge_loaded(&self, loaded: E, behavior: LoadBehavior) {
        let mut data = self.write();
        match (behavior, data.state) {
            (LoadBehavior::KeepCurrent, _) => {}
            (_, EntityState::Deleted) | (_, EntityState::Detached) | (_, EntityState::New) => {}
            (LoadBehavior::MergeIntoCurrent, EntityState::Unmodified) => {
                data.current = loaded;
            }
            (LoadBehavior::MergeIntoCurrent, EntityState::Modified) => {
                data.original = Some(loaded);
            }
            (LoadBehavior::RefreshCurrent, _) => {
                data.current = loaded;
                data.original = None;
                data.action = None;
                data.state = EntityState::Unmodified;
            }
        }
    }

    /// Takes server-generated values after a successful submission.
    pub(crate) fn apply_server_values(&self, entity: E) {
        self.write().current = entity;
    }

    pub(crate) fn set_submit_errors(
        &self,
        validation_errors: Vec<ValidationResult>,
        conflict: Option<EntityConflict<E>>,
    ) {
        let mut data = self.write();
        data.validation_errors = validation_errors;
        data.conflict = conflict;
    }

    pub(crate) fn clear_submit_errors(&self) {
        let mut data = self.write();
        data.validation_errors.clear();
        data.conflict = None;
    }

    pub(crate) fn set_submitting(&self, submitting: bool) {
        self.write().submitting = submitting;
    }
}

impl<E: Entity> Clone for EntityRef<E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

impl<E: Entity> PartialEq for EntityRef<E> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<E: Entity> Eq for EntityRef<E> {}

impl<E: Entity> Hash for EntityRef<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.data) as *const () as usize).hash(state);
    }
}

impl<E: Entity> fmt::Debug for EntityRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        f.debug_struct("EntityRef")
            .field("state", &data.state)
            .field("current", &data.current)
            .finish()
    }
}
