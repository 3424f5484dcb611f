use ferry_shared::{Entity, EntityOperationType};

use crate::entity::entity_ref::EntityRef;

/// Snapshot of the pending changes in a tracked set.
pub struct EntityChangeSet<E: Entity> {
    added: Vec<EntityRef<E>>,
    modified: Vec<EntityRef<E>>,
    removed: Vec<EntityRef<E>>,
}

impl<E: Entity> EntityChangeSet<E> {
    pub fn new(
        added: Vec<EntityRef<E>>,
        modified: Vec<EntityRef<E>>,
        removed: Vec<EntityRef<E>>,
    ) -> Self {
        Self {
            added,
            modified,
            removed,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn added(&self) -> &[EntityRef<E>] {
        &self.added
    }

    pub fn modified(&self) -> &[EntityRef<E>] {
        &self.modified
    }

    pub fn removed(&self) -> &[EntityRef<E>] {
        &self.removed
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, entity: &EntityRef<E>) -> bool {
        self.iter().any(|(_, candidate)| candidate == entity)
    }

    /// Every entity paired with the kind of operation it will be submitted
    /// as, in insert / update / delete order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityOperationType, &EntityRef<E>)> + '_ {
        let added = self
            .added
            .iter()
            .map(|entity| (EntityOperationType::Insert, entity));
        let modified = self.modified.iter().map(|entity| {
            let operation = if entity.original().is_none() && entity.pending_action().is_some() {
                EntityOperationType::Custom
            } else {
                EntityOperationType::Update
            };
            (operation, entity)
        });
        let removed = self
            .removed
            .iter()
            .map(|entity| (EntityOperationType::Delete, entity));
        added.chain(modified).chain(removed)
    }
}

impl<E: Entity> Clone for EntityChangeSet<E> {
    fn clone(&self) -> Self {
        Self {
            added: self.added.clone(),
            modified: self.modified.clone(),
            removed: self.removed.clone(),
        }
    }
}

impl<E: Entity> std::fmt::Debug for EntityChangeSet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityChangeSet")
            .field("added", &self.added.len())
            .field("modified", &self.modified.len())
            .field("removed", &self.removed.len())
            .finish()
    }
}
