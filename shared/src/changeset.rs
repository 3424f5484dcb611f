use std::fmt;

use crate::{Entity, EntityAction, ValidationResult};

/// Identifies one entry within a single submission. Unique per submission
/// only; two submissions may reuse the same ids.
pub type CorrelationId = u32;

/// Hands out monotonically increasing correlation ids for one submission.
#[derive(Debug, Default, Clone, Copy)]
pub struct CorrelationIdGenerator(CorrelationId);

impl CorrelationIdGenerator {
    pub const fn new() -> Self {
        Self(0)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> CorrelationId {
        let id = self.0;
        self.0 += 1;
        id
    }
}

/// The kind of mutation a changeset entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityOperationType {
    Insert,
    Update,
    Delete,
    /// A custom entity action with no accompanying property changes.
    Custom,
}

impl fmt::Display for EntityOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityOperationType::Insert => "Insert",
            EntityOperationType::Update => "Update",
            EntityOperationType::Delete => "Delete",
            EntityOperationType::Custom => "Custom",
        };
        f.write_str(name)
    }
}

/// Server-detected optimistic concurrency failure for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityConflict<E: Entity> {
    store_entity: Option<E>,
    property_names: Vec<String>,
    is_deleted: bool,
}

impl<E: Entity> EntityConflict<E> {
    /// The entity exists in the store with different values.
    pub fn modified(store_entity: E, property_names: Vec<String>) -> Self {
        Self {
            store_entity: Some(store_entity),
            property_names,
            is_deleted: false,
        }
    }

    /// The entity no longer exists in the store.
    pub fn deleted() -> Self {
        Self {
            store_entity: None,
            property_names: Vec::new(),
            is_deleted: true,
        }
    }

    pub fn store_entity(&self) -> Option<&E> {
        self.store_entity.as_ref()
    }

    /// Members whose store values differ from the client's original values.
    pub fn property_names(&self) -> &[String] {
        &self.property_names
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

/// One mutation inside a submitted changeset, as it travels to the transport
/// and back.
///
/// The transport must echo `id` unchanged. Everything else may be rewritten
/// by the server: `entity` with server-generated values, `conflict` and
/// `validation_errors` with the outcome for this entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetEntry<E: Entity> {
    pub id: CorrelationId,
    pub operation: EntityOperationType,
    pub entity: E,
    pub original: Option<E>,
    pub action: Option<EntityAction>,
    pub conflict: Option<EntityConflict<E>>,
    pub validation_errors: Vec<ValidationResult>,
}

impl<E: Entity> ChangeSetEntry<E> {
    pub fn new(id: CorrelationId, operation: EntityOperationType, entity: E) -> Self {
        Self {
            id,
            operation,
            entity,
            original: None,
            action: None,
            conflict: None,
            validation_errors: Vec::new(),
        }
    }

    pub fn has_conflict(&self) -> bool {
        self.conflict.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.conflict.is_some() || !self.validation_errors.is_empty()
    }
}
