use log::error;

use ferry_shared::{
    ChangeSetEntry, CheckedMap, CheckedSet, CorrelationId, CorrelationIdGenerator, Entity,
};

use crate::{
    entity::{EntityChangeSet, EntityRef},
    error::OperationFailure,
};

/// A returned changeset entry re-attached to the client entity it was
/// submitted for.
#[derive(Debug, Clone)]
pub struct CorrelatedEntry<E: Entity> {
    entry: ChangeSetEntry<E>,
    client_entity: EntityRef<E>,
}

impl<E: Entity> CorrelatedEntry<E> {
    pub fn entry(&self) -> &ChangeSetEntry<E> {
        &self.entry
    }

    pub fn client_entity(&self) -> &EntityRef<E> {
        &self.client_entity
    }

    pub fn id(&self) -> CorrelationId {
        self.entry.id
    }

    pub fn has_error(&self) -> bool {
        self.entry.has_error()
    }
}

/// Matches the entries a transport returns for one submission back to the
/// client entities they were built from.
pub struct ChangeSetCorrelator<E: Entity> {
    operation: String,
    entities: CheckedMap<CorrelationId, EntityRef<E>>,
}

impl<E: Entity> ChangeSetCorrelator<E> {
    /// Assigns every entity in the changeset a correlation id and builds the
    /// entries handed to the transport, in insert / update / delete order.
    pub fn prepare(
        operation: impl Into<String>,
        change_set: &EntityChangeSet<E>,
    ) -> (Self, Vec<ChangeSetEntry<E>>) {
        let mut ids = CorrelationIdGenerator::new();
        let mut entities = CheckedMap::with_capacity(change_set.len());
        let mut entries = Vec::with_capacity(change_set.len());

        for (operation_type, entity) in change_set.iter() {
            let id = ids.next();
            let mut entry = ChangeSetEntry::new(id, operation_type, entity.get());
            entry.original = entity.original();
            entry.action = entity.pending_action();
            entries.push(entry);
            entities.insert(id, entity.clone());
        }

        let correlator = Self {
            operation: operation.into(),
            entities,
        };
        (correlator, entries)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, id: CorrelationId) -> Option<&EntityRef<E>> {
        self.entities.get(&id)
    }

    /// Re-attaches every returned entry to its client entity, preserving the
    /// order the transport returned them in. Every submitted id must come
    /// back exactly once; an unknown, repeated or missing id aborts the whole
    /// submission.
    pub fn correlate(
        &self,
        returned: Vec<ChangeSetEntry<E>>,
    ) -> Result<Vec<CorrelatedEntry<E>>, OperationFailure> {
        let mut seen = CheckedSet::new();
        let mut correlated = Vec::with_capacity(returned.len());
        for entry in returned {
            let Some(client_entity) = self.entities.get(&entry.id) else {
                error!(
                    "Submit operation '{}' received unknown correlation id {} ({} entries submitted)",
                    self.operation,
                    entry.id,
                    self.entities.len()
                );
                return Err(OperationFailure::UnknownCorrelationId {
                    operation: self.operation.clone(),
                    id: entry.id,
                });
            };
            if seen.contains(&entry.id) {
                error!(
                    "Submit operation '{}' received correlation id {} more than once",
                    self.operation, entry.id
                );
                return Err(OperationFailure::DuplicateCorrelationId {
                    operation: self.operation.clone(),
                    id: entry.id,
                });
            }
            seen.insert(entry.id);
            correlated.push(CorrelatedEntry {
                client_entity: client_entity.clone(),
                entry,
            });
        }

        if seen.len() < self.entities.len() {
            let mut missing: Vec<CorrelationId> = self
                .entities
                .iter()
                .map(|(id, _)| *id)
                .filter(|id| !seen.contains(id))
                .collect();
            missing.sort_unstable();
            error!(
                "Submit operation '{}' got no result for correlation id(s) {:?}",
                self.operation, missing
            );
            return Err(OperationFailure::MissingCorrelationIds {
                operation: self.operation.clone(),
                ids: missing,
            });
        }
        Ok(correlated)
    }
}
