use std::sync::{Arc, RwLock};

use ferry_shared::{
    ChangeSetEntry, Entity, EntityOperationType, Reply, TransportResult, ValidationResult,
};

use crate::{
    entity::{EntityChangeSet, EntityRef, EntitySet},
    error::OperationFailure,
    operations::{
        async_operation::{classify_transport_error, AsyncOperation, Callback, OperationHooks, UserState},
        correlator::{ChangeSetCorrelator, CorrelatedEntry},
        operation_kind::OperationKind,
    },
};

pub const SUBMIT_OPERATION_NAME: &str = "SubmitChanges";

/// Runs once when a submission reaches its terminal state.
pub type SubmitCallback<E> = Box<dyn FnOnce(&SubmitOperation<E>) + Send>;

struct SubmitState<E: Entity> {
    entity_set: EntitySet<E>,
    change_set: EntityChangeSet<E>,
    entries: RwLock<Vec<CorrelatedEntry<E>>>,
}

struct SubmitHooks<E: Entity> {
    state: Arc<SubmitState<E>>,
}

impl<E: Entity> SubmitHooks<E> {
    fn record_errors(&self, entries: &[CorrelatedEntry<E>]) -> Option<OperationFailure> {
        let conflicts = entries
            .iter()
            .filter(|entry| entry.entry().has_conflict())
            .count();
        let validation_errors: Vec<ValidationResult> = entries
            .iter()
            .flat_map(|entry| entry.entry().validation_errors.iter().cloned())
            .collect();
        if conflicts == 0 && validation_errors.is_empty() {
            return None;
        }

        for entry in entries {
            entry.client_entity().set_submit_errors(
                entry.entry().validation_errors.clone(),
                entry.entry().conflict.clone(),
            );
        }

        let failure = if conflicts > 0 {
            OperationFailure::Conflicts {
                operation: SUBMIT_OPERATION_NAME.to_string(),
                conflicts,
            }
        } else {
            OperationFailure::ValidationFailed {
                kind: OperationKind::Submit,
                operation: SUBMIT_OPERATION_NAME.to_string(),
                validation_errors,
            }
        };
        Some(failure)
    }

    fn accept(&self, entries: &[CorrelatedEntry<E>]) {
        for entry in entries {
            if entry.entry().operation != EntityOperationType::Delete {
                entry
                    .client_entity()
                    .apply_server_values(entry.entry().entity.clone());
            }
        }
        self.state.entity_set.accept_changes(&self.state.change_set);
    }

    fn release_entities(&self) {
        for (_, entity) in self.state.change_set.iter() {
            entity.set_submitting(false);
        }
    }
}

impl<E: Entity> OperationHooks<Vec<CorrelatedEntry<E>>> for SubmitHooks<E> {
    fn on_complete(
        &self,
        outcome: Result<&Vec<CorrelatedEntry<E>>, &OperationFailure>,
    ) -> Option<OperationFailure> {
        self.release_entities();
        let Ok(entries) = outcome else {
            return None;
        };
        *self
            .state
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = entries.clone();

        let failure = self.record_errors(entries);
        if failure.is_none() {
            self.accept(entries);
        }
        failure
    }

    fn on_cancel(&self) {
        self.release_entities();
    }
}

/// A changeset submission in flight.
///
/// On success server-returned values are written back to the client
/// entities and the changeset is accepted. When any entry comes back with a
/// conflict or validation errors, those are recorded on the client entities,
/// the changes stay pending, and the operation fails as `Conflicts` or
/// `ValidationFailed`.
pub struct SubmitOperation<E: Entity> {
    operation: AsyncOperation<Vec<CorrelatedEntry<E>>>,
    state: Arc<SubmitState<E>>,
}

impl<E: Entity> SubmitOperation<E> {
    pub fn new(
        entity_set: &EntitySet<E>,
        change_set: EntityChangeSet<E>,
        user_state: Option<UserState>,
        supports_cancellation: bool,
        callback: Option<SubmitCallback<E>>,
    ) -> Self {
        for (_, entity) in change_set.iter() {
            entity.set_submitting(true);
        }
        let state = Arc::new(SubmitState {
            entity_set: entity_set.clone(),
            change_set,
            entries: RwLock::new(Vec::new()),
        });

        let callback = callback.map(|callback| {
            let state = state.clone();
            Box::new(move |operation: &AsyncOperation<Vec<CorrelatedEntry<E>>>| {
                callback(&SubmitOperation {
                    operation: operation.clone(),
                    state,
                })
            }) as Callback<Vec<CorrelatedEntry<E>>>
        });

        let operation = AsyncOperation::new(
            OperationKind::Submit,
            SUBMIT_OPERATION_NAME,
            user_state,
            supports_cancellation,
            SubmitHooks {
                state: state.clone(),
            },
            callback,
        );
        Self { operation, state }
    }

    pub fn operation(&self) -> &AsyncOperation<Vec<CorrelatedEntry<E>>> {
        &self.operation
    }

    delegate_to_operation!();

    /// The changeset as it was when the submission started.
    pub fn change_set(&self) -> &EntityChangeSet<E> {
        &self.state.change_set
    }

    /// Every returned entry, re-attached to its client entity. Empty until
    /// the transport replies.
    pub fn entries(&self) -> Vec<CorrelatedEntry<E>> {
        self.state
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returned entries carrying a conflict or validation errors.
    pub fn entries_in_error(&self) -> Vec<CorrelatedEntry<E>> {
        self.state
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|entry| entry.has_error())
            .cloned()
            .collect()
    }

    /// Client entities whose returned entry carries a conflict or
    /// validation errors.
    pub fn entities_in_error(&self) -> Vec<EntityRef<E>> {
        self.entries_in_error()
            .into_iter()
            .map(|entry| entry.client_entity().clone())
            .collect()
    }

    /// Builds the reply the transport completes this submission through.
    /// Returned entries are correlated before the operation completes.
    pub(crate) fn reply(
        &self,
        correlator: ChangeSetCorrelator<E>,
    ) -> Reply<Vec<ChangeSetEntry<E>>> {
        let operation = self.operation.clone();
        Reply::new(move |result: TransportResult<Vec<ChangeSetEntry<E>>>| {
            let outcome = match result {
                Ok(returned) => correlator.correlate(returned),
                Err(error) => Err(classify_transport_error(
                    OperationKind::Submit,
                    SUBMIT_OPERATION_NAME,
                    error,
                )),
            };
            operation.deliver(outcome);
        })
    }
}

impl<E: Entity> Clone for SubmitOperation<E> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            state: self.state.clone(),
        }
    }
}
