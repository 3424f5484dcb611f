use thiserror::Error;

use ferry_shared::{CorrelationId, ValidationResult};

use crate::operations::OperationKind;

/// Synchronous misuse of an operation or of the context that issues them.
/// These are programming errors and are never recovered from locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The operation already reached a terminal state
    #[error("Operation '{operation}' has already completed")]
    AlreadyCompleted {
        operation: String,
    },

    /// Cancellation was requested on an operation that cannot be cancelled
    #[error("Operation '{operation}' does not support cancellation")]
    CancellationNotSupported {
        operation: String,
    },

    /// A submission was requested with nothing in it
    #[error("Cannot submit an empty changeset. Check has_changes() before submitting")]
    EmptyChangeSet,

    /// Another submission has not finished yet
    #[error("A submit operation is already in progress. Wait for it to complete before submitting again")]
    SubmitInProgress,

    /// A lock guarding operation state was poisoned by a panicking thread
    #[error("Operation state lock is poisoned - a panic occurred while holding the lock")]
    LockPoisoned,
}

/// Coarse classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationErrorStatus {
    ServerError,
    ValidationFailed,
    Conflicts,
    Unauthorized,
}

/// The classified error stored on an operation that completed unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationFailure {
    /// Business error raised by the remote service, passed through unchanged
    #[error("{message}")]
    Domain {
        status: OperationErrorStatus,
        message: String,
        error_code: i32,
    },

    /// One or more changeset entries or invoke arguments failed validation
    #[error("{kind} operation '{operation}' failed validation with {} error(s)", .validation_errors.len())]
    ValidationFailed {
        kind: OperationKind,
        operation: String,
        validation_errors: Vec<ValidationResult>,
    },

    /// Optimistic concurrency check failed for one or more changeset entries
    #[error("Submit operation '{operation}' failed with {conflicts} conflicting entity change(s)")]
    Conflicts {
        operation: String,
        conflicts: usize,
    },

    /// Any other failure reported by the transport, wrapped with context
    #[error("{kind} operation '{operation}' failed: {message}")]
    Transport {
        kind: OperationKind,
        operation: String,
        message: String,
    },

    /// The transport returned an entry the client never submitted. The
    /// transport and the client disagree about identity; the submission is
    /// aborted.
    #[error("Submit operation '{operation}' received a result for unknown correlation id {id}. The transport must echo the ids it was given")]
    UnknownCorrelationId {
        operation: String,
        id: CorrelationId,
    },

    /// The transport returned the same entry more than once
    #[error("Submit operation '{operation}' received more than one result for correlation id {id}")]
    DuplicateCorrelationId {
        operation: String,
        id: CorrelationId,
    },

    /// The transport returned no result for some submitted entries, so their
    /// outcome is unknown and nothing is accepted
    #[error("Submit operation '{operation}' received no result for correlation id(s) {ids:?}")]
    MissingCorrelationIds {
        operation: String,
        ids: Vec<CorrelationId>,
    },
}

impl OperationFailure {
    pub fn status(&self) -> OperationErrorStatus {
        match self {
            OperationFailure::Domain { status, .. } => *status,
            OperationFailure::ValidationFailed { .. } => OperationErrorStatus::ValidationFailed,
            OperationFailure::Conflicts { .. } => OperationErrorStatus::Conflicts,
            OperationFailure::Transport { .. }
            | OperationFailure::UnknownCorrelationId { .. }
            | OperationFailure::DuplicateCorrelationId { .. }
            | OperationFailure::MissingCorrelationIds { .. } => OperationErrorStatus::ServerError,
        }
    }

    pub fn validation_errors(&self) -> &[ValidationResult] {
        match self {
            OperationFailure::ValidationFailed {
                validation_errors, ..
            } => validation_errors,
            _ => &[],
        }
    }
}

/// Errors raised when editing or resolving a single entity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Deleted entities cannot be edited until the deletion is rejected
    #[error("Cannot {operation} an entity that is pending deletion")]
    EntityDeleted {
        operation: &'static str,
    },

    /// Custom actions only make sense for entities the server already knows
    #[error("Cannot invoke action '{action}' on an entity in state {state}")]
    ActionNotAllowed {
        action: String,
        state: &'static str,
    },

    /// The entity's values are on their way to the server
    #[error("Cannot {operation} an entity while it is being submitted")]
    Submitting {
        operation: &'static str,
    },

    /// There is no conflict to resolve
    #[error("Entity has no conflict to resolve")]
    NoConflict,

    /// The entity was deleted in the store, so there are no store values to adopt
    #[error("Cannot resolve a conflict for an entity that was deleted in the store. Detach the entity instead")]
    ConflictNotResolvable,
}

/// Errors raised by the tracked entity set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntitySetError {
    /// The entity is already contained in this set
    #[error("Entity is already contained in this entity set")]
    AlreadyInSet,

    /// The entity is not contained in this set
    #[error("Entity is not contained in this entity set. Check contains() first")]
    NotInSet,

    /// The entity is tracked by some other set
    #[error("Entity in state {state} is tracked by another entity set and must be detached first")]
    TrackedElsewhere {
        state: &'static str,
    },

    /// Another instance with the same key is already cached
    #[error("An entity with key {key} is already cached in this entity set")]
    DuplicateKey {
        key: String,
    },
}

/// Errors raised by ordered observable collections
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Index outside the collection
    #[error("Index {index} is out of bounds (length: {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
    },

    /// The item is not in the collection
    #[error("Item not found in collection")]
    ItemNotFound,
}

/// Errors raised by caller-driven mutations of an entity list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityListError {
    /// The entity is already visible in this list
    #[error("Entity is already contained in this entity list")]
    DuplicateEntity,

    /// Collection-level error
    #[error("Entity list error: {0}")]
    Collection(#[from] CollectionError),

    /// Propagating the change to the tracked set failed
    #[error("Entity set error: {0}")]
    EntitySet(#[from] EntitySetError),

    /// Called from inside a change notification raised by this same list
    #[error("Entity list is already propagating a change. Mutate it after the current notification returns")]
    UpdateInProgress,
}
