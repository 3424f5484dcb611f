//! # Ferry Shared
//! Common functionality shared between the ferry client runtime and the
//! transports that carry its calls to a remote domain service.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod changeset;
mod checked_map;
mod entity;
mod query;
mod transport;
mod validation;

pub use changeset::{
    ChangeSetEntry, CorrelationId, CorrelationIdGenerator, EntityConflict, EntityOperationType,
};
pub use checked_map::{CheckedMap, CheckedSet};
pub use entity::{Entity, EntityAction};
pub use query::{EntityQuery, InvokeRequest, Parameter, QueryResult};
pub use transport::{
    error::TransportError, PendingCall, Reply, TransportClient, TransportResult,
};
pub use validation::ValidationResult;
