//! # Ferry Client
//! The client-side runtime: asynchronous load, submit and invoke operations
//! issued through a [`TransportClient`], a tracked [`EntitySet`] of the
//! entities they bring in, and [`EntityList`]s kept consistent with that set
//! and with an external source.
//!
//! [`TransportClient`]: ferry_shared::TransportClient

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use ferry_shared as shared;

mod client_config;
mod collections;
mod domain_context;
mod entity;
mod error;
mod operations;

pub use client_config::ClientConfig;
pub use collections::{
    CollectionChange, EntityList, EntityListChange, EntitySource, Notifier, ObservableCollection,
    Observer, SourceChange, Subscription,
};
pub use domain_context::DomainContext;
pub use entity::{
    EntityChangeSet, EntityRef, EntitySet, EntitySetChange, EntityState, LoadBehavior,
};
pub use error::{
    CollectionError, EntityError, EntityListError, EntitySetError, OperationError,
    OperationErrorStatus, OperationFailure,
};
pub use operations::{
    AsyncOperation, Callback, ChangeSetCorrelator, CorrelatedEntry, InvokeCallback,
    InvokeOperation, LoadCallback, LoadOperation, NoHooks, OperationHooks, OperationKind,
    OperationProperty, SubmitCallback, SubmitOperation, UserState, SUBMIT_OPERATION_NAME,
};
