use std::fmt;

use ferry_shared::{Reply, TransportResult, ValidationResult};

use crate::operations::{
    async_operation::{classify_transport_error, AsyncOperation, Callback, NoHooks, UserState},
    operation_kind::OperationKind,
};

/// Runs once when an invoke reaches its terminal state.
pub type InvokeCallback<V> = Box<dyn FnOnce(&InvokeOperation<V>) + Send>;

/// A remote method call in flight.
pub struct InvokeOperation<V> {
    operation: AsyncOperation<V>,
}

impl<V: Clone + fmt::Debug + Send + Sync + 'static> InvokeOperation<V> {
    pub fn new(
        operation_name: impl Into<String>,
        user_state: Option<UserState>,
        supports_cancellation: bool,
        callback: Option<InvokeCallback<V>>,
    ) -> Self {
        let callback = callback.map(|callback| {
            Box::new(move |operation: &AsyncOperation<V>| {
                callback(&InvokeOperation {
                    operation: operation.clone(),
                })
            }) as Callback<V>
        });

        Self {
            operation: AsyncOperation::new(
                OperationKind::Invoke,
                operation_name,
                user_state,
                supports_cancellation,
                NoHooks,
                callback,
            ),
        }
    }

    pub fn operation(&self) -> &AsyncOperation<V> {
        &self.operation
    }

    delegate_to_operation!();

    /// The returned value, once the call succeeded.
    pub fn value(&self) -> Option<V> {
        self.operation.result().map(|value| (*value).clone())
    }

    /// Validation results reported for the call's arguments.
    pub fn validation_errors(&self) -> Vec<ValidationResult> {
        self.operation
            .error()
            .map(|failure| failure.validation_errors().to_vec())
            .unwrap_or_default()
    }

    pub(crate) fn reply(&self) -> Reply<V> {
        let operation = self.operation.clone();
        Reply::new(move |result: TransportResult<V>| {
            let outcome = result.map_err(|error| {
                classify_transport_error(OperationKind::Invoke, operation.operation_name(), error)
            });
            operation.deliver(outcome);
        })
    }
}

impl<V> Clone for InvokeOperation<V> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
        }
    }
}
