// Accessors every operation specialization forwards to its `AsyncOperation`.
macro_rules! delegate_to_operation {
    () => {
        pub fn operation_name(&self) -> &str {
            self.operation.operation_name()
        }

        pub fn user_state(&self) -> Option<&$crate::operations::UserState> {
            self.operation.user_state()
        }

        pub fn user_state_as<T: std::any::Any>(&self) -> Option<&T> {
            self.operation.user_state_as::<T>()
        }

        pub fn is_complete(&self) -> bool {
            self.operation.is_complete()
        }

        pub fn is_canceled(&self) -> bool {
            self.operation.is_canceled()
        }

        pub fn has_error(&self) -> bool {
            self.operation.has_error()
        }

        pub fn error(&self) -> Option<$crate::error::OperationFailure> {
            self.operation.error()
        }

        pub fn error_status(&self) -> Option<$crate::error::OperationErrorStatus> {
            self.operation.error_status()
        }

        pub fn supports_cancellation(&self) -> bool {
            self.operation.supports_cancellation()
        }

        pub fn can_cancel(&self) -> bool {
            self.operation.can_cancel()
        }

        pub fn cancel(&self) -> Result<(), $crate::error::OperationError> {
            self.operation.cancel()
        }

        pub fn subscribe<O>(&self, observer: &std::sync::Arc<O>) -> $crate::collections::Subscription
        where
            O: $crate::collections::Observer<$crate::operations::OperationProperty> + 'static,
        {
            self.operation.subscribe(observer)
        }
    };
}

mod async_operation;
mod correlator;
mod invoke_operation;
mod load_operation;
mod operation_kind;
mod submit_operation;

pub use async_operation::{AsyncOperation, Callback, NoHooks, OperationHooks, UserState};
pub use correlator::{ChangeSetCorrelator, CorrelatedEntry};
pub use invoke_operation::{InvokeCallback, InvokeOperation};
pub use load_operation::{LoadCallback, LoadOperation};
pub use operation_kind::{OperationKind, OperationProperty};
pub use submit_operation::{SubmitCallback, SubmitOperation, SUBMIT_OPERATION_NAME};
