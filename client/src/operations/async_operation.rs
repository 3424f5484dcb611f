use std::{
    any::Any,
    fmt,
    sync::{Arc, Mutex, RwLock, RwLockReadGuard},
};

use log::{debug, info, warn};

use ferry_shared::{PendingCall, TransportError};

use crate::{
    collections::{Notifier, Observer, Subscription},
    error::{OperationError, OperationErrorStatus, OperationFailure},
    operations::operation_kind::{OperationKind, OperationProperty},
};

/// Opaque, caller-supplied value carried by an operation.
pub type UserState = Arc<dyn Any + Send + Sync>;

/// Runs once when an operation reaches its terminal state.
pub type Callback<R> = Box<dyn FnOnce(&AsyncOperation<R>) + Send>;

/// Operation-specific behaviour plugged into an [`AsyncOperation`].
pub trait OperationHooks<R>: Send + Sync {
    /// Runs exactly once, after the operation has claimed its outcome and
    /// before that outcome becomes observable. Returning a failure replaces
    /// the outcome, which is how a transport-level success can still
    /// complete as a classified error.
    fn on_complete(&self, outcome: Result<&R, &OperationFailure>) -> Option<OperationFailure> {
        let _ = outcome;
        None
    }

    /// Runs once when a cancellation is accepted. Must not block.
    fn on_cancel(&self) {}
}

/// Hooks for operations whose result needs no reshaping.
pub struct NoHooks;

impl<R> OperationHooks<R> for NoHooks {}

enum Outcome<R> {
    Pending,
    // outcome claimed, completion hook running
    Completing,
    Succeeded(Arc<R>),
    Failed(OperationFailure),
    Canceled,
}

impl<R> Outcome<R> {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "Pending",
            Outcome::Completing => "Completing",
            Outcome::Succeeded(_) => "Succeeded",
            Outcome::Failed(_) => "Failed",
            Outcome::Canceled => "Canceled",
        }
    }
}

struct OperationInner<R> {
    kind: OperationKind,
    name: String,
    user_state: Option<UserState>,
    supports_cancellation: bool,
    outcome: RwLock<Outcome<R>>,
    hooks: Box<dyn OperationHooks<R>>,
    callback: Mutex<Option<Callback<R>>>,
    pending_call: Mutex<Option<PendingCall>>,
    notifier: Notifier<OperationProperty>,
}

/// One asynchronous unit of work with a single terminal outcome: success,
/// classified failure, or cancellation.
///
/// The first terminal transition wins. A completion that arrives after an
/// accepted cancellation is dropped; a second completion, or a cancellation
/// after completion, fails loudly. Completion may be driven from any
/// thread.
///
/// On completion the hooks run first, then property-changed notifications
/// are raised, then the completion callback runs exactly once.
pub struct AsyncOperation<R> {
    inner: Arc<OperationInner<R>>,
}

impl<R: Send + Sync + 'static> AsyncOperation<R> {
    pub fn new(
        kind: OperationKind,
        name: impl Into<String>,
        user_state: Option<UserState>,
        supports_cancellation: bool,
        hooks: impl OperationHooks<R> + 'static,
        callback: Option<Callback<R>>,
    ) -> Self {
        Self {
            inner: Arc::new(OperationInner {
                kind,
                name: name.into(),
                user_state,
                supports_cancellation,
                outcome: RwLock::new(Outcome::Pending),
                hooks: Box::new(hooks),
                callback: Mutex::new(callback),
                pending_call: Mutex::new(None),
                notifier: Notifier::new(),
            }),
        }
    }

    fn outcome(&self) -> RwLockReadGuard<'_, Outcome<R>> {
        self.inner
            .outcome
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Identity

    pub fn kind(&self) -> OperationKind {
        self.inner.kind
    }

    pub fn operation_name(&self) -> &str {
        &self.inner.name
    }

    pub fn user_state(&self) -> Option<&UserState> {
        self.inner.user_state.as_ref()
    }

    /// The user state downcast to `T`, if it is one.
    pub fn user_state_as<T: Any>(&self) -> Option<&T> {
        self.inner
            .user_state
            .as_deref()
            .and_then(|state| state.downcast_ref::<T>())
    }

    pub fn supports_cancellation(&self) -> bool {
        self.inner.supports_cancellation
    }

    // State

    pub fn is_complete(&self) -> bool {
        matches!(
            *self.outcome(),
            Outcome::Succeeded(_) | Outcome::Failed(_) | Outcome::Canceled
        )
    }

    pub fn is_canceled(&self) -> bool {
        matches!(*self.outcome(), Outcome::Canceled)
    }

    pub fn has_error(&self) -> bool {
        matches!(*self.outcome(), Outcome::Failed(_))
    }

    pub fn can_cancel(&self) -> bool {
        self.inner.supports_cancellation && matches!(*self.outcome(), Outcome::Pending)
    }

    pub fn error(&self) -> Option<OperationFailure> {
        match &*self.outcome() {
            Outcome::Failed(failure) => Some(failure.clone()),
            _ => None,
        }
    }

    pub fn error_status(&self) -> Option<OperationErrorStatus> {
        match &*self.outcome() {
            Outcome::Failed(failure) => Some(failure.status()),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<Arc<R>> {
        match &*self.outcome() {
            Outcome::Succeeded(result) => Some(result.clone()),
            _ => None,
        }
    }

    // Transitions

    /// Completes the operation with a result or a classified failure.
    ///
    /// Returns `Ok` without touching any state when the operation was
    /// already canceled, and `AlreadyCompleted` when it already succeeded or
    /// failed.
    pub fn complete(&self, outcome: Result<R, OperationFailure>) -> Result<(), OperationError> {
        {
            let mut state = self
                .inner
                .outcome
                .write()
                .map_err(|_| OperationError::LockPoisoned)?;
            match *state {
                Outcome::Pending => *state = Outcome::Completing,
                Outcome::Canceled => {
                    debug!(
                        "Dropping late completion of canceled {} operation '{}'",
                        self.inner.kind, self.inner.name
                    );
                    return Ok(());
                }
                _ => {
                    return Err(OperationError::AlreadyCompleted {
                        operation: self.inner.name.clone(),
                    });
                }
            }
        }

        let replaced = self.inner.hooks.on_complete(outcome.as_ref());
        let outcome = match (outcome, replaced) {
            (_, Some(failure)) => Outcome::Failed(failure),
            (Ok(result), None) => Outcome::Succeeded(Arc::new(result)),
            (Err(failure), None) => Outcome::Failed(failure),
        };

        let changed = match &outcome {
            Outcome::Failed(failure) => {
                warn!(
                    "{} operation '{}' failed: {}",
                    self.inner.kind, self.inner.name, failure
                );
                OperationProperty::Error
            }
            _ => {
                info!(
                    "{} operation '{}' completed",
                    self.inner.kind, self.inner.name
                );
                OperationProperty::Result
            }
        };

        {
            let mut state = self
                .inner
                .outcome
                .write()
                .map_err(|_| OperationError::LockPoisoned)?;
            *state = outcome;
        }
        self.take_pending_call();

        self.inner.notifier.notify(&changed);
        self.inner.notifier.notify(&OperationProperty::IsComplete);
        self.run_callback();
        Ok(())
    }

    /// Requests cancellation. The transport is asked to abandon the call
    /// and any reply it still sends is ignored.
    pub fn cancel(&self) -> Result<(), OperationError> {
        if !self.inner.supports_cancellation {
            return Err(OperationError::CancellationNotSupported {
                operation: self.inner.name.clone(),
            });
        }

        {
            let mut state = self
                .inner
                .outcome
                .write()
                .map_err(|_| OperationError::LockPoisoned)?;
            if !matches!(*state, Outcome::Pending) {
                return Err(OperationError::AlreadyCompleted {
                    operation: self.inner.name.clone(),
                });
            }
            *state = Outcome::Canceled;
        }

        if let Some(call) = self.take_pending_call() {
            call.abandon();
        }
        self.inner.hooks.on_cancel();
        info!(
            "{} operation '{}' canceled",
            self.inner.kind, self.inner.name
        );

        self.inner.notifier.notify(&OperationProperty::IsCanceled);
        self.inner.notifier.notify(&OperationProperty::IsComplete);
        self.run_callback();
        Ok(())
    }

    /// Completes the operation from a transport reply. A reply that loses
    /// the race against another completion is logged and discarded.
    pub(crate) fn deliver(&self, outcome: Result<R, OperationFailure>) {
        if let Err(error) = self.complete(outcome) {
            warn!("Discarding transport reply: {}", error);
        }
    }

    /// Remembers the in-flight call so that a cancellation can abandon it.
    pub(crate) fn attach_pending_call(&self, call: PendingCall) {
        let mut slot = self
            .inner
            .pending_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *self.outcome() {
            Outcome::Pending => *slot = Some(call),
            // canceled before the transport handed back its handle
            Outcome::Canceled => call.abandon(),
            _ => {}
        }
    }

    fn take_pending_call(&self) -> Option<PendingCall> {
        self.inner
            .pending_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    fn run_callback(&self) {
        let callback = self
            .inner
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(callback) = callback {
            callback(self);
        }
    }

    // Notifications

    pub fn subscribe<O: Observer<OperationProperty> + 'static>(
        &self,
        observer: &Arc<O>,
    ) -> Subscription {
        self.inner.notifier.subscribe(observer)
    }
}

impl<R> Clone for AsyncOperation<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R> fmt::Debug for AsyncOperation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = self
            .inner
            .outcome
            .read()
            .map(|outcome| outcome.as_str())
            .unwrap_or("Poisoned");
        f.debug_struct("AsyncOperation")
            .field("kind", &self.inner.kind)
            .field("name", &self.inner.name)
            .field("outcome", &outcome)
            .finish()
    }
}

/// Maps what a transport reported onto the failure stored on an operation.
/// Errors raised by the remote domain pass through; everything else gains
/// the operation's kind and name.
pub(crate) fn classify_transport_error(
    kind: OperationKind,
    operation: &str,
    error: TransportError,
) -> OperationFailure {
    match error {
        TransportError::Domain {
            message,
            error_code,
        } => OperationFailure::Domain {
            status: OperationErrorStatus::ServerError,
            message,
            error_code,
        },
        TransportError::Unauthorized { message } => OperationFailure::Domain {
            status: OperationErrorStatus::Unauthorized,
            message,
            error_code: 0,
        },
        TransportError::ValidationFailed(validation_errors) => OperationFailure::ValidationFailed {
            kind,
            operation: operation.to_string(),
            validation_errors,
        },
        TransportError::Infrastructure { message } => OperationFailure::Transport {
            kind,
            operation: operation.to_string(),
            message,
        },
    }
}
