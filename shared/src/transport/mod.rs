pub mod error;

use std::fmt;

use log::debug;

use crate::{ChangeSetEntry, Entity, EntityQuery, InvokeRequest, QueryResult};

use self::error::TransportError;

pub type TransportResult<T> = Result<T, TransportError>;

/// One-shot callback a transport uses to deliver the outcome of a call.
///
/// May be sent from any thread. Dropping a `Reply` without sending it leaves
/// the operation pending forever, so transports that give up on a call
/// should send an error instead.
pub struct Reply<T> {
    callback: Box<dyn FnOnce(TransportResult<T>) + Send>,
}

impl<T> Reply<T> {
    pub fn new(callback: impl FnOnce(TransportResult<T>) + Send + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn send(self, result: TransportResult<T>) {
        (self.callback)(result);
    }
}

impl<T> fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reply")
    }
}

/// Handle to an in-flight transport call, used to ask the transport to
/// abandon its work. Abandoning is advisory: the transport may still send a
/// reply, which the runtime then discards.
pub struct PendingCall {
    abandon: Option<Box<dyn FnOnce() + Send>>,
}

impl PendingCall {
    pub fn new(abandon: impl FnOnce() + Send + 'static) -> Self {
        Self {
            abandon: Some(Box::new(abandon)),
        }
    }

    /// A call that cannot be abandoned.
    pub fn detached() -> Self {
        Self { abandon: None }
    }

    pub fn can_abandon(&self) -> bool {
        self.abandon.is_some()
    }

    pub fn abandon(mut self) {
        if let Some(abandon) = self.abandon.take() {
            debug!("Abandoning in-flight transport call");
            abandon();
        }
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("can_abandon", &self.can_abandon())
            .finish()
    }
}

/// The contract a transport fulfils for the client runtime.
///
/// Each call returns immediately; the outcome is delivered later through the
/// supplied [`Reply`], possibly from another thread. A transport must echo
/// every submitted changeset entry's correlation id unchanged.
pub trait TransportClient: Send + Sync + 'static {
    type Entity: Entity;
    type Value: Clone + fmt::Debug + Send + Sync + 'static;

    /// Whether calls issued through this transport can be abandoned.
    fn supports_cancellation(&self) -> bool {
        false
    }

    fn query(
        &self,
        query: EntityQuery<Self::Value>,
        reply: Reply<QueryResult<Self::Entity>>,
    ) -> PendingCall;

    fn submit(
        &self,
        entries: Vec<ChangeSetEntry<Self::Entity>>,
        reply: Reply<Vec<ChangeSetEntry<Self::Entity>>>,
    ) -> PendingCall;

    fn invoke(
        &self,
        request: InvokeRequest<Self::Value>,
        reply: Reply<Self::Value>,
    ) -> PendingCall;
}
