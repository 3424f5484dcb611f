use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use log::{debug, info};

use ferry_shared::{EntityQuery, InvokeRequest, TransportClient};

use crate::{
    client_config::ClientConfig,
    collections::{EntityList, EntitySource},
    entity::{EntityChangeSet, EntitySet, LoadBehavior},
    error::{EntityListError, OperationError},
    operations::{
        ChangeSetCorrelator, InvokeCallback, InvokeOperation, LoadCallback, LoadOperation,
        SubmitCallback, SubmitOperation, UserState, SUBMIT_OPERATION_NAME,
    },
};

type EntityOf<T> = <T as TransportClient>::Entity;
type ValueOf<T> = <T as TransportClient>::Value;

/// Issues loads, submissions and invokes through a transport and keeps the
/// results in one tracked [`EntitySet`].
pub struct DomainContext<T: TransportClient> {
    transport: Arc<T>,
    config: ClientConfig,
    entity_set: EntitySet<EntityOf<T>>,
    active_loads: Arc<AtomicUsize>,
    submitting: Arc<AtomicBool>,
}

impl<T: TransportClient> DomainContext<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            entity_set: EntitySet::new(),
            active_loads: Arc::new(AtomicUsize::new(0)),
            submitting: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn entity_set(&self) -> &EntitySet<EntityOf<T>> {
        &self.entity_set
    }

    // Loading

    pub fn load(&self, query: EntityQuery<ValueOf<T>>) -> LoadOperation<EntityOf<T>> {
        self.load_with(query, self.config.default_load_behavior, None, None)
    }

    pub fn load_with(
        &self,
        mut query: EntityQuery<ValueOf<T>>,
        behavior: LoadBehavior,
        callback: Option<LoadCallback<EntityOf<T>>>,
        user_state: Option<UserState>,
    ) -> LoadOperation<EntityOf<T>> {
        query.include_total_count |= self.config.include_total_count;

        self.active_loads.fetch_add(1, Ordering::AcqRel);
        let active_loads = self.active_loads.clone();
        let callback: LoadCallback<EntityOf<T>> =
            Box::new(move |operation: &LoadOperation<EntityOf<T>>| {
                active_loads.fetch_sub(1, Ordering::AcqRel);
                if let Some(callback) = callback {
                    callback(operation);
                }
            });

        let operation = LoadOperation::new(
            query.query_name.clone(),
            behavior,
            &self.entity_set,
            user_state,
            self.transport.supports_cancellation(),
            Some(callback),
        );
        debug!("Issuing load '{}'", query.query_name);
        let pending = self.transport.query(query, operation.reply());
        operation.operation().attach_pending_call(pending);
        operation
    }

    pub fn is_loading(&self) -> bool {
        self.active_loads.load(Ordering::Acquire) > 0
    }

    // Submitting

    pub fn has_changes(&self) -> bool {
        self.entity_set.has_changes()
    }

    pub fn submit_changes(&self) -> Result<SubmitOperation<EntityOf<T>>, OperationError> {
        self.submit(self.entity_set.get_changes(), None, None)
    }

    /// Submits a changeset. Fails before anything is sent when the changeset
    /// is empty or another submission is still in flight.
    pub fn submit(
        &self,
        change_set: EntityChangeSet<EntityOf<T>>,
        callback: Option<SubmitCallback<EntityOf<T>>>,
        user_state: Option<UserState>,
    ) -> Result<SubmitOperation<EntityOf<T>>, OperationError> {
        if change_set.is_empty() {
            return Err(OperationError::EmptyChangeSet);
        }
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(OperationError::SubmitInProgress);
        }

        for (_, entity) in change_set.iter() {
            entity.clear_submit_errors();
        }
        let (correlator, entries) =
            ChangeSetCorrelator::prepare(SUBMIT_OPERATION_NAME, &change_set);

        let submitting = self.submitting.clone();
        let callback: SubmitCallback<EntityOf<T>> =
            Box::new(move |operation: &SubmitOperation<EntityOf<T>>| {
                submitting.store(false, Ordering::Release);
                if let Some(callback) = callback {
                    callback(operation);
                }
            });

        let operation = SubmitOperation::new(
            &self.entity_set,
            change_set,
            user_state,
            self.transport.supports_cancellation(),
            Some(callback),
        );
        info!("Submitting {} changeset entries", entries.len());
        let pending = self.transport.submit(entries, operation.reply(correlator));
        operation.operation().attach_pending_call(pending);
        Ok(operation)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Rolls back every pending change in the tracked set.
    pub fn reject_changes(&self) {
        self.entity_set.reject_changes();
    }

    // Invoking

    pub fn invoke(&self, request: InvokeRequest<ValueOf<T>>) -> InvokeOperation<ValueOf<T>> {
        self.invoke_with(request, None, None)
    }

    pub fn invoke_with(
        &self,
        request: InvokeRequest<ValueOf<T>>,
        callback: Option<InvokeCallback<ValueOf<T>>>,
        user_state: Option<UserState>,
    ) -> InvokeOperation<ValueOf<T>> {
        let operation = InvokeOperation::new(
            request.operation_name.clone(),
            user_state,
            self.transport.supports_cancellation(),
            callback,
        );
        debug!("Invoking '{}'", request.operation_name);
        let pending = self.transport.invoke(request, operation.reply());
        operation.operation().attach_pending_call(pending);
        operation
    }

    // Lists

    /// A new list bound to this context's tracked set, with no source.
    pub fn entity_list(&self) -> EntityList<EntityOf<T>> {
        EntityList::new(&self.entity_set)
    }

    pub fn entity_list_with_source(
        &self,
        source: impl EntitySource<EntityOf<T>> + 'static,
    ) -> Result<EntityList<EntityOf<T>>, EntityListError> {
        EntityList::with_source(&self.entity_set, source)
    }
}
