use std::{
    collections::HashSet,
    sync::{Arc, OnceLock, RwLock},
};

use ferry_shared::{Entity, QueryResult, Reply, TransportResult};

use crate::{
    entity::{EntityRef, EntitySet, LoadBehavior},
    error::OperationFailure,
    operations::{
        async_operation::{classify_transport_error, AsyncOperation, Callback, OperationHooks, UserState},
        operation_kind::OperationKind,
    },
};

/// Runs once when a load reaches its terminal state.
pub type LoadCallback<E> = Box<dyn FnOnce(&LoadOperation<E>) + Send>;

struct Loaded<E: Entity> {
    entities: Vec<EntityRef<E>>,
    included_entities: Vec<EntityRef<E>>,
    total_count: Option<usize>,
}

struct LoadState<E: Entity> {
    behavior: LoadBehavior,
    entity_set: EntitySet<E>,
    loaded: RwLock<Option<Loaded<E>>>,
    all_entities: OnceLock<Vec<EntityRef<E>>>,
}

struct LoadHooks<E: Entity> {
    state: Arc<LoadState<E>>,
}

impl<E: Entity> OperationHooks<QueryResult<E>> for LoadHooks<E> {
    fn on_complete(
        &self,
        outcome: Result<&QueryResult<E>, &OperationFailure>,
    ) -> Option<OperationFailure> {
        let Ok(result) = outcome else {
            return None;
        };
        let entity_set = &self.state.entity_set;
        let entities = entity_set.load(result.entities.clone(), self.state.behavior);
        let included_entities =
            entity_set.load(result.included_entities.clone(), self.state.behavior);
        *self
            .state
            .loaded
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Loaded {
            entities,
            included_entities,
            total_count: result.total_count,
        });
        None
    }
}

/// A query in flight. On success the returned entities are merged into the
/// tracked set and exposed as the cached instances.
pub struct LoadOperation<E: Entity> {
    operation: AsyncOperation<QueryResult<E>>,
    state: Arc<LoadState<E>>,
}

impl<E: Entity> LoadOperation<E> {
    pub fn new(
        query_name: impl Into<String>,
        behavior: LoadBehavior,
        entity_set: &EntitySet<E>,
        user_state: Option<UserState>,
        supports_cancellation: bool,
        callback: Option<LoadCallback<E>>,
    ) -> Self {
        let state = Arc::new(LoadState {
            behavior,
            entity_set: entity_set.clone(),
            loaded: RwLock::new(None),
            all_entities: OnceLock::new(),
        });

        let callback = callback.map(|callback| {
            let state = state.clone();
            Box::new(move |operation: &AsyncOperation<QueryResult<E>>| {
                callback(&LoadOperation {
                    operation: operation.clone(),
                    state,
                })
            }) as Callback<QueryResult<E>>
        });

        let operation = AsyncOperation::new(
            OperationKind::Load,
            query_name,
            user_state,
            supports_cancellation,
            LoadHooks {
                state: state.clone(),
            },
            callback,
        );
        Self { operation, state }
    }

    pub fn operation(&self) -> &AsyncOperation<QueryResult<E>> {
        &self.operation
    }

    delegate_to_operation!();

    pub fn query_name(&self) -> &str {
        self.operation.operation_name()
    }

    pub fn load_behavior(&self) -> LoadBehavior {
        self.state.behavior
    }

    fn with_loaded<R>(&self, f: impl FnOnce(&Loaded<E>) -> R) -> Option<R> {
        self.state
            .loaded
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(f)
    }

    /// The cached instances for the query's root entities, in result order.
    /// Empty until the load succeeds.
    pub fn entities(&self) -> Vec<EntityRef<E>> {
        self.with_loaded(|loaded| loaded.entities.clone())
            .unwrap_or_default()
    }

    /// Root and included entities, each instance once.
    pub fn all_entities(&self) -> Vec<EntityRef<E>> {
        if let Some(all_entities) = self.state.all_entities.get() {
            return all_entities.clone();
        }
        let Some(all_entities) = self.with_loaded(|loaded| {
            let mut seen = HashSet::new();
            loaded
                .entities
                .iter()
                .chain(loaded.included_entities.iter())
                .filter(|entity| seen.insert((*entity).clone()))
                .cloned()
                .collect::<Vec<_>>()
        }) else {
            return Vec::new();
        };
        self.state.all_entities.get_or_init(|| all_entities).clone()
    }

    /// The unpaged total, when the query asked for one and the transport
    /// reported it.
    pub fn total_entity_count(&self) -> Option<usize> {
        self.with_loaded(|loaded| loaded.total_count).flatten()
    }

    pub(crate) fn reply(&self) -> Reply<QueryResult<E>> {
        let operation = self.operation.clone();
        Reply::new(move |result: TransportResult<QueryResult<E>>| {
            let outcome = result.map_err(|error| {
                classify_transport_error(OperationKind::Load, operation.operation_name(), error)
            });
            operation.deliver(outcome);
        })
    }
}

impl<E: Entity> Clone for LoadOperation<E> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            state: self.state.clone(),
        }
    }
}
