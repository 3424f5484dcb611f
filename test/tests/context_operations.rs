//! Integration tests for loads, invokes and rollback through a context
//!
//! Key invariants:
//! 1. Loaded values are merged by key according to the load behavior
//! 2. A canceled load abandons its transport call and never merges
//! 3. Callbacks see the operation in its terminal state, with its user state

use std::sync::{Arc, Mutex};

use ferry_client::{
    ClientConfig, DomainContext, EntityRef, EntityState, InvokeCallback, InvokeOperation,
    LoadBehavior, LoadCallback, LoadOperation, OperationErrorStatus, OperationFailure, UserState,
};
use ferry_shared::{EntityQuery, InvokeRequest, QueryResult, TransportError};
use ferry_test::{load_entities, new_context, MockTransport, TestEntity, TestEntityBuilder, TestValue};

fn query(name: &str) -> EntityQuery<TestValue> {
    EntityQuery::new(name)
}

#[test]
fn load_reaches_transport_and_tracks_activity() {
    let context = new_context();
    let operation = context.load(query("GetCities").with_parameter("limit", 10));
    assert!(context.is_loading());
    assert!(!operation.is_complete());

    let parked = context.transport().next_query().unwrap();
    assert_eq!(parked.query.query_name, "GetCities");
    assert_eq!(parked.query.parameters[0].value, 10);
    assert!(!parked.query.include_total_count);

    parked.send(Ok(QueryResult::new(vec![
        TestEntity::new(1, "Oslo"),
        TestEntity::new(2, "Lima"),
    ])));

    assert!(!context.is_loading());
    assert_eq!(operation.entities().len(), 2);
    assert_eq!(operation.total_entity_count(), None);
    assert_eq!(context.entity_set().len(), 2);
    assert_eq!(operation.entities()[1].state(), EntityState::Unmodified);
}

#[test]
fn repeated_loads_follow_the_load_behavior() {
    let context = new_context();
    let city = load_entities(&context, vec![TestEntity::new(1, "Oslo")]).remove(0);
    city.edit(|entity| entity.name = "local".to_string()).unwrap();

    let reload = |behavior: LoadBehavior, entity: TestEntity| {
        let operation = context.load_with(query("GetCities"), behavior, None, None);
        context
            .transport()
            .next_query()
            .unwrap()
            .send(Ok(QueryResult::new(vec![entity])));
        operation
    };

    let kept = reload(LoadBehavior::KeepCurrent, TestEntity::new(1, "ignored"));
    assert!(kept.entities()[0].ptr_eq(&city));
    assert_eq!(city.get().name, "local");

    reload(
        LoadBehavior::MergeIntoCurrent,
        TestEntityBuilder::new(1).name("merged").version(2).build(),
    );
    assert_eq!(city.get().name, "local");
    assert_eq!(city.original().unwrap().version, 2);
    assert_eq!(city.state(), EntityState::Modified);

    reload(
        LoadBehavior::RefreshCurrent,
        TestEntityBuilder::new(1).name("refreshed").version(3).build(),
    );
    assert_eq!(city.get().name, "refreshed");
    assert_eq!(city.state(), EntityState::Unmodified);
    assert_eq!(context.entity_set().len(), 1);
}

#[test]
fn configured_total_count_and_included_entities() {
    let context = DomainContext::with_config(
        MockTransport::new(),
        ClientConfig {
            include_total_count: true,
            ..ClientConfig::default()
        },
    );
    let operation = context.load(query("GetPage"));

    let parked = context.transport().next_query().unwrap();
    assert!(parked.query.include_total_count);
    parked.send(Ok(QueryResult::new(vec![TestEntity::new(1, "a")])
        .with_included(vec![TestEntity::new(2, "b"), TestEntity::new(1, "a")])
        .with_total_count(42)));

    assert_eq!(operation.total_entity_count(), Some(42));
    assert_eq!(operation.entities().len(), 1);
    let all = operation.all_entities();
    assert_eq!(all.len(), 2);
    assert_eq!(all, operation.all_entities());
}

#[test]
fn canceled_load_abandons_call_and_never_merges() {
    let context = DomainContext::new(MockTransport::cancellable());
    let callbacks = Arc::new(Mutex::new(Vec::new()));
    let seen = callbacks.clone();
    let callback: LoadCallback<TestEntity> =
        Box::new(move |operation: &LoadOperation<TestEntity>| {
            seen.lock().unwrap().push(operation.is_canceled());
        });
    let operation = context.load_with(
        query("GetCities"),
        LoadBehavior::KeepCurrent,
        Some(callback),
        None,
    );

    assert!(operation.can_cancel());
    operation.cancel().unwrap();
    assert_eq!(context.transport().abandoned_calls(), 1);
    assert!(!context.is_loading());

    context
        .transport()
        .next_query()
        .unwrap()
        .send(Ok(QueryResult::new(vec![TestEntity::new(1, "late")])));

    assert!(operation.is_canceled());
    assert!(operation.entities().is_empty());
    assert!(context.entity_set().is_empty());
    assert_eq!(*callbacks.lock().unwrap(), vec![true]);
}

#[test]
fn failed_load_is_wrapped_with_context() {
    let context = new_context();
    let operation = context.load(query("GetCities"));
    context
        .transport()
        .next_query()
        .unwrap()
        .send(Err(TransportError::infrastructure("timed out")));

    assert_eq!(
        operation.error().unwrap().to_string(),
        "Load operation 'GetCities' failed: timed out"
    );
    assert_eq!(operation.error_status(), Some(OperationErrorStatus::ServerError));
    assert!(operation.entities().is_empty());
    assert!(!context.is_loading());
}

#[test]
fn invoke_returns_value_to_callback_with_user_state() {
    let context = new_context();
    let observed = Arc::new(Mutex::new(None));
    let slot = observed.clone();
    let callback: InvokeCallback<TestValue> =
        Box::new(move |operation: &InvokeOperation<TestValue>| {
            let user_state = operation.user_state_as::<u32>().copied();
            *slot.lock().unwrap() = Some((operation.value(), user_state));
        });
    let user_state: UserState = Arc::new(99u32);
    let operation = context.invoke_with(
        InvokeRequest::new("CountOrders").with_parameter("customer", 7),
        Some(callback),
        Some(user_state),
    );

    let parked = context.transport().next_invoke().unwrap();
    assert_eq!(parked.request.operation_name, "CountOrders");
    assert!(parked.request.has_side_effects);
    parked.send(Ok(12));

    assert_eq!(operation.value(), Some(12));
    assert_eq!(*observed.lock().unwrap(), Some((Some(12), Some(99))));
}

#[test]
fn invoke_domain_errors_keep_their_code() {
    let context = new_context();
    let operation = context.invoke(InvokeRequest::new("Ship"));
    context
        .transport()
        .next_invoke()
        .unwrap()
        .send(Err(TransportError::domain("out of stock", 17)));

    assert_eq!(
        operation.error(),
        Some(OperationFailure::Domain {
            status: OperationErrorStatus::ServerError,
            message: "out of stock".to_string(),
            error_code: 17,
        })
    );
    assert_eq!(operation.value(), None);
}

#[test]
fn reject_changes_rolls_everything_back() {
    let context = new_context();
    let loaded = load_entities(
        &context,
        vec![TestEntity::new(1, "edited"), TestEntity::new(2, "deleted")],
    );
    loaded[0].edit(|entity| entity.name = "changed".to_string()).unwrap();
    context.entity_set().remove(&loaded[1]).unwrap();
    let added = EntityRef::new(TestEntity::new(3, "added"));
    context.entity_set().add(&added).unwrap();
    assert!(context.has_changes());

    context.reject_changes();

    assert!(!context.has_changes());
    assert_eq!(loaded[0].get().name, "edited");
    assert_eq!(loaded[0].state(), EntityState::Unmodified);
    assert_eq!(loaded[1].state(), EntityState::Unmodified);
    assert_eq!(added.state(), EntityState::Detached);
    assert!(context.entity_set().contains(&loaded[1]));
    assert!(!context.entity_set().contains(&added));
}
