use ferry_client::{DomainContext, EntityRef};
use ferry_shared::{EntityQuery, QueryResult};

use crate::{
    mock_transport::MockTransport,
    test_entity::{TestEntity, TestValue},
};

pub type TestContext = DomainContext<MockTransport>;

pub fn new_context() -> TestContext {
    DomainContext::new(MockTransport::new())
}

/// Loads `entities` into the context's tracked set through a full round trip
/// and returns the cached instances
pub fn load_entities(
    context: &TestContext,
    entities: Vec<TestEntity>,
) -> Vec<EntityRef<TestEntity>> {
    let operation = context.load(EntityQuery::<TestValue>::new("GetEntities"));
    context
        .transport()
        .next_query()
        .expect("load should reach the transport")
        .send(Ok(QueryResult::new(entities)));
    assert!(operation.is_complete(), "load should complete on reply");
    operation.entities()
}
