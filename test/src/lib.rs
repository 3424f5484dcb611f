
pub use helpers::*;
pub use mock_transport::{MockTransport, ParkedInvoke, ParkedQuery, ParkedSubmit};
pub use test_entity::{TestEntity, TestValue};
