use crate::test_entity::TestEntity;

/// Fluent builder for creating test entities
pub struct TestEntityBuilder {
    id: u64,
    name: String,
    version: u32,
}

impl TestEntityBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("entity-{}", id),
            version: 1,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the server-owned version counter
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Build the test entity
    pub fn build(self) -> TestEntity {
        TestEntity {
            id: self.id,
            name: self.name,
            version: self.version,
        }
    }
}

impl Default for TestEntityBuilder {
    fn default() -> Self {
        Self::new(1)
    }
}
