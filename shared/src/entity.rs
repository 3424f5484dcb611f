use std::{fmt::Debug, hash::Hash};

/// A value type the remote domain service knows how to load and persist.
///
/// Entities are plain data. Identity on the client is carried by the handle
/// that wraps them, while `key` is the identity the server uses to match
/// loaded instances against ones already cached.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}

/// A named custom method to run against an entity as part of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityAction {
    name: String,
}

impl EntityAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
