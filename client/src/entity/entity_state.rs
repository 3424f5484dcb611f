use std::fmt;

/// Where an entity stands relative to the tracked set and the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Not tracked by any entity set.
    Detached,
    /// Added locally, not yet submitted.
    New,
    /// Tracked with no pending changes.
    Unmodified,
    /// Tracked with pending property changes.
    Modified,
    /// Removed locally, deletion not yet submitted.
    Deleted,
}

impl EntityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Detached => "Detached",
            EntityState::New => "New",
            EntityState::Unmodified => "Unmodified",
            EntityState::Modified => "Modified",
            EntityState::Deleted => "Deleted",
        }
    }

    pub fn is_tracked(&self) -> bool {
        !matches!(self, EntityState::Detached)
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
