/// How loaded entities are merged into instances already cached in the
/// tracked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadBehavior {
    /// Cached instances are left untouched.
    #[default]
    KeepCurrent,
    /// Unmodified instances take the loaded values; modified instances keep
    /// their local edits and take the loaded values as their new original.
    MergeIntoCurrent,
    /// Cached instances take the loaded values and lose any local edits.
    RefreshCurrent,
}
