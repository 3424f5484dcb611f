use crate::entity::LoadBehavior;

/// Contains Config properties which will be used by a [`DomainContext`]
///
/// [`DomainContext`]: crate::DomainContext
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// How loaded entities are merged into already cached instances when a
    /// load does not name a behavior of its own
    pub default_load_behavior: LoadBehavior,
    /// Ask the transport for the unpaged total on every load
    pub include_total_count: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_load_behavior: LoadBehavior::KeepCurrent,
            include_total_count: false,
        }
    }
}
