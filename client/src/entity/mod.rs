mod change_set;
mod entity_ref;
mod entity_set;
mod entity_state;
mod load_behavior;

pub use change_set::EntityChangeSet;
pub use entity_ref::EntityRef;
pub use entity_set::{EntitySet, EntitySetChange};
pub use entity_state::EntityState;
pub use load_behavior::LoadBehavior;
