mod collection_change;
mod entity_list;
mod entity_source;
mod notifier;
mod observable_collection;
pub(crate) mod update_guard;

pub use collection_change::CollectionChange;
pub use entity_list::{EntityList, EntityListChange};
pub use entity_source::{EntitySource, SourceChange};
pub use notifier::{Notifier, Observer, Subscription};
pub use observable_collection::ObservableCollection;
