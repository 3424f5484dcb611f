use std::sync::Weak;

use ferry_shared::Entity;

use crate::{
    collections::{
        collection_change::CollectionChange,
        notifier::{Observer, Subscription},
        observable_collection::ObservableCollection,
    },
    entity::EntityRef,
};

pub type SourceChange<E> = CollectionChange<EntityRef<E>>;

/// An externally owned sequence of entities an [`EntityList`] mirrors.
///
/// Sources that can report their own changes return a subscription from
/// `subscribe`; static sources are read once per rebind.
///
/// [`EntityList`]: crate::collections::EntityList
pub trait EntitySource<E: Entity>: Send + Sync {
    fn snapshot(&self) -> Vec<EntityRef<E>>;

    fn contains(&self, entity: &EntityRef<E>) -> bool {
        self.snapshot().contains(entity)
    }

    fn subscribe(&self, observer: Weak<dyn Observer<SourceChange<E>>>) -> Option<Subscription> {
        let _ = observer;
        None
    }
}

impl<E: Entity> EntitySource<E> for Vec<EntityRef<E>> {
    fn snapshot(&self) -> Vec<EntityRef<E>> {
        self.clone()
    }

    fn contains(&self, entity: &EntityRef<E>) -> bool {
        self.as_slice().contains(entity)
    }
}

impl<E: Entity> EntitySource<E> for ObservableCollection<EntityRef<E>> {
    fn snapshot(&self) -> Vec<EntityRef<E>> {
        self.to_vec()
    }

    fn contains(&self, entity: &EntityRef<E>) -> bool {
        ObservableCollection::contains(self, entity)
    }

    fn subscribe(&self, observer: Weak<dyn Observer<SourceChange<E>>>) -> Option<Subscription> {
        Some(self.notifier().subscribe_weak(observer))
    }
}
