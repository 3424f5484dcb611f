/// Describes one mutation of an ordered collection.
///
/// Indices refer to the collection as it was just before the change for
/// removals and just after the change for additions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionChange<T> {
    Add {
        index: usize,
        items: Vec<T>,
    },
    Remove {
        index: usize,
        items: Vec<T>,
    },
    Replace {
        index: usize,
        old_items: Vec<T>,
        new_items: Vec<T>,
    },
    /// The collection changed too much to describe; re-read it.
    Reset,
}

impl<T> CollectionChange<T> {
    pub fn added(index: usize, item: T) -> Self {
        CollectionChange::Add {
            index,
            items: vec![item],
        }
    }

    pub fn removed(index: usize, item: T) -> Self {
        CollectionChange::Remove {
            index,
            items: vec![item],
        }
    }

    pub fn replaced(index: usize, old_item: T, new_item: T) -> Self {
        CollectionChange::Replace {
            index,
            old_items: vec![old_item],
            new_items: vec![new_item],
        }
    }
}
