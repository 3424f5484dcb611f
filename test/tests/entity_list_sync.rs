//! Integration tests for keeping an entity list, its tracked set and its
//! source consistent
//!
//! Key invariants:
//! 1. Every visible entity is a member of the list and appears once
//! 2. Every visible entity comes from the source or the tracked set
//! 3. Caller additions reach the tracked set, caller removals leave it
//! 4. Propagation never re-enters the list, whatever order changes arrive in
//! 5. Rebinding the source leaves exactly the new source's entities
//! 6. Source insertions keep the source's relative order, even when earlier
//!    source entities are hidden

use ferry_client::{
    CollectionChange, EntityList, EntityListChange, EntityRef, EntitySet, EntitySetChange,
    EntityState, ObservableCollection,
};
use ferry_test::{assert_list_consistent, load_entities, new_context, ChangeRecorder, TestEntity};
use proptest::prelude::*;

#[test]
fn caller_add_reaches_tracked_set_once() {
    let context = new_context();
    let loaded = load_entities(
        &context,
        vec![TestEntity::new(1, "x"), TestEntity::new(2, "y")],
    );
    let (x, y) = (loaded[0].clone(), loaded[1].clone());
    let list = context
        .entity_list_with_source(vec![x.clone(), y.clone()])
        .unwrap();

    let (list_changes, _list_subscription) =
        ChangeRecorder::<EntityListChange<TestEntity>>::attach(|recorder| list.subscribe(recorder));
    let (set_changes, _set_subscription) = ChangeRecorder::<EntitySetChange<TestEntity>>::attach(
        |recorder| context.entity_set().subscribe(recorder),
    );

    let z = EntityRef::new(TestEntity::new(3, "z"));
    list.add(&z).unwrap();

    let tracked = context.entity_set().to_vec();
    assert_eq!(tracked, vec![x.clone(), y.clone(), z.clone()]);
    assert_eq!(z.state(), EntityState::New);
    assert!(list.is_member(&x) && list.is_member(&y) && list.is_member(&z));
    assert_eq!(list.member_count(), 3);
    assert_eq!(list.to_vec(), vec![x, y, z.clone()]);

    assert_eq!(list_changes.events(), vec![CollectionChange::added(2, z.clone())]);
    assert_eq!(set_changes.events(), vec![CollectionChange::added(2, z)]);
    assert_list_consistent!(list);
}

#[test]
fn rollback_resurfaces_only_members() {
    let context = new_context();
    let loaded = load_entities(
        &context,
        vec![
            TestEntity::new(1, "in-list"),
            TestEntity::new(2, "elsewhere"),
        ],
    );
    let list = context
        .entity_list_with_source(vec![loaded[0].clone()])
        .unwrap();

    list.remove(&loaded[0]).unwrap();
    context.entity_set().remove(&loaded[1]).unwrap();
    assert!(list.is_empty());

    context.reject_changes();

    assert_eq!(list.to_vec(), vec![loaded[0].clone()]);
    assert!(!list.contains(&loaded[1]));
    assert_eq!(context.entity_set().len(), 2);
}

#[test]
fn clearing_tracked_set_empties_list() {
    let context = new_context();
    let loaded = load_entities(&context, vec![TestEntity::new(1, "a")]);
    let source = ObservableCollection::from_vec(loaded.clone());
    let list = context.entity_list_with_source(source.clone()).unwrap();

    context.entity_set().clear();
    assert!(list.is_empty());
    assert!(list.is_member(&loaded[0]));

    // the source still drives the list
    source.reset(loaded.clone());
    assert_eq!(list.to_vec(), loaded);
}

#[test]
fn two_lists_share_one_tracked_set() {
    let context = new_context();
    let loaded = load_entities(
        &context,
        vec![TestEntity::new(1, "a"), TestEntity::new(2, "b")],
    );
    let left = context.entity_list_with_source(loaded.clone()).unwrap();
    let right = context.entity_list_with_source(loaded.clone()).unwrap();

    left.remove(&loaded[0]).unwrap();
    assert_eq!(right.to_vec(), vec![loaded[1].clone()]);

    let fresh = EntityRef::new(TestEntity::new(3, "c"));
    right.add(&fresh).unwrap();
    // not a member of the left list
    assert!(!left.contains(&fresh));
    assert!(context.entity_set().contains(&fresh));
}

#[test]
fn source_positions_skip_hidden_entities() {
    let context = new_context();
    let loaded = load_entities(
        &context,
        (1..=5).map(|id| TestEntity::new(id, format!("e{}", id))).collect(),
    );
    let (e1, e2, e3, e4, e5) = (
        loaded[0].clone(),
        loaded[1].clone(),
        loaded[2].clone(),
        loaded[3].clone(),
        loaded[4].clone(),
    );
    let source = ObservableCollection::from_vec(vec![e1.clone(), e2.clone(), e3.clone()]);
    let list = context.entity_list_with_source(source.clone()).unwrap();

    list.remove(&e2).unwrap();
    assert_eq!(list.to_vec(), vec![e1.clone(), e3.clone()]);

    let (list_changes, _subscription) =
        ChangeRecorder::<EntityListChange<TestEntity>>::attach(|recorder| list.subscribe(recorder));

    // source is now [e1, e2, e4, e3] with e2 hidden
    source.insert(2, e4.clone()).unwrap();
    assert_eq!(list.to_vec(), vec![e1.clone(), e4.clone(), e3.clone()]);
    assert_eq!(list_changes.events(), vec![CollectionChange::added(1, e4.clone())]);

    // replacing the hidden e2 places e5 right after e1
    source.replace(1, e5.clone()).unwrap();
    assert_eq!(list.to_vec(), vec![e1, e5, e4, e3]);
    assert!(!list.is_member(&e2));
    assert_list_consistent!(list);
}

const POOL_SIZE: usize = 6;

#[derive(Debug, Clone)]
enum Step {
    SourcePush(usize),
    SourceRemoveAt(usize),
    SourceReplace(usize, usize),
    SourceReset(Vec<usize>),
    SetAddNew,
    SetRemove(usize),
    SetDetach(usize),
    SetReject,
    ListAddNew,
    ListRemoveAt(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let index = 0..POOL_SIZE;
    prop_oneof![
        index.clone().prop_map(Step::SourcePush),
        any::<usize>().prop_map(Step::SourceRemoveAt),
        (any::<usize>(), index.clone()).prop_map(|(at, pick)| Step::SourceReplace(at, pick)),
        prop::collection::vec(index.clone(), 0..POOL_SIZE).prop_map(Step::SourceReset),
        Just(Step::SetAddNew),
        index.clone().prop_map(Step::SetRemove),
        index.prop_map(Step::SetDetach),
        Just(Step::SetReject),
        Just(Step::ListAddNew),
        any::<usize>().prop_map(Step::ListRemoveAt),
    ]
}

fn pool(set: &EntitySet<TestEntity>) -> Vec<EntityRef<TestEntity>> {
    set.load(
        (0..POOL_SIZE as u64)
            .map(|id| TestEntity::new(id, format!("pool-{}", id)))
            .collect(),
        Default::default(),
    )
}

fn check_list(
    list: &EntityList<TestEntity>,
    source: &ObservableCollection<EntityRef<TestEntity>>,
    set: &EntitySet<TestEntity>,
) -> Result<(), TestCaseError> {
    assert_list_consistent!(list);
    for entity in list.to_vec() {
        prop_assert!(
            source.contains(&entity) || set.contains(&entity),
            "visible entity {:?} is neither in the source nor tracked",
            entity
        );
    }
    Ok(())
}

proptest! {
    /// Any interleaving of source, tracked set and list mutations settles
    /// with the three collections consistent
    #[test]
    fn prop_sync_reaches_fixed_point(steps in prop::collection::vec(step_strategy(), 1..40)) {
        let set = EntitySet::new();
        let pool = pool(&set);
        let source = ObservableCollection::from_vec(pool[..2].to_vec());
        let list = EntityList::with_source(&set, source.clone()).unwrap();
        let mut next_id = 1000u64;

        for step in steps {
            match step {
                Step::SourcePush(pick) => source.push(pool[pick].clone()),
                Step::SourceRemoveAt(at) => {
                    if !source.is_empty() {
                        source.remove_at(at % source.len()).unwrap();
                    }
                }
                Step::SourceReplace(at, pick) => {
                    if !source.is_empty() {
                        source.replace(at % source.len(), pool[pick].clone()).unwrap();
                    }
                }
                Step::SourceReset(picks) => {
                    source.reset(picks.into_iter().map(|pick| pool[pick].clone()).collect());
                }
                Step::SetAddNew => {
                    next_id += 1;
                    set.add(&EntityRef::new(TestEntity::new(next_id, "set"))).unwrap();
                }
                Step::SetRemove(pick) => {
                    if set.contains(&pool[pick]) {
                        set.remove(&pool[pick]).unwrap();
                    }
                }
                Step::SetDetach(pick) => {
                    let _ = set.detach(&pool[pick]);
                }
                Step::SetReject => set.reject_changes(),
                Step::ListAddNew => {
                    next_id += 1;
                    let entity = EntityRef::new(TestEntity::new(next_id, "list"));
                    list.add(&entity).unwrap();
                    prop_assert!(set.contains(&entity));
                    prop_assert!(list.contains(&entity));
                }
                Step::ListRemoveAt(at) => {
                    if !list.is_empty() {
                        let removed = list.remove_at(at % list.len()).unwrap();
                        prop_assert!(!set.contains(&removed));
                        prop_assert!(!list.contains(&removed));
                    }
                }
            }
            check_list(&list, &source, &set)?;
        }
    }

    /// Rebinding leaves exactly the new source's entities, each once
    #[test]
    fn prop_rebinding_resets_cleanly(
        first in prop::collection::vec(0..POOL_SIZE, 0..10),
        second in prop::collection::vec(0..POOL_SIZE, 0..10),
    ) {
        let set = EntitySet::new();
        let pool = pool(&set);
        let pick = |indices: &[usize]| -> Vec<EntityRef<TestEntity>> {
            indices.iter().map(|index| pool[*index].clone()).collect()
        };

        let list = EntityList::with_source(&set, pick(&first)).unwrap();
        list.add(&EntityRef::new(TestEntity::new(99, "extra"))).unwrap();
        list.set_source(ObservableCollection::from_vec(pick(&second))).unwrap();

        let mut expected: Vec<EntityRef<TestEntity>> = Vec::new();
        for entity in pick(&second) {
            if !expected.contains(&entity) {
                expected.push(entity);
            }
        }
        prop_assert_eq!(list.to_vec(), expected.clone());
        prop_assert_eq!(list.member_count(), expected.len());
        for entity in pick(&first) {
            prop_assert_eq!(list.is_member(&entity), expected.contains(&entity));
        }
    }
}
