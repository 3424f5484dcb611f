/// Assert that an entity list, its tracked set and its membership agree:
/// every visible entity is a member and appears once
#[macro_export]
macro_rules! assert_list_consistent {
    ($list:expr) => {
        let visible = $list.to_vec();
        for (index, entity) in visible.iter().enumerate() {
            assert!(
                $list.is_member(entity),
                "Visible entity {:?} is not a member of the list",
                entity
            );
            assert_eq!(
                visible.iter().position(|other| other == entity),
                Some(index),
                "Entity {:?} is visible more than once",
                entity
            );
        }
    };
}

/// Assert that an `AsyncOperation` reached exactly one terminal state
#[macro_export]
macro_rules! assert_single_outcome {
    ($operation:expr) => {
        assert!(
            $operation.is_complete(),
            "Operation '{}' should be complete",
            $operation.operation_name()
        );
        let outcomes = [
            $operation.is_canceled(),
            $operation.has_error(),
            $operation.result().is_some(),
        ];
        assert_eq!(
            outcomes.iter().filter(|outcome| **outcome).count(),
            1,
            "Operation '{}' should have exactly one outcome (canceled, error, result): {:?}",
            $operation.operation_name(),
            outcomes
        );
    };
}
