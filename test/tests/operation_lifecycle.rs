//! Lifecycle tests for the asynchronous operation state machine
//!
//! Key invariants:
//! 1. Exactly one terminal state is ever observable
//! 2. An accepted cancellation is never overwritten by a late completion
//! 3. The completion callback runs exactly once, from whichever thread wins

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier,
};
use std::thread;

use ferry_client::{
    AsyncOperation, NoHooks, OperationError, OperationErrorStatus, OperationFailure,
    OperationKind, OperationProperty,
};
use ferry_test::{assert_single_outcome, ChangeRecorder};
use proptest::prelude::*;

fn counted_operation(supports_cancellation: bool) -> (AsyncOperation<u32>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let operation = AsyncOperation::new(
        OperationKind::Invoke,
        "Compute",
        None,
        supports_cancellation,
        NoHooks,
        Some(Box::new(move |_: &AsyncOperation<u32>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    );
    (operation, calls)
}

fn server_failure() -> OperationFailure {
    OperationFailure::Domain {
        status: OperationErrorStatus::ServerError,
        message: "boom".to_string(),
        error_code: 500,
    }
}

#[derive(Debug, Clone)]
enum Action {
    Succeed(u32),
    Fail,
    Cancel,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        any::<u32>().prop_map(Action::Succeed),
        Just(Action::Fail),
        Just(Action::Cancel),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Succeeded,
    Failed,
    Canceled,
}

fn terminal_of(operation: &AsyncOperation<u32>) -> Option<Terminal> {
    if operation.is_canceled() {
        Some(Terminal::Canceled)
    } else if operation.has_error() {
        Some(Terminal::Failed)
    } else if operation.result().is_some() {
        Some(Terminal::Succeeded)
    } else {
        None
    }
}

proptest! {
    /// Whatever sequence of completions and cancellations arrives, the first
    /// terminal transition sticks and the callback runs once
    #[test]
    fn prop_single_completion(actions in prop::collection::vec(action_strategy(), 1..12)) {
        let (operation, calls) = counted_operation(true);
        let mut first: Option<Terminal> = None;

        for action in actions {
            let outcome = match action {
                Action::Succeed(value) => operation.complete(Ok(value)),
                Action::Fail => operation.complete(Err(server_failure())),
                Action::Cancel => operation.cancel(),
            };

            match first {
                None => {
                    prop_assert!(outcome.is_ok());
                    first = terminal_of(&operation);
                    prop_assert!(first.is_some());
                }
                Some(Terminal::Canceled) if !matches!(action, Action::Cancel) => {
                    // late completions after a cancel are dropped silently
                    prop_assert!(outcome.is_ok());
                }
                Some(_) => {
                    prop_assert!(
                        matches!(outcome, Err(OperationError::AlreadyCompleted { .. })),
                        "expected AlreadyCompleted, got {:?}",
                        outcome
                    );
                }
            }
            prop_assert_eq!(terminal_of(&operation), first);
        }

        assert_single_outcome!(operation);
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// A result delivered after an accepted cancellation never surfaces
    #[test]
    fn prop_cancel_precedes_late_result(value in any::<u32>(), fail in any::<bool>()) {
        let (operation, calls) = counted_operation(true);
        prop_assert!(operation.cancel().is_ok());

        let late = if fail { Err(server_failure()) } else { Ok(value) };
        prop_assert!(operation.complete(late).is_ok());

        prop_assert!(operation.is_canceled());
        prop_assert!(operation.result().is_none());
        prop_assert!(operation.error().is_none());
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn non_cancellable_operation_rejects_cancel_and_still_completes() {
    let (operation, calls) = counted_operation(false);

    assert_eq!(
        operation.cancel(),
        Err(OperationError::CancellationNotSupported {
            operation: "Compute".to_string()
        })
    );
    assert!(!operation.is_complete());

    operation.complete(Ok(5)).unwrap();
    assert_single_outcome!(operation);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn cancel_raises_canceled_then_complete() {
    let (operation, _calls) = counted_operation(true);
    let (recorder, _subscription) =
        ChangeRecorder::<OperationProperty>::attach(|recorder| operation.subscribe(recorder));

    operation.cancel().unwrap();

    assert_eq!(
        recorder.events(),
        vec![OperationProperty::IsCanceled, OperationProperty::IsComplete]
    );
}

#[test]
fn failure_raises_error_property() {
    let (operation, _calls) = counted_operation(false);
    let (recorder, _subscription) =
        ChangeRecorder::<OperationProperty>::attach(|recorder| operation.subscribe(recorder));

    operation.complete(Err(server_failure())).unwrap();

    assert_eq!(
        recorder.events(),
        vec![OperationProperty::Error, OperationProperty::IsComplete]
    );
    assert_eq!(operation.error().unwrap().to_string(), "boom");
}

#[test]
fn racing_completion_and_cancel_across_threads() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();

    for round in 0..50u32 {
        let (operation, calls) = counted_operation(true);
        let barrier = Arc::new(Barrier::new(3));

        let handles: Vec<_> = (0..3)
            .map(|thread_index| {
                let operation = operation.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    match thread_index {
                        0 => operation.cancel().is_ok(),
                        1 => operation.complete(Ok(round)).is_ok(),
                        _ => operation.complete(Err(server_failure())).is_ok(),
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_single_outcome!(operation);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "round {}", round);
    }
}
