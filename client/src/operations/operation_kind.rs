use std::fmt;

/// Which kind of request an operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Load,
    Submit,
    Invoke,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Load => "Load",
            OperationKind::Submit => "Submit",
            OperationKind::Invoke => "Invoke",
        };
        f.write_str(name)
    }
}

/// Raised through an operation's notifier whenever one of its observable
/// properties changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationProperty {
    IsComplete,
    IsCanceled,
    Error,
    Result,
}
