use std::fmt;

/// A single validation failure reported against an entity or an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidationResult {
    message: String,
    member_names: Vec<String>,
}

impl ValidationResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            member_names: Vec::new(),
        }
    }

    pub fn for_members<I, S>(message: impl Into<String>, member_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: message.into(),
            member_names: member_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Names of the members this result applies to. Empty for entity-level
    /// or operation-level failures.
    pub fn member_names(&self) -> &[String] {
        &self.member_names
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.member_names.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} ({})", self.message, self.member_names.join(", "))
        }
    }
}
