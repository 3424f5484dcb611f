use thiserror::Error;

use crate::ValidationResult;

/// Errors a transport reports for a call it could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Business error raised by the remote domain service. Passed through to
    /// the caller as-is.
    #[error("{message}")]
    Domain {
        message: String,
        error_code: i32,
    },

    /// The remote service refused access to the operation
    #[error("Access to the operation was denied: {message}")]
    Unauthorized {
        message: String,
    },

    /// The request as a whole failed server-side validation
    #[error("Server-side validation failed with {} error(s)", .0.len())]
    ValidationFailed(Vec<ValidationResult>),

    /// Anything else: connection loss, malformed response, timeouts
    #[error("{message}")]
    Infrastructure {
        message: String,
    },
}

impl TransportError {
    pub fn domain(message: impl Into<String>, error_code: i32) -> Self {
        TransportError::Domain {
            message: message.into(),
            error_code,
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        TransportError::Infrastructure {
            message: message.into(),
        }
    }
}
