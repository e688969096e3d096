use std::fmt::{Display, Formatter};

/// The handler operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Find,
    Read,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Open => "open",
            Operation::Find => "find",
            Operation::Read => "read",
        };
        write!(f, "{name}")
    }
}

/// The internal error type for all errors related to catalog handlers and their backends.
///
/// This includes problems with the initialization of a handler (e.g., invalid options) as well
/// as failures of the backend while searching for or reading catalogs (connectivity,
/// permissions, timeouts of the backend client). Handlers never use this type to signal that a
/// catalog does not exist.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The handler could not be initialized because of a problem.
    #[error("failed to initialize {handler_type} handler: {cause}")]
    FailedInitialization {
        /// The type of handler that failed.
        handler_type: &'static str,
        /// The cause of the error.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The backend of the handler failed during an operation.
    #[error("{handler_type} handler failed to {operation} '{target}': {cause}")]
    FailedAccess {
        /// The type of handler that failed.
        handler_type: &'static str,
        /// The operation that failed.
        operation: Operation,
        /// The candidate path or locale directory that was accessed.
        target: String,
        /// The cause of the error.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The handler was asked to read without a previous open.
    #[error("{handler_type} handler has no open catalog")]
    NotOpen {
        /// The type of handler that failed.
        handler_type: &'static str,
    },
}

impl Error {
    /// Creates an initialization error for a handler type.
    pub fn initialization(
        handler_type: &'static str,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::FailedInitialization {
            handler_type,
            cause: cause.into(),
        }
    }

    /// Creates an access error for a handler operation on `target`.
    pub fn access(
        handler_type: &'static str,
        operation: Operation,
        target: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::FailedAccess {
            handler_type,
            operation,
            target: target.into(),
            cause: cause.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
