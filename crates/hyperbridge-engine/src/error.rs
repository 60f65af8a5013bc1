//! Bridge error types
//!
//! Every fallible bridge operation has a `try_*` form returning
//! [`BridgeResult`]. The script-facing forms log the error through
//! `tracing` and hand the script a null/absent value instead.

use hyperbridge_types::NativeError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Class, method, constructor or field does not exist
    #[error("Not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// Candidates exist but none accepts the arguments
    #[error("No {member} matches arguments ({arguments})")]
    NoMatch {
        /// Member being resolved
        member: String,
        /// Runtime types of the supplied arguments
        arguments: String,
    },

    /// Object is not an instance of the requested type
    #[error("Cannot cast {from} to {to}")]
    CastFailure {
        /// Current reported type
        from: String,
        /// Requested type
        to: String,
    },

    /// The native member raised an error
    #[error("Error invoking {member}: {source}")]
    InvocationFailure {
        /// Member that was invoked
        member: String,
        /// Underlying native error
        #[source]
        source: NativeError,
    },

    /// Member or type exists but is not accessible or inheritable
    #[error("Access denied: {message}")]
    AccessFailure {
        /// Error message
        message: String,
    },

    /// Value cannot be carried across the bridge in this direction
    #[error("Cannot marshal value: {message}")]
    Marshal {
        /// Error message
        message: String,
    },

    /// Malformed request from the script side
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// The registration gate refused the call
    #[error("Bridge is not registered for this platform")]
    NotRegistered,

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BridgeError {
    /// Shorthand for [`BridgeError::NotFound`]
    pub fn not_found(what: impl Into<String>) -> Self {
        BridgeError::NotFound { what: what.into() }
    }

    /// Shorthand for [`BridgeError::Marshal`]
    pub fn marshal(message: impl Into<String>) -> Self {
        BridgeError::Marshal {
            message: message.into(),
        }
    }

    /// Shorthand for [`BridgeError::InvalidArgument`]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BridgeError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for [`BridgeError::AccessFailure`]
    pub fn access(message: impl Into<String>) -> Self {
        BridgeError::AccessFailure {
            message: message.into(),
        }
    }

    /// Classify an error raised while running `member` on the native side
    pub fn from_native(member: impl Into<String>, source: NativeError) -> Self {
        match source {
            NativeError::IllegalAccess { message } => BridgeError::AccessFailure { message },
            NativeError::NotInheritable { name, reason } => BridgeError::AccessFailure {
                message: format!("{} cannot be extended: {}", name, reason),
            },
            NativeError::TypeNotFound { name } => BridgeError::NotFound { what: name },
            source => BridgeError::InvocationFailure {
                member: member.into(),
                source,
            },
        }
    }

    /// Short machine-readable category, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::NotFound { .. } => "not_found",
            BridgeError::NoMatch { .. } => "no_match",
            BridgeError::CastFailure { .. } => "cast_failure",
            BridgeError::InvocationFailure { .. } => "invocation_failure",
            BridgeError::AccessFailure { .. } => "access_failure",
            BridgeError::Marshal { .. } => "marshal",
            BridgeError::InvalidArgument { .. } => "invalid_argument",
            BridgeError::NotRegistered => "not_registered",
            BridgeError::Config(_) => "config",
        }
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Log a failed operation and collapse it to `None` for script-facing APIs
pub(crate) fn report<T>(operation: &str, result: BridgeResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!(operation, kind = err.kind(), error = %err, "bridge operation failed");
            None
        }
    }
}
