//! Native reflection errors

use thiserror::Error;

/// Errors raised by the host reflection facility
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NativeError {
    /// No type is registered under the requested name or id
    #[error("Type not found: {name}")]
    TypeNotFound {
        /// Name (or id) that was looked up
        name: String,
    },

    /// A type with the same name is already registered
    #[error("Duplicate type: {name}")]
    DuplicateType {
        /// Name that collided
        name: String,
    },

    /// Member lookup failed
    #[error("No such member: {member}")]
    NoSuchMember {
        /// Description of the missing member
        member: String,
    },

    /// Argument count or type does not fit the member signature
    #[error("Illegal argument: {message}")]
    IllegalArgument {
        /// Error message
        message: String,
    },

    /// The member exists but may not be used this way
    #[error("Illegal access: {message}")]
    IllegalAccess {
        /// Error message
        message: String,
    },

    /// Instance member invoked without a receiver
    #[error("Null receiver for instance member {member}")]
    NullReceiver {
        /// Member that needed a receiver
        member: String,
    },

    /// Method has no implementation anywhere in the receiver's hierarchy
    #[error("Abstract method invoked: {method}")]
    AbstractMethod {
        /// Method description
        method: String,
    },

    /// Type cannot be instantiated (interface, abstract, primitive)
    #[error("Type is not instantiable: {name}")]
    NotInstantiable {
        /// Type name
        name: String,
    },

    /// Type cannot be used as a base for a generated subclass
    #[error("Type is not inheritable: {name} ({reason})")]
    NotInheritable {
        /// Type name
        name: String,
        /// Why generation was refused
        reason: String,
    },

    /// A method or constructor body raised an error
    #[error("{message}")]
    Thrown {
        /// Error message
        message: String,
    },
}

impl NativeError {
    /// Shorthand for [`NativeError::IllegalArgument`]
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        NativeError::IllegalArgument {
            message: message.into(),
        }
    }

    /// Shorthand for [`NativeError::Thrown`]
    pub fn thrown(message: impl Into<String>) -> Self {
        NativeError::Thrown {
            message: message.into(),
        }
    }
}

/// Result type for native reflection operations
pub type NativeResult<T> = Result<T, NativeError>;
