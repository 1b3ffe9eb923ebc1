//! Error types raised by the save-game store.
//!
//! Each layer has its own enum: [`SchemaError`] for loading the message
//! schema, [`CodecError`] for turning bytes into records and back, and
//! [`StoreError`] for everything the services and gateway surface. Callers at
//! the routing boundary only need [`StoreError::kind`].
use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures while loading or validating the message schema.
///
/// Cloneable so the registry can hand the same cached failure to every caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema source {} does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read schema source {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("failed to compile schema {}: {message}", path.display())]
    Compile { path: PathBuf, message: String },

    #[error("invalid descriptor set {}: {message}", path.display())]
    Descriptor { path: PathBuf, message: String },

    #[error("message type {name} is not defined by the schema")]
    MissingMessage { name: String },

    #[error("message type {message} has no field {field}")]
    MissingField { message: String, field: String },

    #[error("field {message}.{field} must be {expected}")]
    FieldKind {
        message: String,
        field: String,
        expected: &'static str,
    },
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Failures while decoding or encoding a single record.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed {message_type} record")]
    Decode {
        message_type: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("record of type {actual} cannot be encoded as {expected}")]
    MessageTypeMismatch { expected: String, actual: String },

    #[error("field {message_type}.{field} is not {expected}")]
    FieldKind {
        message_type: String,
        field: String,
        expected: &'static str,
    },

    #[error("value {value} does not fit field {field}")]
    OutOfRange { field: String, value: i64 },
}

/// Errors surfaced by the store, the services and the gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid entity id {id:?}: {reason}")]
    InvalidEntityId { id: String, reason: &'static str },

    #[error("either donuts or cash must be provided")]
    EmptyUpdate,

    #[error("{message_type} record not found at {}", path.display())]
    NotFound { message_type: String, path: PathBuf },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("schema unavailable: {0}")]
    Schema(#[from] SchemaError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("entity lock table was poisoned")]
    LockPoisoned,

    #[error("blocking store task failed")]
    TaskJoin(#[source] tokio::task::JoinError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify the error for the routing layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidEntityId { .. } | StoreError::EmptyUpdate => ErrorKind::Validation,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Codec(_)
            | StoreError::Schema(_)
            | StoreError::Io { .. }
            | StoreError::LockPoisoned
            | StoreError::TaskJoin(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Coarse error classes exposed to callers of the gateway.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request rejected before any I/O.
    Validation,
    /// A required save file is absent. Expected for first-time players.
    NotFound,
    /// Anything else: malformed files, filesystem or schema failures.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", label)
    }
}
