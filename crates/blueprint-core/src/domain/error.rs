//! Domain-level error taxonomy for Blueprint.

/// Errors produced by raw source shape validation.
///
/// These are structural: they are detected before any cross-reference is
/// resolved.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("raw source must be a JSON object")]
    NotAnObject,

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("unknown source kind: {kind}")]
    UnknownKind { kind: String },

    #[error("source kind mismatch: file declares {expected}, document declares {actual}")]
    KindMismatch { expected: String, actual: String },

    #[error("invalid {what} '{value}': {reason}")]
    InvalidIdentifier {
        what: String,
        value: String,
        reason: String,
    },

    #[error("{kind} source is malformed: {message}")]
    Malformed { kind: String, message: String },

    #[error("{what} must not be empty")]
    Empty { what: String },
}

/// Blueprint domain errors.
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error("invalid descriptor key: {0}")]
    InvalidKey(String),

    #[error("invalid registry: {0}")]
    InvalidRegistry(String),

    #[error("digest error: {0}")]
    Digest(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Blueprint domain operations.
pub type Result<T> = std::result::Result<T, BlueprintError>;
