use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured runtime error with a stable classification.
/// Construction goes through the kind-specific helpers so call sites
/// stay terse and the classification stays consistent.
///

#[derive(Clone, Debug, ThisError)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn index_not_found(name: impl fmt::Display) -> Self {
        Self::new(ErrorKind::IndexNotFound, format!("no index named {name}"))
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaMismatch, message)
    }

    pub fn tuple_decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TupleDecode, message)
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }
}

///
/// ErrorKind
///
/// Runtime error taxonomy.
///
/// `Transaction` wraps failures surfaced by the key-value layer; whether a
/// transaction error is retryable is decided by that layer, not here.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Malformed query input: empty AND, IN with zero values, limit of 0,
    /// ranked retrieval combined with an uncoverable filter.
    InvalidArgument,
    /// A query referenced an index name the metadata does not know.
    IndexNotFound,
    /// Record deserialization or field extraction failed.
    SchemaMismatch,
    /// An index key failed to decode under the expected subspace.
    TupleDecode,
    /// Propagated from the key-value layer.
    Transaction,
    /// Invariant violation inside the engine.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::IndexNotFound => "index_not_found",
            Self::SchemaMismatch => "schema_mismatch",
            Self::TupleDecode => "tuple_decode",
            Self::Transaction => "transaction",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
