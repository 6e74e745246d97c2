use chainlens_enrichment_storage::StorageError;
use chainlens_grpc_dynamic::InvokeError;
use jsonrpsee::types::{ErrorCode, ErrorObjectOwned};
use thiserror::Error;

/// Errors surfaced by the [`JobQueue`](crate::JobQueue).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The key is empty or contains only whitespace.
    #[error("enrichment key must not be empty")]
    EmptyKey,

    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<QueueError> for ErrorObjectOwned {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::EmptyKey => {
                Self::owned(ErrorCode::InvalidParams.code(), err.to_string(), None::<()>)
            }
            QueueError::Storage(_) => Self::from(ErrorCode::InternalError),
        }
    }
}

/// Errors produced while resolving a single key.
///
/// Every variant is recorded on the backlog row as the failure message; retry policy lives in
/// the queue, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No resolver handles keys of this shape.
    #[error("unsupported enrichment key: {0}")]
    Unsupported(String),

    /// The key matched a resolver but its argument is malformed.
    #[error("invalid key {key}: {reason}")]
    InvalidKey {
        /// The offending key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The remote call failed.
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// The response lacked a field the resolver needs.
    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    /// A returned denom trace does not hash to the requested denom.
    #[error("denom trace hashes to {actual}, expected {expected}")]
    HashMismatch {
        /// Hash from the key.
        expected: String,
        /// Hash of the returned trace.
        actual: String,
    },

    /// A payload embedded in the response could not be decoded.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Errors surfaced by the [`ResolutionProcessor`](crate::ResolutionProcessor).
///
/// Resolver failures are not errors at this level; they are recorded on the backlog row.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProcessorError {
    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
