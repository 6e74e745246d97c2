//! Error types of the dynamic client.

use crate::descriptor::DescriptorKind;
use thiserror::Error;

/// Errors returned by the [`TypeRegistry`](crate::TypeRegistry).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No type has been declared under this name.
    #[error("type not found: {0}")]
    NotFound(String),

    /// A type exists under this name but is of another kind.
    #[error("{name} is a {found}, expected a {expected}")]
    KindMismatch {
        /// The looked up name.
        name: String,
        /// The kind the caller asked for.
        expected: DescriptorKind,
        /// The kind that is registered.
        found: DescriptorKind,
    },

    /// The service is known but does not declare the method.
    #[error("service {service} has no method {method}")]
    MethodNotFound {
        /// Fully qualified service name.
        service: String,
        /// Method name.
        method: String,
    },
}

/// A failed network exchange with the remote node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport error (code {code}): {message}")]
pub struct TransportError {
    /// gRPC status code.
    pub code: i32,
    /// Status message reported by the transport or the remote.
    pub message: String,
}

impl TransportError {
    /// gRPC `INVALID_ARGUMENT`.
    pub const INVALID_ARGUMENT: i32 = 3;
    /// gRPC `DEADLINE_EXCEEDED`.
    pub const DEADLINE_EXCEEDED: i32 = 4;
    /// gRPC `UNAVAILABLE`.
    pub const UNAVAILABLE: i32 = 14;
    /// gRPC `INTERNAL`.
    pub const INTERNAL: i32 = 13;

    /// Creates a new [`TransportError`].
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<tonic::Status> for TransportError {
    fn from(status: tonic::Status) -> Self {
        Self { code: status.code() as i32, message: status.message().to_string() }
    }
}

/// Errors returned while fetching descriptors from the reflection service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReflectionError {
    /// The remote answered with an error response, typically because it does not know the symbol.
    #[error("reflection error {code}: {message}")]
    Remote {
        /// Error code reported by the remote.
        code: i32,
        /// Error message reported by the remote.
        message: String,
    },

    /// The reflection exchange itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A returned descriptor blob could not be parsed.
    #[error("invalid file descriptor: {0}")]
    InvalidDescriptor(String),

    /// The stream ended before any descriptor or error response.
    #[error("reflection stream closed without a response")]
    NoResponse,

    /// The remote answered with a response of the wrong kind.
    #[error("unexpected reflection response: {0}")]
    UnexpectedResponse(&'static str),
}

/// Errors returned by the dynamic encoder and decoder.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A referenced type is not present in the registry. Loading it and retrying may succeed.
    #[error("referenced type not loaded: {0}")]
    TypeNotFound(String),

    /// The payload does not match its descriptor.
    #[error("malformed payload for {type_name}: {reason}")]
    Malformed {
        /// Message being decoded.
        type_name: String,
        /// What went wrong.
        reason: String,
    },

    /// A request parameter names no field of the message.
    #[error("unknown field {field} on {type_name}")]
    UnknownField {
        /// Message being encoded.
        type_name: String,
        /// The offending parameter.
        field: String,
    },

    /// A request parameter has a value that does not fit its field.
    #[error("invalid value for {type_name}.{field}: {reason}")]
    InvalidValue {
        /// Message being encoded.
        type_name: String,
        /// The offending field.
        field: String,
        /// What went wrong.
        reason: String,
    },

    /// The registry holds a type of a different kind under the referenced name.
    #[error(transparent)]
    Registry(RegistryError),
}

impl CodecError {
    pub(crate) fn malformed(type_name: &str, reason: impl Into<String>) -> Self {
        Self::Malformed { type_name: type_name.to_string(), reason: reason.into() }
    }

    pub(crate) fn invalid(type_name: &str, field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            type_name: type_name.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<RegistryError> for CodecError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(name) => Self::TypeNotFound(name),
            other => Self::Registry(other),
        }
    }
}

/// Errors returned by [`DynamicClient::call`](crate::DynamicClient::call).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    /// The method could not be resolved even after loading its service.
    #[error("method not found: {service}/{method}")]
    MethodNotFound {
        /// Fully qualified service name.
        service: String,
        /// Method name.
        method: String,
    },

    /// A type could not be resolved even after loading it.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// Loading a descriptor failed.
    #[error(transparent)]
    Reflection(#[from] ReflectionError),

    /// The unary call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The remote returned an empty body.
    #[error("empty response from {path}")]
    EmptyResponse {
        /// The called path.
        path: String,
    },

    /// Too many nested missing-type loads for a single payload.
    #[error("decode depth exceeded after {depth} type loads, last missing type {type_name}")]
    DecodeDepthExceeded {
        /// Number of loads performed.
        depth: usize,
        /// The type still missing when the ceiling was hit.
        type_name: String,
    },

    /// The method streams, which the unary invoker does not support.
    #[error("method {0} is not unary")]
    NotUnary(String),

    /// Encoding or decoding failed for a reason other than a missing type.
    #[error(transparent)]
    Codec(CodecError),
}
