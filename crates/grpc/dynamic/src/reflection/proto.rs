//! The server reflection protocol, the one schema known ahead of time.
//!
//! `grpc.reflection.v1alpha` and `grpc.reflection.v1` share message shapes and differ only in
//! the service path. Only the request and response kinds the loader uses are declared; other
//! response kinds decode as unknown fields.

use std::{fmt, str::FromStr};

/// A reflection request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ServerReflectionRequest {
    /// Host the request is for. Unused by most servers.
    #[prost(string, tag = "1")]
    pub host: String,
    /// What to look up.
    #[prost(oneof = "MessageRequest", tags = "3, 4, 7")]
    pub message_request: Option<MessageRequest>,
}

impl ServerReflectionRequest {
    /// A request for the file declaring `symbol` and its dependencies.
    pub fn file_containing_symbol(symbol: impl Into<String>) -> Self {
        Self {
            host: String::new(),
            message_request: Some(MessageRequest::FileContainingSymbol(symbol.into())),
        }
    }

    /// A request for a file by its name and its dependencies.
    pub fn file_by_filename(filename: impl Into<String>) -> Self {
        Self {
            host: String::new(),
            message_request: Some(MessageRequest::FileByFilename(filename.into())),
        }
    }

    /// A request for the names of every exposed service.
    pub fn list_services() -> Self {
        Self { host: String::new(), message_request: Some(MessageRequest::ListServices(String::new())) }
    }
}

/// The lookup carried by a [`ServerReflectionRequest`].
#[derive(Clone, PartialEq, Eq, prost::Oneof)]
pub enum MessageRequest {
    /// Look up a file by name.
    #[prost(string, tag = "3")]
    FileByFilename(String),
    /// Look up the file declaring a fully qualified symbol.
    #[prost(string, tag = "4")]
    FileContainingSymbol(String),
    /// List services. The payload is ignored.
    #[prost(string, tag = "7")]
    ListServices(String),
}

/// A reflection response.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ServerReflectionResponse {
    /// Host the response is for.
    #[prost(string, tag = "1")]
    pub valid_host: String,
    /// Echo of the request.
    #[prost(message, optional, tag = "2")]
    pub original_request: Option<ServerReflectionRequest>,
    /// The answer.
    #[prost(oneof = "MessageResponse", tags = "4, 6, 7")]
    pub message_response: Option<MessageResponse>,
}

/// The answer carried by a [`ServerReflectionResponse`].
#[derive(Clone, PartialEq, prost::Oneof)]
pub enum MessageResponse {
    /// Serialized `FileDescriptorProto` records.
    #[prost(message, tag = "4")]
    FileDescriptorResponse(FileDescriptorResponse),
    /// Exposed services.
    #[prost(message, tag = "6")]
    ListServicesResponse(ListServiceResponse),
    /// The lookup failed.
    #[prost(message, tag = "7")]
    ErrorResponse(ErrorResponse),
}

/// Serialized descriptor files, the requested one first.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FileDescriptorResponse {
    /// Encoded `google.protobuf.FileDescriptorProto` records.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub file_descriptor_proto: Vec<Vec<u8>>,
}

/// Services exposed by the server.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ListServiceResponse {
    /// One entry per service.
    #[prost(message, repeated, tag = "1")]
    pub service: Vec<ServiceResponse>,
}

/// A single exposed service.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ServiceResponse {
    /// Fully qualified service name.
    #[prost(string, tag = "1")]
    pub name: String,
}

/// A failed lookup.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ErrorResponse {
    /// gRPC status code.
    #[prost(int32, tag = "1")]
    pub error_code: i32,
    /// Human readable description.
    #[prost(string, tag = "2")]
    pub error_message: String,
}

/// Which revision of the reflection service to talk to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReflectionVersion {
    /// `grpc.reflection.v1alpha`, served by every Cosmos SDK node.
    #[default]
    V1Alpha,
    /// `grpc.reflection.v1`.
    V1,
}

impl ReflectionVersion {
    /// Path of the bidirectional `ServerReflectionInfo` stream.
    pub const fn path(self) -> &'static str {
        match self {
            Self::V1Alpha => "/grpc.reflection.v1alpha.ServerReflection/ServerReflectionInfo",
            Self::V1 => "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo",
        }
    }
}

impl fmt::Display for ReflectionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1Alpha => f.write_str("v1alpha"),
            Self::V1 => f.write_str("v1"),
        }
    }
}

impl FromStr for ReflectionVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1alpha" => Ok(Self::V1Alpha),
            "v1" => Ok(Self::V1),
            other => Err(format!("unknown reflection version {other}, expected v1alpha or v1")),
        }
    }
}
