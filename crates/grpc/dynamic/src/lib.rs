//! Reflection-driven gRPC client.
//!
//! Talks to nodes whose schemas are not known at compile time. Service and message shapes are
//! fetched through the server reflection protocol on first use and kept in a process-wide
//! [`TypeRegistry`]; requests are encoded from JSON and responses projected back to JSON.
//!
//! The pieces, leaves first:
//! - [`wire`]: schema-less extraction of a single field from an encoded message.
//! - [`TypeRegistry`]: the catalog of known shapes.
//! - [`ReflectionLoader`]: feeds the registry from a [`ReflectionSource`].
//! - [`DynamicClient`]: resolves, encodes, calls and decodes, loading missing types on demand.

pub mod codec;

mod config;
pub use config::ClientConfig;

pub mod descriptor;
pub use descriptor::{
    DescriptorKind, EnumDescriptor, FieldDescriptor, MessageDescriptor, MethodDescriptor,
    ServiceDescriptor, TypeDescriptor,
};

mod error;
pub use error::{CodecError, InvokeError, ReflectionError, RegistryError, TransportError};

mod invoker;
pub use invoker::{DynamicClient, Invoker, MAX_TYPE_LOADS};

mod metrics;

pub mod reflection;
pub use reflection::{ReflectionLoader, ReflectionSource, ReflectionVersion};

mod registry;
pub use registry::TypeRegistry;

mod transport;
pub use transport::{GrpcTransport, UnaryTransport};

pub mod wire;
pub use wire::{extract_field, extract_string_field};

#[cfg(test)]
mod test_utils;
