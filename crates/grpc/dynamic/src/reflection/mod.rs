//! Runtime schema discovery through the gRPC server reflection service.

mod loader;
pub use loader::ReflectionLoader;

mod proto;
pub use proto::{
    ErrorResponse, FileDescriptorResponse, ListServiceResponse, MessageRequest, MessageResponse,
    ReflectionVersion, ServerReflectionRequest, ServerReflectionResponse, ServiceResponse,
};

mod source;
pub use source::ReflectionSource;
