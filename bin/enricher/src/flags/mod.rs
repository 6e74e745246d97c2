//! CLI flags of the enricher, grouped by the component they configure.

mod grpc;
pub use grpc::GrpcArgs;

mod queue;
pub use queue::QueueArgs;

mod rpc;
pub use rpc::RpcArgs;

mod store;
pub use store::StoreArgs;
