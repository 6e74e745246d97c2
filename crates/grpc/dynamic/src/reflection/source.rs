use super::proto::{ServerReflectionRequest, ServerReflectionResponse};
use crate::error::ReflectionError;
use async_trait::async_trait;

/// Something that answers server reflection requests.
///
/// Every call is a fresh exchange: one request is sent and the first response received is
/// returned. Implemented by [`GrpcTransport`](crate::GrpcTransport).
#[async_trait]
pub trait ReflectionSource: Send + Sync {
    /// Sends `request` and returns the first response.
    async fn exchange(
        &self,
        request: ServerReflectionRequest,
    ) -> Result<ServerReflectionResponse, ReflectionError>;
}
