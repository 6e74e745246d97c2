use crate::actors::EnricherActor;
use async_trait::async_trait;
use derive_more::Constructor;
use jsonrpsee::{RpcModule, server::ServerBuilder};
use std::{io, net::SocketAddr};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Serves an [`RpcModule`] until cancelled.
#[derive(Debug, Constructor)]
pub struct EnrichmentRpcActor<D> {
    rpc_addr: SocketAddr,
    rpc_module: RpcModule<D>,
    cancel_token: CancellationToken,
}

#[async_trait]
impl<D> EnricherActor for EnrichmentRpcActor<D>
where
    D: Send + Sync + 'static,
{
    type Error = EnrichmentRpcActorError;

    async fn start(self) -> Result<(), Self::Error> {
        let server = ServerBuilder::default().build(self.rpc_addr).await?;
        info!(
            target: "enricher::rpc_actor",
            addr = %server.local_addr()?,
            "RPC server bound to address",
        );
        let handle = server.start(self.rpc_module);

        tokio::select! {
            _ = handle.clone().stopped() => {
                error!(target: "enricher::rpc_actor", "RPC server stopped unexpectedly");
                return Err(EnrichmentRpcActorError::ServerStopped);
            }
            _ = self.cancel_token.cancelled() => {
                if let Err(err) = handle.stop() {
                    error!(target: "enricher::rpc_actor", %err, "Failed to stop RPC server gracefully");
                    return Err(EnrichmentRpcActorError::StopFailed);
                }
                handle.stopped().await;
                info!(target: "enricher::rpc_actor", "RPC server stopped gracefully");
            }
        }

        Ok(())
    }
}

/// Failures of the [`EnrichmentRpcActor`].
#[derive(Debug, Error)]
pub enum EnrichmentRpcActorError {
    /// Failed to bind the RPC server.
    #[error(transparent)]
    BuildFailed(#[from] io::Error),

    /// The RPC server stopped without being asked to.
    #[error("rpc server stopped unexpectedly")]
    ServerStopped,

    /// The RPC server could not be stopped gracefully.
    #[error("failed to stop the RPC server")]
    StopFailed,
}
