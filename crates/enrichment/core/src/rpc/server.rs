use super::{EnqueueResponse, EnrichmentApiServer, EscalateResponse};
use crate::{JobQueue, Metrics, QueueError};
use async_trait::async_trait;
use chainlens_enrichment_storage::{EnrichmentStorage, PendingResolution};
use chainlens_metrics::observe_metrics_for_result_async;
use jsonrpsee::{core::RpcResult, types::ErrorObjectOwned};
use tracing::{trace, warn};

/// Server-side implementation of [`EnrichmentApiServer`] over a [`JobQueue`].
#[derive(Debug)]
pub struct EnrichmentRpc<S> {
    queue: JobQueue<S>,
}

impl<S> EnrichmentRpc<S> {
    /// Creates a new [`EnrichmentRpc`] handler.
    pub fn new(queue: JobQueue<S>) -> Self {
        Metrics::init_rpc();
        trace!(target: "enrichment::rpc", "Creating enrichment RPC handler");
        Self { queue }
    }
}

fn rpc_error(method: &'static str, key: &str, err: QueueError) -> ErrorObjectOwned {
    warn!(target: "enrichment::rpc", method, key, %err, "Request failed");
    err.into()
}

macro_rules! observe_rpc_call {
    ($method:expr, $block:expr) => {
        observe_metrics_for_result_async!(
            Metrics::RPC_REQUESTS_SUCCESS_TOTAL,
            Metrics::RPC_REQUESTS_ERROR_TOTAL,
            Metrics::RPC_REQUEST_DURATION_SECONDS,
            $method,
            $block
        )
    };
}

#[async_trait]
impl<S> EnrichmentApiServer for EnrichmentRpc<S>
where
    S: EnrichmentStorage + 'static,
{
    async fn enqueue(&self, key: String) -> RpcResult<EnqueueResponse> {
        observe_rpc_call!(Metrics::RPC_METHOD_ENQUEUE, async {
            let outcome = self
                .queue
                .enqueue(&key)
                .map_err(|err| rpc_error(Metrics::RPC_METHOD_ENQUEUE, &key, err))?;
            Ok(EnqueueResponse { outcome })
        })
    }

    async fn escalate(&self, key: String) -> RpcResult<EscalateResponse> {
        observe_rpc_call!(Metrics::RPC_METHOD_ESCALATE, async {
            let status = self
                .queue
                .escalate(&key)
                .map_err(|err| rpc_error(Metrics::RPC_METHOD_ESCALATE, &key, err))?;
            Ok(EscalateResponse { status })
        })
    }

    async fn resolved(&self, key: String) -> RpcResult<bool> {
        observe_rpc_call!(Metrics::RPC_METHOD_RESOLVED, async {
            self.queue.resolved(&key).map_err(|err| rpc_error(Metrics::RPC_METHOD_RESOLVED, &key, err))
        })
    }

    async fn pending(&self, key: String) -> RpcResult<Option<PendingResolution>> {
        observe_rpc_call!(Metrics::RPC_METHOD_PENDING, async {
            self.queue.pending(&key).map_err(|err| rpc_error(Metrics::RPC_METHOD_PENDING, &key, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EscalationStatus, Notification, Notifier};
    use chainlens_enrichment_storage::{EnrichmentDb, InsertOutcome};
    use jsonrpsee::RpcModule;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn module() -> (TempDir, Notifier, RpcModule<EnrichmentRpc<EnrichmentDb>>) {
        let dir = TempDir::new().expect("create temp dir");
        let db = EnrichmentDb::new(dir.path().join("store.db")).expect("create db");
        let notifier = Notifier::new(8);
        let rpc = EnrichmentRpc::new(JobQueue::new(Arc::new(db), notifier.clone()));
        (dir, notifier, rpc.into_rpc())
    }

    #[tokio::test]
    async fn test_enqueue_then_escalate() {
        let (_dir, notifier, module) = module();
        let mut subscription = notifier.subscribe();

        let enqueued: EnqueueResponse =
            module.call("enrichment_enqueue", ["ibc/ABCDEF"]).await.unwrap();
        assert_eq!(enqueued.outcome, InsertOutcome::Inserted);

        let pending: Option<PendingResolution> =
            module.call("enrichment_pending", ["ibc/ABCDEF"]).await.unwrap();
        assert_eq!(pending.map(|row| row.attempts), Some(0));

        let escalated: EscalateResponse =
            module.call("enrichment_escalate", ["ibc/ABCDEF"]).await.unwrap();
        assert_eq!(escalated.status, EscalationStatus::Requested);

        // Both are buffered; escalations are delivered first.
        assert_eq!(subscription.recv().await, Some(Notification::Escalate("ibc/ABCDEF".into())));
        assert_eq!(subscription.recv().await, Some(Notification::NewWork("ibc/ABCDEF".into())));

        let resolved: bool = module.call("enrichment_resolved", ["ibc/ABCDEF"]).await.unwrap();
        assert!(!resolved);
    }

    #[tokio::test]
    async fn test_escalate_unknown_key_reports_status() {
        let (_dir, _notifier, module) = module();
        let escalated: EscalateResponse =
            module.call("enrichment_escalate", ["ibc/UNKNOWN"]).await.unwrap();
        assert_eq!(escalated.status, EscalationStatus::NotFound);
    }

    #[tokio::test]
    async fn test_empty_key_is_invalid_params() {
        let (_dir, _notifier, module) = module();
        let result: Result<EnqueueResponse, _> = module.call("enrichment_enqueue", [""]).await;
        assert!(result.is_err());
    }
}
