use crate::EscalationStatus;
use chainlens_enrichment_storage::{InsertOutcome, PendingResolution};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use serde::{Deserialize, Serialize};

/// Response of `enrichment_enqueue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueResponse {
    /// What the insert did.
    pub outcome: InsertOutcome,
}

/// Response of `enrichment_escalate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalateResponse {
    /// Whether the escalation was requested, and if not, why.
    pub status: EscalationStatus,
}

/// Enrichment queue API.
#[rpc(server, namespace = "enrichment")]
pub trait EnrichmentApi {
    /// Adds a key to the backlog. Used by normalization.
    #[method(name = "enqueue")]
    async fn enqueue(&self, key: String) -> RpcResult<EnqueueResponse>;

    /// Requests immediate processing of a pending key. Used by the read path.
    #[method(name = "escalate")]
    async fn escalate(&self, key: String) -> RpcResult<EscalateResponse>;

    /// Whether a key already has a resolved record.
    #[method(name = "resolved")]
    async fn resolved(&self, key: String) -> RpcResult<bool>;

    /// The backlog row of a key, or `null` if it is not pending.
    #[method(name = "pending")]
    async fn pending(&self, key: String) -> RpcResult<Option<PendingResolution>>;
}
