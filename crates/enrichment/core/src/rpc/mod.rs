//! JSON-RPC surface of the job queue for out-of-process collaborators.

mod api;
pub use api::{EnqueueResponse, EnrichmentApiServer, EscalateResponse};

mod server;
pub use server::EnrichmentRpc;
