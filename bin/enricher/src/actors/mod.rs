//! [EnricherActor] services run by the enricher.

mod traits;
pub use traits::EnricherActor;

mod metric;
pub use metric::MetricWorker;

mod rpc;
pub use rpc::{EnrichmentRpcActor, EnrichmentRpcActorError};
