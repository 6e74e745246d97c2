use async_trait::async_trait;

/// A long-running service owned by the enricher's [`Service`](crate::service::Service).
#[async_trait]
pub trait EnricherActor {
    /// The error type for the actor.
    type Error: std::fmt::Debug;
    /// Runs the actor until it is cancelled or fails.
    async fn start(self) -> Result<(), Self::Error>;
}
