//! The enrichment service runner.

use crate::actors::{EnricherActor, EnrichmentRpcActor, MetricWorker};
use anyhow::Result;
use chainlens_enrichment_core::{
    JobQueue, KeyRouter, NotificationListener, Notifier, QueueConfig, ResolutionProcessor,
    SweepJob,
    rpc::{EnrichmentApiServer, EnrichmentRpc},
};
use chainlens_enrichment_storage::EnrichmentDb;
use chainlens_grpc_dynamic::{ClientConfig, DynamicClient, GrpcTransport, TypeRegistry};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// How often backlog gauges are refreshed.
const METRICS_REPORT_INTERVAL: Duration = Duration::from_secs(30);

type Processor = ResolutionProcessor<EnrichmentDb, KeyRouter<DynamicClient<GrpcTransport>>>;

/// Everything [`Service`] needs to start.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Node connection.
    pub client: ClientConfig,
    /// Retry policy and worker cadence.
    pub queue: QueueConfig,
    /// Database file.
    pub db_path: PathBuf,
    /// JSON-RPC socket, if the API is served.
    pub rpc_addr: Option<SocketAddr>,
    /// Whether backlog gauges are published.
    pub metrics_enabled: bool,
}

/// Owns the store, the workers and the JSON-RPC server, and supervises their tasks.
///
/// The service keeps a [`Notifier`] handle of its own so the bus stays open for the listener
/// whether or not the API is served.
#[derive(Debug)]
pub struct Service {
    config: ServiceConfig,
    notifier: Notifier,
    cancel_token: CancellationToken,
    join_set: JoinSet<Result<()>>,
}

impl Service {
    /// Creates a new, not yet started, service.
    pub fn new(config: ServiceConfig) -> Self {
        let notifier = Notifier::new(config.queue.channel_capacity);
        Self {
            config,
            notifier,
            cancel_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        }
    }

    /// Opens the store and spawns every task.
    pub async fn initialise(&mut self) -> Result<()> {
        let queue_config = self.config.queue;

        info!(target: "enricher::service", path = %self.config.db_path.display(), "Opening enrichment database");
        let mut store = EnrichmentDb::new(&self.config.db_path)?;
        if self.config.metrics_enabled {
            store = store.with_metrics(queue_config.max_attempts);
        }
        let store = Arc::new(store);

        info!(
            target: "enricher::service",
            endpoint = %self.config.client.endpoint,
            reflection = %self.config.client.reflection_version,
            "Connecting to node"
        );
        let client =
            Arc::new(DynamicClient::connect_lazy(&self.config.client, Arc::new(TypeRegistry::new()))?);

        let processor: Arc<Processor> = Arc::new(ResolutionProcessor::new(
            store.clone(),
            KeyRouter::new(client),
            queue_config.max_attempts,
        ));

        self.init_workers(processor);
        if let Some(rpc_addr) = self.config.rpc_addr {
            self.init_rpc_server(rpc_addr, JobQueue::new(store.clone(), self.notifier.clone()));
        }
        if self.config.metrics_enabled {
            self.init_metric_reporter(store);
        }
        Ok(())
    }

    fn init_workers(&mut self, processor: Arc<Processor>) {
        let sweep =
            SweepJob::new(processor.clone(), self.config.queue, self.cancel_token.clone());
        self.join_set.spawn(async move {
            sweep.run().await;
            Ok(())
        });

        let listener = NotificationListener::new(
            processor,
            self.notifier.subscribe(),
            self.config.queue.notify_delay,
            self.config.queue.max_concurrent_attempts,
            self.cancel_token.clone(),
        );
        self.join_set.spawn(async move {
            listener.run().await;
            Ok(())
        });
    }

    fn init_rpc_server(&mut self, rpc_addr: SocketAddr, queue: JobQueue<EnrichmentDb>) {
        let rpc_module = EnrichmentRpc::new(queue).into_rpc();
        let cancel_token = self.cancel_token.clone();
        self.join_set.spawn(async move {
            EnrichmentRpcActor::new(rpc_addr, rpc_module, cancel_token)
                .start()
                .await
                .map_err(|err| anyhow::anyhow!(err))
        });
    }

    fn init_metric_reporter(&mut self, store: Arc<EnrichmentDb>) {
        let cancel_token = self.cancel_token.clone();
        self.join_set.spawn(async move {
            match MetricWorker::new(METRICS_REPORT_INTERVAL, vec![store], cancel_token).start().await
            {
                Ok(()) => Ok(()),
                Err(never) => match never {},
            }
        });
    }

    /// Starts the service and waits for its tasks.
    ///
    /// Returns once every task finished, or with the first task failure after cancelling the
    /// rest.
    pub async fn run(&mut self) -> Result<()> {
        self.initialise().await?;

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok(Ok(())) => {
                    info!(target: "enricher::service", "Task completed successfully.");
                }
                Ok(Err(err)) => {
                    error!(target: "enricher::service", %err, "A task encountered an error.");
                    self.cancel_token.cancel();
                    return Err(anyhow::anyhow!("A service task failed: {err}"));
                }
                Err(err) => {
                    error!(target: "enricher::service", %err, "A task panicked or was aborted.");
                    self.cancel_token.cancel();
                    return Err(anyhow::anyhow!("A service task failed: {err}"));
                }
            }
        }
        Ok(())
    }

    /// Cancels every task and waits for them to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel_token.cancel();

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(target: "enricher::service", %err, "A task failed during shutdown.");
                }
                Err(err) => {
                    error!(target: "enricher::service", %err, "A task panicked during shutdown.");
                }
            }
        }
        info!(target: "enricher::service", "All tasks stopped.");
        Ok(())
    }
}
