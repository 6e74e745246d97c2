//! Contains the enricher CLI.

use crate::{
    flags::{GrpcArgs, QueueArgs, RpcArgs, StoreArgs},
    metrics::VersionInfo,
    service::{Service, ServiceConfig},
};
use anyhow::{Context as _, Result};
use chainlens_cli::{LogArgs, LogConfig, MetricsArgs, cli_styles};
use chainlens_enrichment_core::{JobQueue, Notifier, QueueConfig};
use chainlens_enrichment_storage::{BacklogReader, EnrichmentDb};
use chainlens_grpc_dynamic::{DynamicClient, GrpcTransport, Invoker, TypeRegistry};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};

/// CLI of the chainlens enrichment service.
#[derive(Parser, Debug)]
#[command(
    name = "chainlens-enricher",
    version = crate::version::CARGO_PKG_VERSION,
    about = "Resolves deferred explorer references against a node's gRPC endpoint",
    styles = cli_styles()
)]
pub struct Cli {
    /// Global args
    #[command(flatten)]
    pub global: LogArgs,

    /// Prometheus metrics args
    #[command(flatten)]
    pub metrics: MetricsArgs,

    /// Node connection args
    #[command(flatten)]
    pub grpc: GrpcArgs,

    /// Storage args
    #[command(flatten)]
    pub store: StoreArgs,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Enricher subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Runs the resolution workers and, optionally, the JSON-RPC API.
    Run {
        /// Queue args
        #[command(flatten)]
        queue: QueueArgs,
        /// RPC args
        #[command(flatten)]
        rpc: RpcArgs,
    },
    /// Calls a unary method and prints the response as JSON.
    Call {
        /// Fully qualified service name, e.g. `cosmos.bank.v1beta1.Query`.
        service: String,
        /// Method name, e.g. `Balance`.
        method: String,
        /// Request fields as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Lists the services the node exposes through reflection.
    Services,
    /// Adds a key to the resolution backlog.
    Enqueue {
        /// Key of the reference, e.g. `ibc/<HASH>`, `tx/<HASH>` or `params/<module>`.
        key: String,
    },
    /// Prints backlog counts and entries.
    Inspect {
        /// List entries that reached the attempt ceiling instead of the pending ones.
        #[arg(long)]
        exhausted: bool,
        /// Maximum entries listed.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Attempt ceiling used to tell pending and exhausted entries apart.
        #[arg(long = "queue.max-attempts", default_value_t = QueueConfig::DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u32,
    },
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> Result<()> {
        self.metrics.init_metrics()?;
        // Register build metrics
        VersionInfo::from_build().register_version_metrics();

        self.init_logs(&self.global)?;

        Self::run_until_ctrl_c(async move {
            match self.command.clone() {
                Commands::Run { queue, rpc } => self.run_service(queue, rpc).await,
                Commands::Call { service, method, params } => {
                    self.call(&service, &method, &params).await
                }
                Commands::Services => self.services().await,
                Commands::Enqueue { key } => self.enqueue(&key),
                Commands::Inspect { exhausted, limit, max_attempts } => {
                    self.inspect(exhausted, limit, max_attempts)
                }
            }
        })
    }

    async fn run_service(&self, queue: QueueArgs, rpc: RpcArgs) -> Result<()> {
        let config = ServiceConfig {
            client: self.grpc.client_config(),
            queue: queue.queue_config(),
            db_path: self.store.db_path(),
            rpc_addr: rpc.socket(),
            metrics_enabled: self.metrics.enabled,
        };
        let mut service = Service::new(config);

        tokio::select! {
            res = service.run() => {
                if let Err(err) = res {
                    error!(target: "enricher", %err, "Error running enrichment service");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(target: "enricher", "Ctrl+C received, initiating service shutdown...");
            }
        }

        service.shutdown().await?;
        info!(target: "enricher", "Enrichment service shut down gracefully.");
        Ok(())
    }

    fn client(&self) -> Result<DynamicClient<GrpcTransport>> {
        Ok(DynamicClient::connect_lazy(&self.grpc.client_config(), Arc::new(TypeRegistry::new()))?)
    }

    fn open_store(&self) -> Result<EnrichmentDb> {
        let path = self.store.db_path();
        EnrichmentDb::new(&path)
            .with_context(|| format!("failed to open database at {}", path.display()))
    }

    async fn call(&self, service: &str, method: &str, params: &str) -> Result<()> {
        let params: Value = serde_json::from_str(params).context("--params is not valid JSON")?;
        let response = self.client()?.call(service, method, &params).await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }

    async fn services(&self) -> Result<()> {
        for service in self.client()?.loader().list_services().await? {
            println!("{service}");
        }
        Ok(())
    }

    fn enqueue(&self, key: &str) -> Result<()> {
        // Nothing listens in this process; a running service's sweep picks the key up.
        let queue = JobQueue::new(Arc::new(self.open_store()?), Notifier::new(1));
        let outcome = queue.enqueue(key)?;
        println!("{}", json!({ "key": key.trim(), "outcome": outcome }));
        Ok(())
    }

    fn inspect(&self, exhausted: bool, limit: usize, max_attempts: u32) -> Result<()> {
        let store = self.open_store()?;
        let stats = store.backlog_stats(max_attempts)?;
        let entries = if exhausted {
            store.list_exhausted(max_attempts, limit)?
        } else {
            store.list_pending(limit)?
        };
        println!("{}", serde_json::to_string_pretty(&json!({ "stats": stats, "entries": entries }))?);
        Ok(())
    }

    /// Run until ctrl-c is pressed.
    pub fn run_until_ctrl_c<F>(fut: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        let rt = Self::tokio_runtime().map_err(|e| anyhow::anyhow!(e))?;
        rt.block_on(fut)
    }

    /// Creates a new default tokio multi-thread [`Runtime`](tokio::runtime::Runtime) with all
    /// features enabled
    pub fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }

    /// Initializes the tracing subscriber.
    pub fn init_logs(&self, args: &LogArgs) -> Result<()> {
        let filter = tracing_subscriber::EnvFilter::from_default_env();
        LogConfig::new(args.clone()).init_tracing_subscriber(Some(filter))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{path::PathBuf, time::Duration};

    #[test]
    fn test_run_subcommand_flags() {
        let cli = Cli::parse_from([
            "chainlens-enricher",
            "run",
            "--grpc.endpoint",
            "http://node:9090",
            "--datadir",
            "/tmp/chainlens",
            "--queue.batch-size",
            "10",
            "--rpc.enabled",
            "-v",
        ]);
        assert_eq!(cli.grpc.endpoint, "http://node:9090");
        assert_eq!(cli.store.datadir, PathBuf::from("/tmp/chainlens"));
        assert_eq!(cli.global.verbosity, 1);

        let Commands::Run { queue, rpc } = cli.command else { panic!("expected run") };
        assert_eq!(queue.queue_config().batch_size, 10);
        assert_eq!(queue.queue_config().poll_interval, Duration::from_secs(30));
        assert_eq!(rpc.socket(), Some("127.0.0.1:8546".parse().unwrap()));
    }

    #[test]
    fn test_call_subcommand() {
        let cli = Cli::parse_from([
            "chainlens-enricher",
            "call",
            "cosmos.bank.v1beta1.Query",
            "Balance",
            "--params",
            r#"{"address":"cosmos1xyz","denom":"uatom"}"#,
        ]);
        assert_eq!(
            cli.command,
            Commands::Call {
                service: "cosmos.bank.v1beta1.Query".to_string(),
                method: "Balance".to_string(),
                params: r#"{"address":"cosmos1xyz","denom":"uatom"}"#.to_string(),
            }
        );
    }

    #[test]
    fn test_inspect_defaults() {
        let cli = Cli::parse_from(["chainlens-enricher", "inspect", "--exhausted"]);
        assert_eq!(
            cli.command,
            Commands::Inspect {
                exhausted: true,
                limit: 20,
                max_attempts: QueueConfig::DEFAULT_MAX_ATTEMPTS
            }
        );
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["chainlens-enricher"]).is_err());
    }

    #[test]
    fn test_enqueue_then_inspect_against_a_datadir() {
        let dir = tempfile::TempDir::new().unwrap();
        let datadir = dir.path().to_str().unwrap();

        let cli = Cli::parse_from(["chainlens-enricher", "enqueue", " ibc/ABCDEF ", "--datadir", datadir]);
        cli.enqueue(" ibc/ABCDEF ").unwrap();

        let store = cli.open_store().unwrap();
        assert!(store.get_pending("ibc/ABCDEF").unwrap().is_some());
        assert_eq!(store.backlog_stats(5).unwrap().pending, 1);
        cli.inspect(false, 10, 5).unwrap();
    }

    #[test]
    fn test_enqueue_rejects_blank_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = Cli::parse_from([
            "chainlens-enricher",
            "enqueue",
            "x",
            "--datadir",
            dir.path().to_str().unwrap(),
        ]);
        assert!(cli.enqueue("   ").is_err());
    }
}
