//! Prometheus metrics CLI args
//!
//! Specifies the available flags for prometheus metric configuration inside CLI

use clap::Args;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

/// Prometheus exporter flags.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serve Prometheus metrics.
    #[arg(
        long = "metrics.enabled",
        global = true,
        default_value_t = false,
        env = "CHAINLENS_METRICS_ENABLED"
    )]
    pub enabled: bool,

    /// Address the metrics endpoint listens on.
    #[arg(
        long = "metrics.addr",
        global = true,
        default_value = "0.0.0.0",
        env = "CHAINLENS_METRICS_ADDR"
    )]
    pub addr: IpAddr,

    /// Port the metrics endpoint listens on.
    #[arg(
        long = "metrics.port",
        global = true,
        default_value_t = 9464,
        env = "CHAINLENS_METRICS_PORT"
    )]
    pub port: u16,
}

/// Failure to install the Prometheus recorder.
#[derive(Debug, Error)]
pub enum MetricsInitError {
    /// The exporter could not be built or installed.
    #[error("failed to install prometheus exporter: {0}")]
    Install(#[from] BuildError),
}

impl MetricsArgs {
    /// Installs the Prometheus recorder and HTTP listener when metrics are enabled.
    pub fn init_metrics(&self) -> Result<(), MetricsInitError> {
        if self.enabled {
            PrometheusBuilder::new()
                .with_http_listener(SocketAddr::new(self.addr, self.port))
                .install()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    /// A mock command that uses the MetricsArgs.
    #[derive(Parser, Debug, Clone)]
    #[command(about = "Mock command")]
    struct MockCommand {
        /// Metrics CLI Flags
        #[clap(flatten)]
        pub metrics: MetricsArgs,
    }

    #[test]
    fn test_metrics_args_listen_enabled() {
        let args = MockCommand::parse_from(["test", "--metrics.enabled"]);
        assert!(args.metrics.enabled);

        let args = MockCommand::parse_from(["test"]);
        assert!(!args.metrics.enabled);
    }

    #[test]
    fn test_metrics_args_listen_ip() {
        let args = MockCommand::parse_from(["test", "--metrics.addr", "127.0.0.1"]);
        let expected: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(args.metrics.addr, expected);
    }

    #[test]
    fn test_metrics_args_listen_port() {
        let args = MockCommand::parse_from(["test", "--metrics.port", "1234"]);
        assert_eq!(args.metrics.port, 1234);
    }

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let args = MockCommand::parse_from(["test"]);
        assert!(args.metrics.init_metrics().is_ok());
    }
}
