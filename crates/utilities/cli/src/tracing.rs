//! [tracing_subscriber] setup.

use crate::{LogConfig, LogRotation};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    EnvFilter, Layer,
    prelude::__tracing_subscriber_SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

/// File name prefix of rolling log files.
const LOG_FILE_NAME: &str = "chainlens.log";

/// The format of the logs.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum LogFormat {
    /// Full format (default).
    #[default]
    Full,
    /// JSON format.
    Json,
    /// Pretty format.
    Pretty,
    /// Compact format.
    Compact,
}

impl LogConfig {
    /// Installs the global subscriber.
    ///
    /// `env_filter` defaults to `RUST_LOG`; the configured level is added as a directive on top.
    pub fn init_tracing_subscriber(
        &self,
        env_filter: Option<EnvFilter>,
    ) -> Result<(), TryInitError> {
        let file_layer = self.file_logs.as_ref().map(|file_logs| {
            let dir = file_logs.directory_path.clone();
            let appender = match file_logs.rotation {
                LogRotation::Minutely => tracing_appender::rolling::minutely(dir, LOG_FILE_NAME),
                LogRotation::Hourly => tracing_appender::rolling::hourly(dir, LOG_FILE_NAME),
                LogRotation::Daily => tracing_appender::rolling::daily(dir, LOG_FILE_NAME),
                LogRotation::Never => tracing_appender::rolling::never(dir, LOG_FILE_NAME),
            };

            // File output never carries ANSI escapes.
            let layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(appender);
            match file_logs.format {
                LogFormat::Full => layer.boxed(),
                LogFormat::Json => layer.json().boxed(),
                LogFormat::Pretty => layer.pretty().boxed(),
                LogFormat::Compact => layer.compact().boxed(),
            }
        });

        let stdout_layer = self.stdout_logs.as_ref().map(|stdout_logs| {
            let layer = tracing_subscriber::fmt::layer();
            match stdout_logs.format {
                LogFormat::Full => layer.boxed(),
                LogFormat::Json => layer.json().boxed(),
                LogFormat::Pretty => layer.pretty().boxed(),
                LogFormat::Compact => layer.compact().boxed(),
            }
        });

        let env_filter = env_filter
            .unwrap_or_else(EnvFilter::from_default_env)
            .add_directive(self.global_level.into());

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stdout_layer)
            .try_init()
    }
}
