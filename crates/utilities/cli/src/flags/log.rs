use crate::{LogFormat, LogRotation};
use clap::{ArgAction, Args};
use std::path::PathBuf;

/// Logging flags.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity: none for info, `-v` for debug, `-vv` for trace.
    #[arg(short = 'v', long = "verbosity", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Disable stdout logs.
    #[arg(short = 'q', long = "logs.stdout.quiet", global = true, default_value_t = false)]
    pub stdout_quiet: bool,

    /// Stdout log format.
    #[arg(
        long = "logs.stdout.format",
        global = true,
        default_value = "full",
        env = "CHAINLENS_LOG_STDOUT_FORMAT"
    )]
    pub stdout_format: LogFormat,

    /// Directory for file logs. File logging is off unless set.
    #[arg(long = "logs.file.directory", global = true, env = "CHAINLENS_LOG_FILE_DIRECTORY")]
    pub file_directory: Option<PathBuf>,

    /// File log format.
    #[arg(long = "logs.file.format", global = true, default_value = "full")]
    pub file_format: LogFormat,

    /// File log rotation.
    #[arg(long = "logs.file.rotation", global = true, default_value = "never")]
    pub file_rotation: LogRotation,
}
