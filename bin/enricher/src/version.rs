//! Version information for chainlens-enricher.

/// The latest version from Cargo.toml.
pub(crate) const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The target operating system.
pub(crate) const TARGET_OS: &str = std::env::consts::OS;

/// The target architecture.
pub(crate) const TARGET_ARCH: &str = std::env::consts::ARCH;

/// The build profile name.
pub(crate) const BUILD_PROFILE_NAME: &str =
    if cfg!(debug_assertions) { "debug" } else { "release" };
