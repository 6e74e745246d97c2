//! Process-level metrics.

mod version;
pub use version::VersionInfo;
