//! [`VersionInfo`] metrics

use metrics::gauge;

/// Build information exposed as a constant gauge.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// The version of the application.
    pub version: &'static str,
    /// The target operating system.
    pub target_os: &'static str,
    /// The target architecture.
    pub target_arch: &'static str,
    /// The build profile (e.g., debug or release).
    pub build_profile: &'static str,
}

impl VersionInfo {
    /// The name of the build info gauge.
    pub const INFO: &'static str = "chainlens_enricher_info";

    /// Creates a new instance of [`VersionInfo`] from the constants defined in [`crate::version`]
    /// at compile time.
    pub const fn from_build() -> Self {
        Self {
            version: crate::version::CARGO_PKG_VERSION,
            target_os: crate::version::TARGET_OS,
            target_arch: crate::version::TARGET_ARCH,
            build_profile: crate::version::BUILD_PROFILE_NAME,
        }
    }

    /// Exposes the build information over prometheus.
    pub fn register_version_metrics(&self) {
        let labels: [(&str, &str); 4] = [
            ("version", self.version),
            ("target_os", self.target_os),
            ("target_arch", self.target_arch),
            ("build_profile", self.build_profile),
        ];

        gauge!(Self::INFO, &labels).set(1);
    }
}
