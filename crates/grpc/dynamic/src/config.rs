//! Client configuration.

use crate::reflection::ReflectionVersion;
use std::time::Duration;

/// Connection settings for a remote node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `http://` or `https://` URL of the node's gRPC endpoint.
    pub endpoint: String,
    /// Deadline of every outbound call, reflection exchanges included.
    pub call_timeout: Duration,
    /// Reflection service revision to query.
    pub reflection_version: ReflectionVersion,
}

impl ClientConfig {
    /// Default per-call deadline.
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

    /// Config for `endpoint` with the default deadline and reflection revision.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            call_timeout: Self::DEFAULT_CALL_TIMEOUT,
            reflection_version: ReflectionVersion::default(),
        }
    }
}
