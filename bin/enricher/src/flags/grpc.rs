use chainlens_grpc_dynamic::{ClientConfig, ReflectionVersion};
use clap::Args;
use std::time::Duration;

/// Connection flags for the node's gRPC endpoint.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GrpcArgs {
    /// gRPC endpoint of the node. `https://` enables TLS.
    #[arg(
        long = "grpc.endpoint",
        global = true,
        default_value = "http://127.0.0.1:9090",
        env = "CHAINLENS_GRPC_ENDPOINT"
    )]
    pub endpoint: String,

    /// Server reflection revision: `v1alpha` or `v1`.
    #[arg(
        long = "grpc.reflection",
        global = true,
        default_value = "v1alpha",
        env = "CHAINLENS_GRPC_REFLECTION"
    )]
    pub reflection_version: ReflectionVersion,

    /// Deadline of every outbound call, in seconds.
    #[arg(
        long = "grpc.timeout",
        global = true,
        default_value_t = ClientConfig::DEFAULT_CALL_TIMEOUT.as_secs(),
        env = "CHAINLENS_GRPC_TIMEOUT"
    )]
    pub call_timeout_secs: u64,
}

impl GrpcArgs {
    /// The client configuration these flags describe.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            reflection_version: self.reflection_version,
        }
    }
}
