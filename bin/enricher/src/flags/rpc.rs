use clap::Args;
use std::net::{IpAddr, SocketAddr};

/// JSON-RPC server flags.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RpcArgs {
    /// Serve the enrichment JSON-RPC API.
    #[arg(long = "rpc.enabled", default_value_t = false, env = "CHAINLENS_RPC_ENABLED")]
    pub enabled: bool,

    /// IP address for the RPC server to listen on.
    #[arg(long = "rpc.addr", default_value = "127.0.0.1", env = "CHAINLENS_RPC_ADDR")]
    pub addr: IpAddr,

    /// Port for the RPC server to listen on.
    #[arg(long = "rpc.port", default_value_t = 8546, env = "CHAINLENS_RPC_PORT")]
    pub port: u16,
}

impl RpcArgs {
    /// Socket to bind, or `None` when the API is disabled.
    pub fn socket(&self) -> Option<SocketAddr> {
        self.enabled.then(|| SocketAddr::new(self.addr, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct MockCommand {
        #[clap(flatten)]
        rpc: RpcArgs,
    }

    #[test]
    fn test_rpc_disabled_by_default() {
        let args = MockCommand::parse_from(["test", "--rpc.port", "9000"]);
        assert_eq!(args.rpc.socket(), None);
    }

    #[test]
    fn test_rpc_socket() {
        let args =
            MockCommand::parse_from(["test", "--rpc.enabled", "--rpc.addr", "0.0.0.0", "--rpc.port", "9000"]);
        assert_eq!(args.rpc.socket(), Some("0.0.0.0:9000".parse().unwrap()));
    }
}
