//! Chainlens enrichment service.
//!
//! Resolves deferred references (IBC denom traces, transaction call data, module parameters)
//! against a Cosmos node's gRPC endpoint, discovering its schemas through server reflection.

pub mod actors;
pub mod cli;
pub mod flags;
pub mod metrics;
pub mod service;
pub(crate) mod version;

use clap::Parser;

fn main() {
    if let Err(err) = cli::Cli::parse().run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
