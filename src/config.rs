use clap::Parser;

use std::time::Duration;

use crate::blockchain::{Difficulty, MAX_DIFFICULTY};

/// Command line and environment configuration of a ledger node
#[derive(Debug, Clone, Parser)]
#[command(name = "pow_ledger")]
#[command(about = "Proof-of-work ledger node with longest-chain consensus")]
#[command(version)]
pub struct NodeConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "LEDGER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "LEDGER_PORT", default_value_t = 5001)]
    pub port: u16,

    /// Leading zero hex characters required of a proof digest
    #[arg(
        long,
        env = "LEDGER_DIFFICULTY",
        default_value_t = 4,
        value_parser = clap::value_parser!(u8).range(0..=MAX_DIFFICULTY as i64)
    )]
    pub difficulty: u8,

    /// Seconds to wait for a peer's chain before skipping it
    #[arg(long, env = "LEDGER_PEER_TIMEOUT_SECS", default_value_t = 5)]
    pub peer_timeout_secs: u64,

    /// Peers fetched concurrently during consensus
    #[arg(long, env = "LEDGER_MAX_CONCURRENT_PEERS", default_value_t = 8)]
    pub max_concurrent_peers: usize,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Peer to register at startup (repeatable)
    #[arg(long = "peer")]
    pub peers: Vec<String>,
}

impl NodeConfig {
    pub fn difficulty(&self) -> Difficulty {
        Difficulty(usize::from(self.difficulty))
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}
