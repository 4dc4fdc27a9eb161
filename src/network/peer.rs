use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::time::Duration;

use crate::blockchain::Block;

/// Path every node serves its chain under
pub const CHAIN_PATH: &str = "/api/v1/chain";

/// Errors that can occur while fetching a peer's chain
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Peer {0} unreachable: {1}")]
    Unreachable(String, String),

    #[error("Malformed response from peer {0}: {1}")]
    MalformedResponse(String, String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// A node's full chain as served over the wire
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChainSnapshot {
    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// The length of the chain
    pub length: usize,
}

/// Transport used to pull a peer's chain
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Fetches the full chain of the peer at `location` (`host:port`)
    async fn fetch_chain(&self, location: &str) -> Result<ChainSnapshot, PeerError>;
}

/// Fetches chains over HTTP with a per-request timeout
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, location: &str) -> Result<ChainSnapshot, PeerError> {
        let url = format!("http://{}{}", location, CHAIN_PATH);
        let unreachable = |e: reqwest::Error| PeerError::Unreachable(location.to_string(), e.to_string());

        let response = self.client.get(&url).send().await.map_err(unreachable)?;

        if !response.status().is_success() {
            return Err(PeerError::Unreachable(
                location.to_string(),
                format!("HTTP status {}", response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| PeerError::MalformedResponse(location.to_string(), e.to_string()))
    }
}

/// Rejects snapshots whose reported length disagrees with the blocks sent
pub fn check_snapshot(location: &str, snapshot: ChainSnapshot) -> Result<ChainSnapshot, PeerError> {
    if snapshot.length != snapshot.chain.len() {
        return Err(PeerError::MalformedResponse(
            location.to_string(),
            format!(
                "reported length {} but sent {} blocks",
                snapshot.length,
                snapshot.chain.len()
            ),
        ));
    }

    Ok(snapshot)
}
