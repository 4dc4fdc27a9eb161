use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use tokio::time::timeout;

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use super::peer::{check_snapshot, PeerClient};
use super::registry::NodeRegistry;
use crate::blockchain::chain::validate_chain;
use crate::blockchain::{Block, Ledger};

/// Result of a consensus round
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    /// Whether the local chain was replaced
    pub replaced: bool,

    /// The local chain after resolution
    pub chain: Vec<Block>,
}

/// Applies the longest-valid-chain rule across registered peers
#[derive(Clone)]
pub struct ConsensusResolver {
    client: Arc<dyn PeerClient>,
    peer_timeout: Duration,
    max_concurrent_peers: usize,
}

impl ConsensusResolver {
    /// Creates a new resolver
    ///
    /// # Arguments
    ///
    /// * `client` - Transport used to fetch peer chains
    /// * `peer_timeout` - Upper bound on each peer fetch
    /// * `max_concurrent_peers` - How many peers are fetched at once
    pub fn new(client: Arc<dyn PeerClient>, peer_timeout: Duration, max_concurrent_peers: usize) -> Self {
        ConsensusResolver {
            client,
            peer_timeout,
            max_concurrent_peers: max_concurrent_peers.max(1),
        }
    }

    /// Replaces the local chain with the longest valid peer chain, if strictly longer
    ///
    /// Peers that fail, time out, or serve an invalid chain are skipped.
    pub async fn resolve(&self, ledger: &Ledger, registry: &NodeRegistry) -> ResolveOutcome {
        let local_length = ledger.len();
        let peers = registry.nodes();
        debug!("Resolving against {} peers, local length {}", peers.len(), local_length);

        let candidates: Vec<Vec<Block>> = stream::iter(peers)
            .map(|location| async move { self.fetch_candidate(ledger, &location, local_length).await })
            .buffer_unordered(self.max_concurrent_peers)
            .filter_map(|candidate| async move { candidate })
            .collect()
            .await;

        let replaced = match select_longest(candidates) {
            Some(chain) => match ledger.replace_if_longer(chain) {
                Ok(replaced) => replaced,
                Err(err) => {
                    warn!("Rejected peer chain at commit: {}", err);
                    false
                }
            },
            None => false,
        };

        if replaced {
            info!("Local chain replaced by a longer peer chain");
        } else {
            info!("Local chain is authoritative");
        }

        ResolveOutcome {
            replaced,
            chain: ledger.chain(),
        }
    }

    /// Fetches one peer's chain, keeping it only if valid and longer than ours
    async fn fetch_candidate(&self, ledger: &Ledger, location: &str, local_length: usize) -> Option<Vec<Block>> {
        let snapshot = match timeout(self.peer_timeout, self.client.fetch_chain(location)).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => {
                warn!("Skipping peer: {}", err);
                return None;
            }
            Err(_) => {
                warn!("Skipping peer {}: no response within {:?}", location, self.peer_timeout);
                return None;
            }
        };

        let snapshot = match check_snapshot(location, snapshot) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("Skipping peer: {}", err);
                return None;
            }
        };

        if snapshot.length <= local_length {
            debug!("Peer {} has length {}, not longer than ours", location, snapshot.length);
            return None;
        }

        if let Err(err) = validate_chain(&snapshot.chain, ledger.pow()) {
            warn!("Skipping peer {}: {}", location, err);
            return None;
        }

        Some(snapshot.chain)
    }
}

/// Picks the longest chain; equal lengths go to the smallest tip hash
fn select_longest(candidates: Vec<Vec<Block>>) -> Option<Vec<Block>> {
    candidates
        .into_iter()
        .map(|chain| (chain.len(), Reverse(chain.last().map(Block::hash)), chain))
        .max_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)))
        .map(|(_, _, chain)| chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Difficulty, ProofOfWork};
    use crate::network::peer::{ChainSnapshot, PeerError};
    use async_trait::async_trait;
    use std::collections::HashMap;

    enum Reply {
        Chain(ChainSnapshot),
        Fail,
        Hang,
    }

    #[derive(Default)]
    struct StubClient {
        replies: HashMap<String, Reply>,
    }

    impl StubClient {
        fn with(mut self, location: &str, reply: Reply) -> Self {
            self.replies.insert(location.to_string(), reply);
            self
        }
    }

    #[async_trait]
    impl PeerClient for StubClient {
        async fn fetch_chain(&self, location: &str) -> Result<ChainSnapshot, PeerError> {
            match self.replies.get(location) {
                Some(Reply::Chain(snapshot)) => Ok(snapshot.clone()),
                Some(Reply::Hang) => std::future::pending().await,
                Some(Reply::Fail) | None => Err(PeerError::Unreachable(
                    location.to_string(),
                    "connection refused".to_string(),
                )),
            }
        }
    }

    fn pow() -> ProofOfWork {
        ProofOfWork::new(Difficulty(1))
    }

    fn mined_chain(length: usize) -> Vec<Block> {
        let ledger = Ledger::new(pow());
        while ledger.len() < length {
            ledger.new_transaction("alice", "bob", 1.0);
            ledger.mine("peer").unwrap();
        }
        ledger.chain()
    }

    fn served(chain: Vec<Block>) -> Reply {
        Reply::Chain(ChainSnapshot {
            length: chain.len(),
            chain,
        })
    }

    fn setup(client: StubClient, peers: &[&str], local_length: usize) -> (ConsensusResolver, Ledger, NodeRegistry) {
        let resolver = ConsensusResolver::new(Arc::new(client), Duration::from_millis(200), 4);
        let ledger = Ledger::new(pow());
        ledger.replace_if_longer(mined_chain(local_length)).unwrap();
        let registry = NodeRegistry::new();
        for peer in peers {
            registry.register(peer).unwrap();
        }
        (resolver, ledger, registry)
    }

    #[actix_web::test]
    async fn test_longest_valid_chain_wins() {
        let longest = mined_chain(5);
        let client = StubClient::default()
            .with("peer-a:5000", served(mined_chain(2)))
            .with("peer-b:5000", served(longest.clone()));
        let (resolver, ledger, registry) = setup(client, &["peer-a:5000", "peer-b:5000"], 3);

        let outcome = resolver.resolve(&ledger, &registry).await;

        assert!(outcome.replaced);
        assert_eq!(outcome.chain, longest);
        assert_eq!(ledger.chain(), longest);
    }

    #[actix_web::test]
    async fn test_longer_invalid_chain_is_ignored() {
        let mut broken = mined_chain(6);
        broken[3].previous_hash = "0000".to_string();
        let client = StubClient::default().with("peer-a:5000", served(broken));
        let (resolver, ledger, registry) = setup(client, &["peer-a:5000"], 3);
        let before = ledger.chain();

        let outcome = resolver.resolve(&ledger, &registry).await;

        assert!(!outcome.replaced);
        assert_eq!(ledger.chain(), before);
    }

    #[actix_web::test]
    async fn test_failing_peer_is_skipped() {
        let longest = mined_chain(4);
        let client = StubClient::default()
            .with("down:5000", Reply::Fail)
            .with("up:5000", served(longest.clone()));
        let (resolver, ledger, registry) = setup(client, &["down:5000", "up:5000"], 2);

        let outcome = resolver.resolve(&ledger, &registry).await;

        assert!(outcome.replaced);
        assert_eq!(ledger.chain(), longest);
    }

    #[actix_web::test]
    async fn test_failing_peer_does_not_reuse_previous_data() {
        let client = StubClient::default()
            .with("short:5000", served(mined_chain(4)))
            .with("down:5000", Reply::Fail);
        let (resolver, ledger, registry) = setup(client, &["short:5000", "down:5000"], 4);
        let before = ledger.chain();

        let outcome = resolver.resolve(&ledger, &registry).await;

        assert!(!outcome.replaced);
        assert_eq!(ledger.chain(), before);
    }

    #[actix_web::test]
    async fn test_hanging_peer_times_out() {
        let longest = mined_chain(3);
        let client = StubClient::default()
            .with("slow:5000", Reply::Hang)
            .with("fast:5000", served(longest.clone()));
        let (resolver, ledger, registry) = setup(client, &["slow:5000", "fast:5000"], 1);

        let outcome = resolver.resolve(&ledger, &registry).await;

        assert!(outcome.replaced);
        assert_eq!(ledger.chain(), longest);
    }

    #[actix_web::test]
    async fn test_equal_length_keeps_local_chain() {
        let client = StubClient::default().with("peer-a:5000", served(mined_chain(3)));
        let (resolver, ledger, registry) = setup(client, &["peer-a:5000"], 3);
        let before = ledger.chain();

        let outcome = resolver.resolve(&ledger, &registry).await;

        assert!(!outcome.replaced);
        assert_eq!(outcome.chain, before);
    }

    #[actix_web::test]
    async fn test_misreported_length_is_skipped() {
        let client = StubClient::default().with(
            "liar:5000",
            Reply::Chain(ChainSnapshot {
                chain: mined_chain(2),
                length: 50,
            }),
        );
        let (resolver, ledger, registry) = setup(client, &["liar:5000"], 1);

        let outcome = resolver.resolve(&ledger, &registry).await;

        assert!(!outcome.replaced);
        assert_eq!(ledger.len(), 1);
    }

    #[actix_web::test]
    async fn test_tie_between_peers_is_order_independent() {
        let first = mined_chain(4);
        let second = mined_chain(4);
        let expected = if first[3].hash() < second[3].hash() {
            first.clone()
        } else {
            second.clone()
        };

        for (a, b) in [(&first, &second), (&second, &first)] {
            let client = StubClient::default()
                .with("peer-a:5000", served(a.clone()))
                .with("peer-b:5000", served(b.clone()));
            let (resolver, ledger, registry) = setup(client, &["peer-a:5000", "peer-b:5000"], 2);

            let outcome = resolver.resolve(&ledger, &registry).await;

            assert!(outcome.replaced);
            assert_eq!(ledger.chain(), expected);
        }
    }

    #[actix_web::test]
    async fn test_no_peers_is_authoritative() {
        let (resolver, ledger, registry) = setup(StubClient::default(), &[], 2);

        let outcome = resolver.resolve(&ledger, &registry).await;

        assert!(!outcome.replaced);
        assert_eq!(outcome.chain.len(), 2);
    }
}
