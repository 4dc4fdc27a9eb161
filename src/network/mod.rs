// Network module
//
// Peer bookkeeping and the longest-chain consensus round:
// - Registry of known peer locations
// - Transport used to fetch a peer's chain
// - Consensus resolver

pub mod consensus;
pub mod peer;
pub mod registry;

pub use consensus::{ConsensusResolver, ResolveOutcome};
pub use peer::{ChainSnapshot, HttpPeerClient, PeerClient, PeerError};
pub use registry::{NodeRegistry, RegistryError};
