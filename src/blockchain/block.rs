use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::transaction::Transaction;

/// Proof stored in the genesis block; exempt from the proof-of-work check
pub const GENESIS_PROOF: u64 = 100;

/// `previous_hash` sentinel of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Represents a block in the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Position of the block in the chain, starting at 1
    pub index: u64,

    /// Seconds since the Unix epoch when the block was sealed
    pub timestamp: f64,

    /// Transactions committed by this block, in submission order
    pub transactions: Vec<Transaction>,

    /// Proof of work (nonce)
    pub proof: u64,

    /// Hash of the previous block
    pub previous_hash: String,
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The transactions to commit
    /// * `proof` - The proof of work (nonce)
    /// * `previous_hash` - The hash of the previous block
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: now_seconds(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Creates the genesis block
    pub fn genesis() -> Self {
        Block::new(1, Vec::new(), GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Calculates the canonical hash of the block
    ///
    /// # Returns
    ///
    /// The SHA-256 digest of the key-sorted JSON rendering, as lowercase hex
    pub fn hash(&self) -> String {
        let block_data = serde_json::json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": self.transactions,
            "proof": self.proof,
            "previous_hash": self.previous_hash,
        });

        canonical_hash(&block_data)
    }
}

/// Hashes a JSON value after rendering it compactly
///
/// `serde_json` objects keep their keys sorted, so two values holding the same
/// fields always render to the same text regardless of insertion order.
pub fn canonical_hash(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
