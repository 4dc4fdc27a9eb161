// Blockchain module
//
// This module contains the core ledger implementation including:
// - Block structure and canonical hashing
// - Transaction structure
// - Proof of work algorithm
// - Ledger (chain + pending pool) and chain validation

pub mod block;
pub mod chain;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Ledger, LedgerError};
pub use pow::{Difficulty, ProofOfWork, MAX_DIFFICULTY};
pub use transaction::Transaction;
