use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use log::{debug, info};

use super::block::Block;
use super::pow::ProofOfWork;
use super::transaction::Transaction;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Chain is empty")]
    EmptyChain,

    #[error("Invalid chain: {0}")]
    InvalidChain(String),
}

/// Blocks and pending transactions, always mutated together
#[derive(Debug)]
struct LedgerState {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

impl LedgerState {
    fn last_block(&self) -> Result<&Block, LedgerError> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }

    /// Seals the pending pool into a new block and appends it
    fn seal(&mut self, proof: u64, previous_hash: Option<String>) -> Result<Block, LedgerError> {
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.last_block()?.hash(),
        };

        let transactions = std::mem::take(&mut self.pending);
        let block = Block::new(self.chain.len() as u64 + 1, transactions, proof, previous_hash);
        self.chain.push(block.clone());

        info!(
            "Sealed block {} with {} transactions",
            block.index,
            block.transactions.len()
        );

        Ok(block)
    }
}

/// The local chain plus the pool of transactions awaiting the next block
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Debug, Clone)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,

    /// Puzzle used when mining and validating
    pow: ProofOfWork,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new(ProofOfWork::default())
    }
}

impl Ledger {
    /// Creates a new ledger holding only the genesis block
    pub fn new(pow: ProofOfWork) -> Self {
        Ledger {
            state: Arc::new(Mutex::new(LedgerState {
                chain: vec![Block::genesis()],
                pending: Vec::new(),
            })),
            pow,
        }
    }

    // Every mutation leaves the state consistent, so a poisoned lock is still usable.
    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Adds a new transaction to the pending pool
    ///
    /// # Returns
    ///
    /// The index of the block that will include this transaction
    pub fn new_transaction(&self, sender: &str, recipient: &str, amount: f64) -> u64 {
        let mut state = self.state();
        state.pending.push(Transaction::new(sender, recipient, amount));

        state.chain.len() as u64 + 1
    }

    /// Seals every pending transaction into a new block
    ///
    /// The proof is not checked here; callers obtain it from [`ProofOfWork::solve`].
    ///
    /// # Arguments
    ///
    /// * `proof` - The proof of work for the new block
    /// * `previous_hash` - Overrides the hash of the current last block
    pub fn new_block(&self, proof: u64, previous_hash: Option<String>) -> Result<Block, LedgerError> {
        self.state().seal(proof, previous_hash)
    }

    /// Gets the most recently appended block
    pub fn last_block(&self) -> Result<Block, LedgerError> {
        self.state().last_block().cloned()
    }

    /// Mines a new block crediting the reward to `node_id`
    ///
    /// The proof search runs without holding the lock. If the tip changed while
    /// searching, the search restarts against the new tip.
    pub fn mine(&self, node_id: &str) -> Result<Block, LedgerError> {
        loop {
            let (last_proof, last_hash) = {
                let state = self.state();
                let last_block = state.last_block()?;
                (last_block.proof, last_block.hash())
            };

            let proof = self.pow.solve(last_proof);

            let mut state = self.state();
            if state.last_block()?.hash() != last_hash {
                debug!("Chain tip moved while mining, searching again");
                continue;
            }

            state.pending.push(Transaction::new_reward(node_id));
            return state.seal(proof, Some(last_hash));
        }
    }

    /// Gets a snapshot of the chain
    pub fn chain(&self) -> Vec<Block> {
        self.state().chain.clone()
    }

    /// Gets a snapshot of the pending transactions
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.state().pending.clone()
    }

    pub fn len(&self) -> usize {
        self.state().chain.len()
    }

    /// Checks a candidate chain's hash links and proofs
    pub fn validate(&self, chain: &[Block]) -> bool {
        validate_chain(chain, &self.pow).is_ok()
    }

    /// Validates the local chain
    pub fn is_valid(&self) -> bool {
        let chain = self.chain();
        self.validate(&chain)
    }

    /// Replaces the local chain if `candidate` is valid and strictly longer
    ///
    /// The length comparison is made against the chain at commit time, so a
    /// block sealed while the candidate was being fetched is never discarded
    /// for an equally long chain. Pending transactions are kept.
    ///
    /// # Returns
    ///
    /// Whether the chain was replaced
    pub fn replace_if_longer(&self, candidate: Vec<Block>) -> Result<bool, LedgerError> {
        validate_chain(&candidate, &self.pow)?;

        let mut state = self.state();
        if candidate.len() <= state.chain.len() {
            return Ok(false);
        }

        info!(
            "Replacing chain of length {} with chain of length {}",
            state.chain.len(),
            candidate.len()
        );
        state.chain = candidate;

        Ok(true)
    }
}

/// Walks adjacent block pairs checking hash links and proofs of work
///
/// A single block is always valid: the genesis proof is exempt from the puzzle.
pub fn validate_chain(chain: &[Block], pow: &ProofOfWork) -> Result<(), LedgerError> {
    if chain.is_empty() {
        return Err(LedgerError::EmptyChain);
    }

    for pair in chain.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);

        if current.previous_hash != previous.hash() {
            return Err(LedgerError::InvalidChain(format!(
                "block {} does not link to the hash of block {}",
                current.index, previous.index
            )));
        }

        if !pow.is_valid(previous.proof, current.proof) {
            return Err(LedgerError::InvalidChain(format!(
                "block {} carries an invalid proof",
                current.index
            )));
        }
    }

    Ok(())
}
