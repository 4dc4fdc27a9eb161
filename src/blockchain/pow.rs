use log::debug;
use sha2::{Digest, Sha256};

/// Hex characters in a SHA-256 digest; no difficulty above this can be met
pub const MAX_DIFFICULTY: usize = 64;

/// Number of leading zero hex characters a proof digest must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Difficulty(pub usize);

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty(4)
    }
}

impl Difficulty {
    /// Checks whether a hex digest satisfies this difficulty
    pub fn is_met_by(&self, digest: &str) -> bool {
        digest.len() >= self.0 && digest.bytes().take(self.0).all(|b| b == b'0')
    }
}

/// Proof-of-work puzzle chaining each block's proof to its predecessor's
#[derive(Debug, Clone, Copy, Default)]
pub struct ProofOfWork {
    difficulty: Difficulty,
}

impl ProofOfWork {
    pub fn new(difficulty: Difficulty) -> Self {
        ProofOfWork { difficulty }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Checks whether `proof` solves the puzzle posed by `last_proof`
    ///
    /// The guess is the decimal text of `last_proof` followed by that of `proof`.
    pub fn is_valid(&self, last_proof: u64, proof: u64) -> bool {
        self.difficulty.is_met_by(&guess_digest(last_proof, proof))
    }

    /// Finds the smallest proof satisfying `is_valid` for `last_proof`
    ///
    /// The search is unbounded and blocks the calling thread.
    pub fn solve(&self, last_proof: u64) -> u64 {
        let mut proof = 0;
        while !self.is_valid(last_proof, proof) {
            proof += 1;
        }

        debug!("Found proof {} for last proof {} after {} attempts", proof, last_proof, proof + 1);
        proof
    }
}

fn guess_digest(last_proof: u64, proof: u64) -> String {
    let guess = format!("{}{}", last_proof, proof);
    hex::encode(Sha256::digest(guess.as_bytes()))
}
