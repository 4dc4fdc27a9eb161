use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sender used for mining reward transactions
pub const REWARD_SENDER: &str = "0";

/// Amount credited to the miner for every sealed block
pub const MINING_REWARD: f64 = 1.0;

/// Represents a transfer waiting in, or committed to, the ledger
///
/// No identity or signature is attached; any strings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's identifier
    pub sender: String,

    /// Recipient's identifier
    pub recipient: String,

    /// Amount being transferred
    pub amount: f64,
}

impl Transaction {
    /// Creates a new transaction
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// Creates the reward transaction credited to a miner
    ///
    /// # Arguments
    ///
    /// * `recipient` - The identifier of the mining node
    pub fn new_reward(recipient: impl Into<String>) -> Self {
        Transaction::new(REWARD_SENDER, recipient, MINING_REWARD)
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction() {
        let transaction = Transaction::new("alice", "bob", 10.5);

        assert_eq!(transaction.sender, "alice");
        assert_eq!(transaction.recipient, "bob");
        assert_eq!(transaction.amount, 10.5);
        assert!(!transaction.is_reward());
    }

    #[test]
    fn test_reward_transaction() {
        let transaction = Transaction::new_reward("node-1");

        assert_eq!(transaction.sender, "0");
        assert_eq!(transaction.recipient, "node-1");
        assert_eq!(transaction.amount, 1.0);
        assert!(transaction.is_reward());
    }

    #[test]
    fn test_json_shape() {
        let transaction = Transaction::new("a", "b", 3.0);
        let value = serde_json::to_value(&transaction).unwrap();

        assert_eq!(value, serde_json::json!({"sender": "a", "recipient": "b", "amount": 3.0}));
    }
}
