//! Minimal proof-of-work ledger node.
//!
//! Each node keeps an append-only chain of blocks plus a pool of pending
//! transactions, mines blocks with a leading-zero hash puzzle, and reconciles
//! with registered peers by adopting the longest valid chain.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod network;
