// API module
//
// This module contains the HTTP API of a ledger node

pub mod error;
pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use error::ApiError;
pub use handlers::{NodeData, NodeState};
pub use routes::configure_routes;
