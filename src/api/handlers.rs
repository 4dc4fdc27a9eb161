use actix_web::{web, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::ApiError;
use crate::blockchain::{Block, Ledger, Transaction};
use crate::network::{ChainSnapshot, ConsensusResolver, NodeRegistry};

/// Everything a request handler needs, shared across workers
pub struct NodeState {
    pub ledger: Ledger,
    pub registry: NodeRegistry,
    pub resolver: ConsensusResolver,

    /// Identifier credited with mining rewards
    pub node_id: String,
}

/// Data structure for the node state
pub type NodeData = web::Data<NodeState>;

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's identifier
    pub sender: Option<String>,

    /// The recipient's identifier
    pub recipient: Option<String>,

    /// The amount to transfer
    pub amount: Option<f64>,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The index of the block that will include this transaction
    pub block_index: u64,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// Index of the forged block
    pub index: u64,

    /// Transactions committed by the forged block
    pub transactions: Vec<Transaction>,

    /// Proof of work of the forged block
    pub proof: u64,

    /// Hash of the block it extends
    pub previous_hash: String,
}

/// Response for the validate endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
}

/// Request for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesRequest {
    /// Peer addresses, as URLs or `host:port`
    pub nodes: Option<Vec<String>>,
}

/// Response for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesResponse {
    /// The message
    pub message: String,

    /// Every peer known after registration
    pub total_nodes: Vec<String>,
}

/// Response for the resolve endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    /// "replaced" or "authoritative"
    pub message: String,

    /// The local chain after resolution
    pub chain: Vec<Block>,
}

/// Get the full chain
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Chain retrieved successfully", body = ChainSnapshot)
    )
)]
pub async fn get_chain(node: NodeData) -> HttpResponse {
    let chain = node.ledger.chain();

    HttpResponse::Ok().json(ChainSnapshot {
        length: chain.len(),
        chain,
    })
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(node: NodeData) -> HttpResponse {
    HttpResponse::Ok().json(node.ledger.pending_transactions())
}

/// Create a new transaction
///
/// Adds a new transaction to the pending pool
#[utoipa::path(
    post,
    path = "/api/v1/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction accepted", body = TransactionResponse),
        (status = 400, description = "Missing values")
    )
)]
pub async fn new_transaction(
    node: NodeData,
    transaction_req: web::Json<TransactionRequest>,
) -> Result<HttpResponse, ApiError> {
    let TransactionRequest { sender, recipient, amount } = transaction_req.into_inner();

    let (sender, recipient, amount) = match (sender, recipient, amount) {
        (Some(sender), Some(recipient), Some(amount)) => (sender, recipient, amount),
        _ => return Err(ApiError::InvalidInput("Missing values".to_string())),
    };

    let block_index = node.ledger.new_transaction(&sender, &recipient, amount);

    Ok(HttpResponse::Created().json(TransactionResponse {
        message: format!("Transaction will be added to Block {}", block_index),
        block_index,
    }))
}

/// Mine a new block
///
/// Runs the proof of work, credits the mining reward and seals every pending transaction
#[utoipa::path(
    get,
    path = "/api/v1/mine",
    responses(
        (status = 200, description = "Block forged", body = MineResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(node: NodeData) -> Result<HttpResponse, ApiError> {
    let ledger = node.ledger.clone();
    let node_id = node.node_id.clone();

    // The proof search is CPU-bound; keep it off the async worker.
    let block = web::block(move || ledger.mine(&node_id)).await??;

    Ok(HttpResponse::Ok().json(MineResponse {
        message: "New Block Forged".to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

/// Check if the local chain is valid
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Chain validation status", body = ValidateResponse)
    )
)]
pub async fn validate_chain(node: NodeData) -> HttpResponse {
    let chain = node.ledger.chain();

    HttpResponse::Ok().json(ValidateResponse {
        valid: node.ledger.validate(&chain),
        length: chain.len(),
    })
}

/// Register peer nodes
#[utoipa::path(
    post,
    path = "/api/v1/nodes/register",
    request_body = RegisterNodesRequest,
    responses(
        (status = 201, description = "Nodes registered", body = RegisterNodesResponse),
        (status = 400, description = "Missing or invalid list of nodes")
    )
)]
pub async fn register_nodes(
    node: NodeData,
    register_req: web::Json<RegisterNodesRequest>,
) -> Result<HttpResponse, ApiError> {
    let nodes = register_req
        .into_inner()
        .nodes
        .ok_or_else(|| ApiError::InvalidInput("Please supply a valid list of nodes".to_string()))?;

    node.registry.register_all(&nodes)?;

    Ok(HttpResponse::Created().json(RegisterNodesResponse {
        message: "New nodes have been added".to_string(),
        total_nodes: node.registry.nodes(),
    }))
}

/// Run consensus against every registered peer
#[utoipa::path(
    get,
    path = "/api/v1/nodes/resolve",
    responses(
        (status = 200, description = "Consensus finished", body = ResolveResponse)
    )
)]
pub async fn resolve_conflicts(node: NodeData) -> HttpResponse {
    let outcome = node.resolver.resolve(&node.ledger, &node.registry).await;
    let message = if outcome.replaced { "replaced" } else { "authoritative" };
    info!("Consensus finished: {}", message);

    HttpResponse::Ok().json(ResolveResponse {
        message: message.to_string(),
        chain: outcome.chain,
    })
}
