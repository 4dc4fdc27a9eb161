use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use std::sync::Arc;

use pow_ledger::api::{self, NodeState};
use pow_ledger::blockchain::{self, Ledger, ProofOfWork};
use pow_ledger::config::NodeConfig;
use pow_ledger::network::{self, ConsensusResolver, HttpPeerClient, NodeRegistry};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_chain,
        api::handlers::get_pending_transactions,
        api::handlers::new_transaction,
        api::handlers::mine_block,
        api::handlers::validate_chain,
        api::handlers::register_nodes,
        api::handlers::resolve_conflicts
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            network::ChainSnapshot,
            api::handlers::TransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::MineResponse,
            api::handlers::ValidateResponse,
            api::handlers::RegisterNodesRequest,
            api::handlers::RegisterNodesResponse,
            api::handlers::ResolveResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger node API endpoints")
    ),
    info(
        title = "Ledger Node API",
        version = "0.1.0",
        description = "A minimal proof-of-work ledger node",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

// Build the state shared by every worker
fn initialize_node(config: &NodeConfig) -> anyhow::Result<NodeState> {
    let node_id = Uuid::new_v4().simple().to_string();
    info!("Node identifier: {}", node_id);

    let ledger = Ledger::new(ProofOfWork::new(config.difficulty()));
    info!("Created ledger with difficulty {}", config.difficulty);

    let registry = NodeRegistry::new();
    registry
        .register_all(&config.peers)
        .context("invalid --peer address")?;

    let client = HttpPeerClient::new(config.peer_timeout())?;
    let resolver = ConsensusResolver::new(
        Arc::new(client),
        config.peer_timeout(),
        config.max_concurrent_peers,
    );

    Ok(NodeState {
        ledger,
        registry,
        resolver,
        node_id,
    })
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::parse();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.log_level.as_str()));

    let node = web::Data::new(initialize_node(&config)?);

    info!("Starting HTTP server at http://{}:{}", config.host, config.port);

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Configure OpenAPI documentation
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(node.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
