use actix_web::web;

use super::error::ApiError;
use super::handlers;

/// Configures the API routes
///
/// Malformed JSON bodies are rejected as invalid input.
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::InvalidInput(err.to_string()).into());

    cfg.service(
        web::scope("/api/v1")
            .app_data(json_config)
            .route("/chain", web::get().to(handlers::get_chain))
            .route("/transactions/pending", web::get().to(handlers::get_pending_transactions))
            .route("/transactions/new", web::post().to(handlers::new_transaction))
            .route("/mine", web::get().to(handlers::mine_block))
            .route("/validate", web::get().to(handlers::validate_chain))
            .route("/nodes/register", web::post().to(handlers::register_nodes))
            .route("/nodes/resolve", web::get().to(handlers::resolve_conflicts))
    );
}
