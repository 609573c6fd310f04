use crate::negotiation::Negotiator;
use crate::signaling::negotiate_handler;
use axum::Router;
use axum::routing::post;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub const NEGOTIATE_PATH: &str = "/negotiate";

/// Path used by existing browser clients.
pub const LEGACY_NEGOTIATE_PATH: &str = "/sdp";

pub const WEB_ASSETS_PATH: &str = "/web";

pub fn build_router(negotiator: Negotiator, web_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route(NEGOTIATE_PATH, post(negotiate_handler))
        .route(LEGACY_NEGOTIATE_PATH, post(negotiate_handler))
        .nest_service(WEB_ASSETS_PATH, ServeDir::new(web_dir.as_ref()))
        // Mirrors the request origin; the page is usually served from elsewhere.
        .layer(CorsLayer::very_permissive())
        .with_state(negotiator)
}
