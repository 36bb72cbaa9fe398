use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod cluster_client;
pub mod config;
pub mod console;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod powershell;

use cluster_client::{CacheAdminRepository, CacheItemStore, CacheStatisticsRepository};

#[derive(Clone)]
pub struct AppState {
    pub users_token: Arc<str>,
    pub administrators_token: Option<Arc<str>>,
    pub admin: Arc<dyn CacheAdminRepository>,
    pub statistics: Arc<dyn CacheStatisticsRepository>,
    pub items: Arc<dyn CacheItemStore>,
}

impl AppState {
    pub fn new(
        users_token: String,
        administrators_token: Option<String>,
        admin: Arc<dyn CacheAdminRepository>,
        statistics: Arc<dyn CacheStatisticsRepository>,
        items: Arc<dyn CacheItemStore>,
    ) -> Self {
        Self {
            users_token: Arc::<str>::from(users_token),
            administrators_token: administrators_token.map(Arc::<str>::from),
            admin,
            statistics,
            items,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/mcp", post(http::handlers::mcp_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .merge(protected)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
