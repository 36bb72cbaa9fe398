use std::time::Instant;

use axum::{
    extract::Request,
    http::{header::USER_AGENT, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub const SERVICE_LOG_FILTER: &str = "info";
/// The console prints chart summaries at `info`; HTTP client internals stay quiet.
pub const CONSOLE_LOG_FILTER: &str = "info,reqwest=warn,hyper_util=warn";

/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();

    info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        client = %client,
        duration_ms = started_at.elapsed().as_millis(),
        "request summary"
    );

    if status == StatusCode::UNAUTHORIZED {
        warn!(path = %path, client = %client, "authentication failure");
    } else if status.is_server_error() {
        warn!(path = %path, client = %client, status = status.as_u16(), "request failed");
    }

    response
}
