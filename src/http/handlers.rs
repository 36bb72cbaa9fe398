//! Axum handlers: the bearer-protected `/mcp` endpoint and the public probes.

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::auth::Role;
use crate::domain::resources::ClusterResource;
use crate::domain::tools::build_tools_list;
use crate::mcp::rpc::{json_rpc_error, INVALID_REQUEST, PARSE_ERROR};
use crate::mcp::server::{handle_json_rpc_value, SUPPORTED_PROTOCOL_VERSION};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub mcp_endpoint: &'static str,
    pub protocol_version: &'static str,
    pub roles: [&'static str; 2],
    pub tools: Vec<String>,
    pub resources: Vec<&'static str>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn discovery() -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        mcp_endpoint: "/mcp",
        protocol_version: SUPPORTED_PROTOCOL_VERSION,
        roles: ["Users", "Administrators"],
        tools: build_tools_list().into_iter().map(|tool| tool.name).collect(),
        resources: ClusterResource::ALL
            .into_iter()
            .map(ClusterResource::uri)
            .collect(),
    })
}

/// A request answered with nothing (a notification) becomes `204 No Content`.
fn reply(body: Option<Value>) -> Response {
    match body {
        Some(body) => (StatusCode::OK, Json(body)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn handle_batch(state: &AppState, role: Role, batch: Vec<Value>) -> Option<Value> {
    if batch.is_empty() {
        return Some(Value::Array(vec![json_rpc_error(
            None,
            INVALID_REQUEST,
            "Invalid Request",
        )]));
    }

    let mut responses = Vec::with_capacity(batch.len());
    for item in batch {
        if let Some(response) = handle_json_rpc_value(state, role, item).await {
            responses.push(response);
        }
    }
    (!responses.is_empty()).then_some(Value::Array(responses))
}

pub async fn mcp_endpoint(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    body: Bytes,
) -> Response {
    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => payload,
        Err(_) => return reply(Some(json_rpc_error(None, PARSE_ERROR, "Parse error"))),
    };

    let response = match payload {
        Value::Array(batch) => handle_batch(&state, role, batch).await,
        single => handle_json_rpc_value(&state, role, single).await,
    };
    reply(response)
}
