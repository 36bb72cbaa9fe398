//! JSON-RPC dispatch of the administration service
//!
//! Decodes MCP messages, checks their shape against the typed schema, routes
//! them to the tool and resource handlers and writes one audit line per call.

use rust_mcp_sdk::schema::{
    CallToolRequest, Implementation, InitializeRequest, InitializeResult, JsonrpcMessage,
    JsonrpcRequest, ListResourcesRequest, ListResourcesResult, ListToolsRequest, ListToolsResult,
    PingRequest, ProtocolVersion, ReadResourceRequest, ServerCapabilities,
    ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::info;

use crate::domain::{
    resources::{build_resources_list, handle_resources_read},
    tools::{build_tools_list, handle_tools_call, required_role},
};
use crate::mcp::rpc::{
    app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_result,
    request_id_to_value, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
};
use crate::{auth::Role, errors::AppError, AppState};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

/// Audit redaction applies to any key containing one of these.
const SENSITIVE_KEY_FRAGMENTS: [&str; 8] = [
    "token",
    "secret",
    "password",
    "credential",
    "authorization",
    "bearer",
    "api_key",
    "connection_string",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcMethod {
    Initialize,
    Ping,
    ListTools,
    CallTool,
    ListResources,
    ReadResource,
    Unknown(String),
}

impl RpcMethod {
    pub fn parse(method: &str) -> Self {
        match method {
            "initialize" => Self::Initialize,
            "ping" => Self::Ping,
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            "resources/list" => Self::ListResources,
            "resources/read" => Self::ReadResource,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Ping => "ping",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::ListResources => "resources/list",
            Self::ReadResource => "resources/read",
            Self::Unknown(method) => method,
        }
    }

    /// Checks a request against the typed schema of its method.
    fn accepts(&self, payload: Value) -> bool {
        match self {
            Self::Initialize => serde_json::from_value::<InitializeRequest>(payload).is_ok(),
            Self::Ping => serde_json::from_value::<PingRequest>(payload).is_ok(),
            Self::ListTools => serde_json::from_value::<ListToolsRequest>(payload).is_ok(),
            Self::CallTool => serde_json::from_value::<CallToolRequest>(payload).is_ok(),
            Self::ListResources => serde_json::from_value::<ListResourcesRequest>(payload).is_ok(),
            Self::ReadResource => serde_json::from_value::<ReadResourceRequest>(payload).is_ok(),
            Self::Unknown(_) => true,
        }
    }
}

pub async fn handle_json_rpc_value(state: &AppState, role: Role, payload: Value) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
    }

    let raw_id = payload.get("id").cloned();
    let message: JsonrpcMessage = match serde_json::from_value(payload) {
        Ok(message) => message,
        Err(_) => return Some(json_rpc_error(raw_id, INVALID_REQUEST, "Invalid Request")),
    };

    match message {
        JsonrpcMessage::Request(request) => {
            if let Err(error_response) = validate_request_shape(&request) {
                return Some(error_response);
            }
            let id = Some(request_id_to_value(request.id));
            if request.method.trim().is_empty() {
                return Some(json_rpc_error(id, INVALID_REQUEST, "Invalid Request"));
            }

            let params = request.params.map(Value::Object);
            Some(handle_json_rpc_request(state, role, id, request.method, params).await)
        }
        // Notifications such as `notifications/initialized` are accepted and never answered.
        JsonrpcMessage::Notification(notification) => {
            if !notification.method.trim().is_empty() {
                let params = notification.params.map(Value::Object);
                let _ = handle_json_rpc_request(state, role, None, notification.method, params).await;
            }
            None
        }
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
            Some(json_rpc_error(raw_id, INVALID_REQUEST, "Invalid Request"))
        }
    }
}

pub fn validate_request_shape(request: &JsonrpcRequest) -> Result<(), Value> {
    let method = RpcMethod::parse(&request.method);
    let payload = serde_json::to_value(request).expect("jsonrpc request serialization");

    if method.accepts(payload) {
        Ok(())
    } else {
        let id = Some(request_id_to_value(request.id.clone()));
        Err(json_rpc_error(id, INVALID_PARAMS, "Invalid params"))
    }
}

fn initialize_result(params: Option<&Value>) -> Result<Value, AppError> {
    let protocol_version = negotiate_protocol_version(params)?;
    let result = InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("Cache Cluster Administration".to_string()),
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: None,
            ..Default::default()
        },
        protocol_version: protocol_version.into(),
        instructions: Some(
            "Read-only tools need the Users token; cluster, cache and account changes need the Administrators token."
                .to_string(),
        ),
        meta: None,
    };

    Ok(serde_json::to_value(result).expect("initialize result serialization"))
}

pub async fn handle_json_rpc_request(
    state: &AppState,
    role: Role,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
) -> Value {
    let method = RpcMethod::parse(&method);
    let audit_params = redact_audit_params(params.as_ref());
    let tool = match method {
        RpcMethod::CallTool => params
            .as_ref()
            .and_then(|params| params.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    let response = match &method {
        RpcMethod::Initialize => match initialize_result(params.as_ref()) {
            Ok(result) => json_rpc_result(id, result),
            Err(err) => app_error_to_json_rpc(id, err),
        },
        RpcMethod::Ping => json_rpc_result(id, json!({})),
        RpcMethod::ListTools => json_rpc_result(
            id,
            serde_json::to_value(ListToolsResult {
                meta: None,
                next_cursor: None,
                tools: build_tools_list(),
            })
            .expect("tools list result serialization"),
        ),
        RpcMethod::CallTool => handle_tools_call(state, role, id, params).await,
        RpcMethod::ListResources => json_rpc_result(
            id,
            serde_json::to_value(ListResourcesResult {
                meta: None,
                next_cursor: None,
                resources: build_resources_list(),
            })
            .expect("resources list result serialization"),
        ),
        RpcMethod::ReadResource => handle_resources_read(state, id, params).await,
        RpcMethod::Unknown(_) => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
    };

    let mutating = tool
        .as_deref()
        .and_then(required_role)
        .is_some_and(|required| required == Role::Administrators);
    info!(
        method = %method.as_str(),
        tool = tool.as_deref().unwrap_or("-"),
        mutating,
        role = ?role,
        params = %audit_params,
        outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
        "cluster administration call audited"
    );

    response
}

pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<ProtocolVersion, AppError> {
    let offered = params
        .and_then(|params| params.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_protocol_version",
                "initialize params.protocolVersion is required",
            )
        })?;

    if offered == SUPPORTED_PROTOCOL_VERSION {
        Ok(ProtocolVersion::V2024_11_05)
    } else {
        Err(AppError::bad_request(
            "unsupported_protocol_version",
            format!("unsupported protocolVersion {offered}, expected {SUPPORTED_PROTOCOL_VERSION}"),
        ))
    }
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    let item = if is_sensitive_key(key) {
                        Value::String("[REDACTED]".to_string())
                    } else {
                        redact_audit_value(item)
                    };
                    (key.clone(), item)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase().replace('-', "_");
    normalized == "apikey"
        || SENSITIVE_KEY_FRAGMENTS
            .iter()
            .any(|fragment| normalized.contains(fragment))
}
