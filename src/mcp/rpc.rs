//! JSON-RPC envelopes and the error-code table of the administration service

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::errors::AppError;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// A cluster cmdlet ran and reported failure.
pub const COMMAND_FAILED: i32 = -32000;
pub const UNAUTHORIZED: i32 = -32001;

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

fn error_data(code: &str, message: &str, details: Value) -> Option<Value> {
    Some(json!({
        "code": code,
        "message": message,
        "details": details,
    }))
}

pub fn app_error_to_json_rpc(id: Option<Value>, err: AppError) -> Value {
    let (code, message, data) = match &err {
        AppError::BadRequest { code, message } => (
            INVALID_PARAMS,
            "Invalid params",
            error_data(code, message, json!({})),
        ),
        AppError::Unauthorized { code, message } | AppError::Forbidden { code, message } => (
            UNAUTHORIZED,
            "Unauthorized",
            error_data(code, message, json!({})),
        ),
        AppError::Command(command_error) => {
            warn!(command = %command_error.command(), error = %command_error, "cluster command failed");
            (
                COMMAND_FAILED,
                "Command failed",
                error_data(
                    "command_failed",
                    &command_error.to_string(),
                    json!({ "command": command_error.command() }),
                ),
            )
        }
        AppError::Internal { message, .. } => {
            error!(error = %message, "request failed with internal error");
            (INTERNAL_ERROR, "Internal error", None)
        }
    };

    json_rpc_error_with_data(id, code, message, data)
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let response = JsonrpcErrorResponse::new(
        RpcError {
            code: i64::from(code),
            data,
            message: message.to_string(),
        },
        id.as_ref().and_then(value_to_request_id),
    );
    serde_json::to_value(response).expect("jsonrpc error response serialization")
}

/// Typed request params; a missing or malformed object is `Invalid params`.
pub fn decode_params<T: DeserializeOwned>(id: &Option<Value>, params: Option<Value>) -> Result<T, Value> {
    params
        .and_then(|raw| serde_json::from_value(raw).ok())
        .ok_or_else(|| json_rpc_error(id.clone(), INVALID_PARAMS, "Invalid params"))
}

/// Not-found errors for unknown tools and resources carry the offending name.
pub fn not_found(id: Option<Value>, code: &str, message: &str, name: &str) -> Value {
    json_rpc_error_with_data(
        id,
        METHOD_NOT_FOUND,
        "Method not found",
        error_data(code, message, json!({ "name": name })),
    )
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    match id.as_ref().and_then(value_to_request_id) {
        Some(request_id) => {
            let response = JsonrpcResultResponse::new(
                request_id,
                McpResult {
                    meta: None,
                    extra: result.as_object().cloned(),
                },
            );
            serde_json::to_value(response).expect("jsonrpc result response serialization")
        }
        None => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        }),
    }
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    match value {
        Value::String(id) => Some(RequestId::String(id.clone())),
        other => other.as_i64().map(RequestId::Integer),
    }
}

pub fn request_id_to_value(id: RequestId) -> Value {
    match id {
        RequestId::String(value) => Value::String(value),
        RequestId::Integer(value) => Value::Number(value.into()),
    }
}
