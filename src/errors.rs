use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::powershell::CommandError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        code: &'static str,
        message: String,
    },
    #[error("unauthorized: {message}")]
    Unauthorized {
        code: &'static str,
        message: &'static str,
    },
    #[error("forbidden: {message}")]
    Forbidden {
        code: &'static str,
        message: &'static str,
    },
    #[error("cluster command failed: {0}")]
    Command(#[from] CommandError),
    #[error("internal error")]
    Internal { code: &'static str, message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: &'static str) -> Self {
        Self::Unauthorized { code, message }
    }

    pub fn forbidden(code: &'static str, message: &'static str) -> Self {
        Self::Forbidden { code, message }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Command(_) => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::BadRequest { code, message } => ErrorResponse {
                code: code.to_string(),
                message,
                details: json!({}),
            },
            Self::Unauthorized { code, message } | Self::Forbidden { code, message } => {
                ErrorResponse {
                    code: code.to_string(),
                    message: message.to_string(),
                    details: json!({}),
                }
            }
            Self::Command(err) => {
                tracing::warn!(command = %err.command(), error = %err, "cluster command failed");
                ErrorResponse {
                    code: "command_failed".to_string(),
                    message: err.to_string(),
                    details: json!({ "command": err.command() }),
                }
            }
            Self::Internal { code, message } => {
                tracing::error!(error = %message, "request failed with internal error");
                ErrorResponse {
                    code: code.to_string(),
                    message: "internal server error".to_string(),
                    details: json!({}),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
