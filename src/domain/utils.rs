//! Domain-specific shared validations and normalization utilities

use crate::domain::models::{HostEndpoint, DEFAULT_CACHE_PORT, MIN_CACHE_PORT};
use crate::errors::AppError;

pub const MAX_BATCH_SIZE: usize = 100;

fn is_name_character(character: char) -> bool {
    character.is_ascii_alphanumeric() || matches!(character, '-' | '_' | '.')
}

pub fn validate_port(field: &'static str, value: u32) -> Result<u16, AppError> {
    u16::try_from(value)
        .ok()
        .filter(|port| *port >= MIN_CACHE_PORT)
        .ok_or_else(|| {
            AppError::bad_request("invalid_port", format!("{field} must be between 1024 and 65535"))
        })
}

pub fn normalize_host_name(host_name: &str) -> Result<String, AppError> {
    let normalized = host_name.trim();
    if normalized.is_empty() || !normalized.chars().all(is_name_character) {
        return Err(AppError::bad_request(
            "invalid_host_name",
            "host_name must contain only alphanumeric characters, dashes, underscores and dots",
        ));
    }

    Ok(normalized.to_string())
}

pub fn host_endpoint(host_name: &str, cache_port: Option<u32>) -> Result<HostEndpoint, AppError> {
    let port = match cache_port {
        Some(port) => validate_port("cache_port", port)?,
        None => DEFAULT_CACHE_PORT,
    };

    Ok(HostEndpoint::new(normalize_host_name(host_name)?, port))
}

/// Parses `host` or `host:port`; the cache port defaults to 22233.
pub fn parse_host_endpoint(value: &str) -> Result<HostEndpoint, AppError> {
    match value.trim().rsplit_once(':') {
        Some((host_name, port)) => {
            let port = port.trim().parse::<u32>().map_err(|_| {
                AppError::bad_request("invalid_port", "cache port must be a number")
            })?;
            host_endpoint(host_name, Some(port))
        }
        None => host_endpoint(value, None),
    }
}

pub fn normalize_cache_name(cache_name: &str) -> Result<String, AppError> {
    let normalized = cache_name.trim();
    if normalized.is_empty() || !normalized.chars().all(is_name_character) {
        return Err(AppError::bad_request(
            "invalid_cache_name",
            "cache_name must contain only alphanumeric characters, dashes, underscores and dots",
        ));
    }

    Ok(normalized.to_string())
}

/// Trims a batch of names, skipping blanks and case-insensitive duplicates.
pub fn normalize_batch(field: &'static str, values: Option<Vec<String>>) -> Result<Vec<String>, AppError> {
    let mut normalized: Vec<String> = Vec::new();
    for value in values.unwrap_or_default() {
        let value = value.trim();
        if value.is_empty()
            || normalized
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(value))
        {
            continue;
        }
        normalized.push(value.to_string());
    }

    if normalized.is_empty() {
        return Err(AppError::bad_request(
            "empty_batch",
            format!("{field} must contain at least one non-blank value"),
        ));
    }

    if normalized.len() > MAX_BATCH_SIZE {
        return Err(AppError::bad_request(
            "batch_too_large",
            format!("{field} must not contain more than {MAX_BATCH_SIZE} values"),
        ));
    }

    Ok(normalized)
}
