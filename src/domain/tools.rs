//! Interactive tools exposed via Model Context Protocol
//!
//! One tool per cluster administration and reporting operation. Read-only tools
//! are open to the `Users` role, everything that changes the cluster requires
//! `Administrators`.

use chrono::{SecondsFormat, Utc};
use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::auth::{ensure_role, Role};
use crate::domain::admin::{self, PowerAction};
use crate::domain::models::{
    CacheConfiguration, CacheHostConfiguration, CacheItem, EvictionType, HostEndpoint,
};
use crate::domain::reporting;
use crate::domain::search;
use crate::domain::utils::{
    host_endpoint, normalize_batch, normalize_cache_name, parse_host_endpoint, validate_port,
};
use crate::mcp::rpc::{app_error_to_json_rpc, decode_params, json_rpc_result, not_found};
use crate::{errors::AppError, AppState};

pub const DEFAULT_TIME_TO_LIVE_MINS: u32 = 10;
pub const MAX_SECONDARIES: u32 = 1;
pub const MAX_WATERMARK: u32 = 100;

#[macros::mcp_tool(
    name = "get_cache_hosts",
    description = "List the cache hosts of the cluster with their service status"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetCacheHostsTool {}

#[macros::mcp_tool(
    name = "get_cluster_health",
    description = "Report per-host named cache health and unallocated named caches"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetClusterHealthTool {}

#[macros::mcp_tool(
    name = "get_host_statistics",
    description = "Read performance counters of cache hosts given as host or host:port (all hosts when omitted)"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetHostStatisticsTool {
    pub hosts: Option<Vec<String>>,
}

#[macros::mcp_tool(
    name = "get_cache_statistics",
    description = "Read performance counters of named caches, totals and per host (all caches when omitted)"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetCacheStatisticsTool {
    pub caches: Option<Vec<String>>,
}

#[macros::mcp_tool(
    name = "get_named_caches",
    description = "List named caches and their regions per host"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetNamedCachesTool {}

#[macros::mcp_tool(
    name = "get_cache_config",
    description = "Read the configuration of one named cache"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetCacheConfigTool {
    pub cache_name: String,
}

#[macros::mcp_tool(
    name = "get_cache_host_config",
    description = "Read the configuration of one cache host"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetCacheHostConfigTool {
    pub host_name: String,
    pub cache_port: Option<u32>,
}

#[macros::mcp_tool(
    name = "get_cache_regions",
    description = "List the regions of one named cache"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetCacheRegionsTool {
    pub cache_name: String,
}

#[macros::mcp_tool(
    name = "get_allowed_client_accounts",
    description = "List the accounts allowed to connect to the cluster as cache clients"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetAllowedClientAccountsTool {}

#[macros::mcp_tool(
    name = "search_cache_items",
    description = "Find item keys of a named cache matching a case-insensitive regular expression"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SearchCacheItemsTool {
    pub pattern: String,
    pub cache_name: String,
    pub region: Option<String>,
}

#[macros::mcp_tool(name = "start_cluster", description = "Start every host of the cache cluster")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct StartClusterTool {}

#[macros::mcp_tool(name = "stop_cluster", description = "Stop every host of the cache cluster")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct StopClusterTool {}

#[macros::mcp_tool(
    name = "restart_cluster",
    description = "Restart every host of the cache cluster"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct RestartClusterTool {}

#[macros::mcp_tool(name = "start_cache_host", description = "Start one cache host")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct StartCacheHostTool {
    pub host_name: String,
    pub cache_port: Option<u32>,
}

#[macros::mcp_tool(name = "stop_cache_host", description = "Stop one cache host")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct StopCacheHostTool {
    pub host_name: String,
    pub cache_port: Option<u32>,
}

#[macros::mcp_tool(name = "restart_cache_host", description = "Restart one cache host")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct RestartCacheHostTool {
    pub host_name: String,
    pub cache_port: Option<u32>,
}

#[macros::mcp_tool(
    name = "set_cache_host_config",
    description = "Change ports, size or watermarks of a cache host; omitted values keep their current setting"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SetCacheHostConfigTool {
    pub host_name: String,
    pub cache_port: Option<u32>,
    pub cluster_port: Option<u32>,
    pub arbitration_port: Option<u32>,
    pub replication_port: Option<u32>,
    pub size_mb: Option<u32>,
    pub high_watermark: Option<u32>,
    pub low_watermark: Option<u32>,
}

#[macros::mcp_tool(
    name = "new_cache",
    description = "Create a named cache (LRU eviction, expirable, 10 minute TTL unless given)"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct NewCacheTool {
    pub cache_name: String,
    pub eviction_type: Option<String>,
    pub expirable: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub time_to_live_mins: Option<u32>,
    pub secondaries: Option<u32>,
}

#[macros::mcp_tool(
    name = "set_cache_config",
    description = "Change the configuration of a named cache; omitted values keep their current setting"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SetCacheConfigTool {
    pub cache_name: String,
    pub eviction_type: Option<String>,
    pub expirable: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub time_to_live_mins: Option<u32>,
    pub secondaries: Option<u32>,
}

#[macros::mcp_tool(name = "remove_caches", description = "Remove named caches")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct RemoveCachesTool {
    pub cache_names: Option<Vec<String>>,
}

#[macros::mcp_tool(
    name = "grant_client_accounts",
    description = "Allow accounts to connect as cache clients"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GrantClientAccountsTool {
    pub accounts: Option<Vec<String>>,
}

#[macros::mcp_tool(
    name = "revoke_client_accounts",
    description = "Revoke cache client access of accounts"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct RevokeClientAccountsTool {
    pub accounts: Option<Vec<String>>,
}

#[macros::mcp_tool(
    name = "remove_cache_items",
    description = "Remove items of a named cache by key"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct RemoveCacheItemsTool {
    pub cache_name: String,
    pub keys: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct HostParams {
    pub host_name: String,
    pub cache_port: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CacheSettingsParams {
    pub cache_name: String,
    pub eviction_type: Option<String>,
    pub expirable: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub time_to_live_mins: Option<u32>,
    pub secondaries: Option<u32>,
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![
        GetCacheHostsTool::tool(),
        GetClusterHealthTool::tool(),
        GetHostStatisticsTool::tool(),
        GetCacheStatisticsTool::tool(),
        GetNamedCachesTool::tool(),
        GetCacheConfigTool::tool(),
        GetCacheHostConfigTool::tool(),
        GetCacheRegionsTool::tool(),
        GetAllowedClientAccountsTool::tool(),
        SearchCacheItemsTool::tool(),
        StartClusterTool::tool(),
        StopClusterTool::tool(),
        RestartClusterTool::tool(),
        StartCacheHostTool::tool(),
        StopCacheHostTool::tool(),
        RestartCacheHostTool::tool(),
        SetCacheHostConfigTool::tool(),
        NewCacheTool::tool(),
        SetCacheConfigTool::tool(),
        RemoveCachesTool::tool(),
        GrantClientAccountsTool::tool(),
        RevokeClientAccountsTool::tool(),
        RemoveCacheItemsTool::tool(),
    ]
}

pub fn required_role(tool_name: &str) -> Option<Role> {
    match tool_name {
        "get_cache_hosts"
        | "get_cluster_health"
        | "get_host_statistics"
        | "get_cache_statistics"
        | "get_named_caches"
        | "get_cache_config"
        | "get_cache_host_config"
        | "get_cache_regions"
        | "get_allowed_client_accounts"
        | "search_cache_items" => Some(Role::Users),
        "start_cluster"
        | "stop_cluster"
        | "restart_cluster"
        | "start_cache_host"
        | "stop_cache_host"
        | "restart_cache_host"
        | "set_cache_host_config"
        | "new_cache"
        | "set_cache_config"
        | "remove_caches"
        | "grant_client_accounts"
        | "revoke_client_accounts"
        | "remove_cache_items" => Some(Role::Administrators),
        _ => None,
    }
}

/// Text summary plus the structured payload of a tool call.
#[derive(Debug)]
pub struct ToolOutput {
    pub summary: String,
    pub structured: Map<String, Value>,
}

impl ToolOutput {
    fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            structured: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.structured.insert(key.to_string(), value);
        self
    }
}

fn parse_args<T: DeserializeOwned>(arguments: &Value) -> Result<T, AppError> {
    serde_json::from_value(arguments.clone()).map_err(|err| {
        AppError::bad_request("invalid_arguments", format!("invalid tool arguments: {err}"))
    })
}

fn parse_host(arguments: &Value) -> Result<HostEndpoint, AppError> {
    let params: HostParams = parse_args(arguments)?;
    host_endpoint(&params.host_name, params.cache_port)
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Applies the given settings over `base`.
pub fn cache_configuration(
    params: CacheSettingsParams,
    base: CacheConfiguration,
) -> Result<CacheConfiguration, AppError> {
    let eviction_type = match optional_text(params.eviction_type) {
        Some(eviction) => eviction.parse::<EvictionType>().map_err(|_| {
            AppError::bad_request("invalid_eviction_type", "eviction_type must be one of: none, lru")
        })?,
        None => base.eviction_type,
    };

    let secondaries = params.secondaries.unwrap_or(base.secondaries);
    if secondaries > MAX_SECONDARIES {
        return Err(AppError::bad_request(
            "invalid_secondaries",
            "secondaries must be 0 or 1",
        ));
    }

    let time_to_live_mins = params
        .time_to_live_mins
        .map(u64::from)
        .unwrap_or(base.time_to_live_mins);
    if time_to_live_mins == 0 {
        return Err(AppError::bad_request(
            "invalid_time_to_live",
            "time_to_live_mins must be at least 1",
        ));
    }

    Ok(CacheConfiguration {
        cache_name: base.cache_name,
        time_to_live_mins,
        cache_type: base.cache_type,
        secondaries,
        is_expirable: params.expirable.unwrap_or(base.is_expirable),
        eviction_type,
        notifications_enabled: params
            .notifications_enabled
            .unwrap_or(base.notifications_enabled),
    })
}

fn default_cache_configuration(cache_name: String) -> CacheConfiguration {
    CacheConfiguration {
        cache_name,
        time_to_live_mins: u64::from(DEFAULT_TIME_TO_LIVE_MINS),
        cache_type: None,
        secondaries: 0,
        is_expirable: true,
        eviction_type: EvictionType::Lru,
        notifications_enabled: false,
    }
}

fn optional_port(field: &'static str, value: Option<u32>, current: u16) -> Result<u16, AppError> {
    value.map_or(Ok(current), |port| validate_port(field, port))
}

async fn cluster_action(state: &AppState, action: PowerAction) -> Result<ToolOutput, AppError> {
    let hosts = admin::run_cluster_action(state.admin.as_ref(), action).await?;
    Ok(ToolOutput::new(format!(
        "Cluster {} issued, {} hosts reported",
        action.as_str(),
        hosts.len()
    ))
    .with("hosts", json!(hosts)))
}

async fn host_action(
    state: &AppState,
    arguments: &Value,
    action: PowerAction,
) -> Result<ToolOutput, AppError> {
    let endpoint = parse_host(arguments)?;
    let host = admin::run_host_action(state.admin.as_ref(), &endpoint, action).await?;
    Ok(
        ToolOutput::new(format!("Host {} issued for {endpoint}", action.as_str()))
            .with("host", json!(host)),
    )
}

pub async fn call_tool(state: &AppState, name: &str, arguments: &Value) -> Result<ToolOutput, AppError> {
    let admin_repo = state.admin.as_ref();

    match name {
        "get_cache_hosts" => {
            let hosts = admin_repo.cache_hosts(None).await?;
            Ok(ToolOutput::new(format!("Returned {} cache hosts", hosts.len()))
                .with("hosts", json!(hosts)))
        }
        "get_cluster_health" => {
            let health = reporting::cluster_health(admin_repo).await?;
            Ok(ToolOutput::new(format!(
                "Returned health of {} hosts and {} unallocated caches",
                health.hosts.len(),
                health.unallocated_named_caches.len()
            ))
            .with("health", json!(health)))
        }
        "get_host_statistics" => {
            let params: GetHostStatisticsTool = parse_args(arguments)?;
            let hosts = match params.hosts {
                Some(hosts) => normalize_batch("hosts", Some(hosts))?
                    .iter()
                    .map(|host| parse_host_endpoint(host))
                    .collect::<Result<Vec<_>, _>>()?,
                None => admin_repo
                    .cache_hosts(None)
                    .await?
                    .iter()
                    .map(|host| host.endpoint())
                    .collect(),
            };
            let statistics = reporting::host_statistics_batch(state.statistics.as_ref(), &hosts).await;
            Ok(ToolOutput::new(format!(
                "Returned statistics of {} of {} hosts",
                statistics.len(),
                hosts.len()
            ))
            .with("statistics", json!(statistics)))
        }
        "get_cache_statistics" => {
            let params: GetCacheStatisticsTool = parse_args(arguments)?;
            let caches = match params.caches {
                Some(caches) => normalize_batch("caches", Some(caches))?
                    .iter()
                    .map(|cache| normalize_cache_name(cache))
                    .collect::<Result<Vec<_>, _>>()?,
                None => admin_repo
                    .named_caches()
                    .await?
                    .into_iter()
                    .map(|cache| cache.cache_name)
                    .collect(),
            };
            let statistics =
                reporting::cache_statistics_batch(admin_repo, state.statistics.as_ref(), &caches)
                    .await;
            Ok(ToolOutput::new(format!(
                "Returned statistics of {} of {} caches",
                statistics.len(),
                caches.len()
            ))
            .with("statistics", json!(statistics)))
        }
        "get_named_caches" => {
            let caches = admin_repo.named_caches().await?;
            Ok(ToolOutput::new(format!("Returned {} named caches", caches.len()))
                .with("caches", json!(caches)))
        }
        "get_cache_config" => {
            let params: GetCacheConfigTool = parse_args(arguments)?;
            let cache_name = normalize_cache_name(&params.cache_name)?;
            let config = admin_repo.cache_config(&cache_name).await?;
            let summary = if config.is_some() {
                format!("Returned configuration of cache {cache_name}")
            } else {
                format!("Cache {cache_name} not found")
            };
            Ok(ToolOutput::new(summary).with("config", json!(config)))
        }
        "get_cache_host_config" => {
            let endpoint = parse_host(arguments)?;
            let config = admin_repo.cache_host_config(&endpoint).await?;
            Ok(ToolOutput::new(format!("Returned configuration of host {endpoint}"))
                .with("config", json!(config)))
        }
        "get_cache_regions" => {
            let params: GetCacheRegionsTool = parse_args(arguments)?;
            let cache_name = normalize_cache_name(&params.cache_name)?;
            let regions = admin_repo.cache_regions(&cache_name).await?;
            Ok(ToolOutput::new(format!("Returned {} regions", regions.len()))
                .with("regions", json!(regions)))
        }
        "get_allowed_client_accounts" => {
            let accounts = admin_repo.allowed_client_accounts().await?;
            Ok(ToolOutput::new(format!("Returned {} client accounts", accounts.len()))
                .with("accounts", json!(accounts)))
        }
        "search_cache_items" => {
            let params: SearchCacheItemsTool = parse_args(arguments)?;
            let cache_name = normalize_cache_name(&params.cache_name)?;
            let region = optional_text(params.region);
            let items = search::search_cache_items(
                admin_repo,
                state.items.as_ref(),
                params.pattern.trim(),
                &cache_name,
                region.as_deref(),
            )
            .await?;
            Ok(ToolOutput::new(format!("Found {} matching items", items.len()))
                .with("items", json!(items)))
        }
        "start_cluster" => cluster_action(state, PowerAction::Start).await,
        "stop_cluster" => cluster_action(state, PowerAction::Stop).await,
        "restart_cluster" => cluster_action(state, PowerAction::Restart).await,
        "start_cache_host" => host_action(state, arguments, PowerAction::Start).await,
        "stop_cache_host" => host_action(state, arguments, PowerAction::Stop).await,
        "restart_cache_host" => host_action(state, arguments, PowerAction::Restart).await,
        "set_cache_host_config" => {
            let params: SetCacheHostConfigTool = parse_args(arguments)?;
            let endpoint = host_endpoint(&params.host_name, params.cache_port)?;
            let current = admin_repo
                .cache_host_config(&endpoint)
                .await?
                .ok_or_else(|| AppError::bad_request("host_not_found", "cache host not found"))?;

            let high_watermark = params.high_watermark.unwrap_or(current.high_watermark);
            let low_watermark = params.low_watermark.unwrap_or(current.low_watermark);
            if high_watermark > MAX_WATERMARK || low_watermark > MAX_WATERMARK {
                return Err(AppError::bad_request(
                    "invalid_watermark",
                    "watermarks must be percentages between 0 and 100",
                ));
            }

            let config = CacheHostConfiguration {
                cluster_port: optional_port("cluster_port", params.cluster_port, current.cluster_port)?,
                arbitration_port: optional_port(
                    "arbitration_port",
                    params.arbitration_port,
                    current.arbitration_port,
                )?,
                replication_port: optional_port(
                    "replication_port",
                    params.replication_port,
                    current.replication_port,
                )?,
                size_mb: params.size_mb.map(u64::from).unwrap_or(current.size_mb),
                high_watermark,
                low_watermark,
                ..current
            };

            let config = admin::set_cache_host_config(admin_repo, &config).await?;
            Ok(ToolOutput::new(format!("Updated configuration of host {endpoint}"))
                .with("config", json!(config)))
        }
        "new_cache" => {
            let params: CacheSettingsParams = parse_args(arguments)?;
            let cache_name = normalize_cache_name(&params.cache_name)?;
            let config = cache_configuration(params, default_cache_configuration(cache_name))?;
            let cache = admin::new_cache(admin_repo, &config).await?;
            Ok(ToolOutput::new(format!("Created cache {}", config.cache_name))
                .with("cache", json!(cache)))
        }
        "set_cache_config" => {
            let params: CacheSettingsParams = parse_args(arguments)?;
            let cache_name = normalize_cache_name(&params.cache_name)?;
            let current = admin_repo
                .cache_config(&cache_name)
                .await?
                .ok_or_else(|| AppError::bad_request("cache_not_found", "named cache not found"))?;
            let config = cache_configuration(params, current)?;
            let cache = admin::set_cache_config(admin_repo, &config).await?;
            Ok(ToolOutput::new(format!("Updated configuration of cache {cache_name}"))
                .with("cache", json!(cache)))
        }
        "remove_caches" => {
            let params: RemoveCachesTool = parse_args(arguments)?;
            let cache_names = normalize_batch("cache_names", params.cache_names)?;
            let removed = admin::remove_caches(admin_repo, &cache_names).await;
            Ok(ToolOutput::new(format!(
                "Removed {} of {} caches",
                removed.len(),
                cache_names.len()
            ))
            .with("removed", json!(removed)))
        }
        "grant_client_accounts" => {
            let params: GrantClientAccountsTool = parse_args(arguments)?;
            let accounts = normalize_batch("accounts", params.accounts)?;
            let accounts = admin::grant_client_accounts(admin_repo, &accounts).await?;
            Ok(ToolOutput::new(format!("{} client accounts allowed", accounts.len()))
                .with("accounts", json!(accounts)))
        }
        "revoke_client_accounts" => {
            let params: RevokeClientAccountsTool = parse_args(arguments)?;
            let accounts = normalize_batch("accounts", params.accounts)?;
            let accounts = admin::revoke_client_accounts(admin_repo, &accounts).await?;
            Ok(ToolOutput::new(format!("{} client accounts allowed", accounts.len()))
                .with("accounts", json!(accounts)))
        }
        "remove_cache_items" => {
            let params: RemoveCacheItemsTool = parse_args(arguments)?;
            let cache_name = normalize_cache_name(&params.cache_name)?;
            let items = normalize_batch("keys", params.keys)?
                .into_iter()
                .map(|key| CacheItem {
                    key,
                    named_cache: cache_name.clone(),
                    region: None,
                })
                .collect::<Vec<_>>();
            let requested = items.len();
            let removed = search::remove_cache_items(state.items.as_ref(), items).await;
            Ok(ToolOutput::new(format!("Removed {} of {requested} items", removed.len()))
                .with("removed", json!(removed)))
        }
        _ => Err(AppError::internal(format!("tool {name} has no handler"))),
    }
}

pub async fn handle_tools_call(
    state: &AppState,
    role: Role,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let tool_call: CallToolRequestParams = match decode_params(&id, params) {
        Ok(tool_call) => tool_call,
        Err(response) => return response,
    };

    let Some(required) = required_role(&tool_call.name) else {
        return not_found(id, "tool_not_found", "unknown tool name", &tool_call.name);
    };

    if let Err(err) = ensure_role(role, required) {
        return app_error_to_json_rpc(id, err);
    }

    let arguments = json!(tool_call.arguments.unwrap_or_default());
    match call_tool(state, &tool_call.name, &arguments).await {
        Ok(ToolOutput {
            summary,
            mut structured,
        }) => {
            let generated_at_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            structured.insert("generated_at_utc".to_string(), json!(generated_at_utc));
            json_rpc_result(
                id,
                serde_json::to_value(CallToolResult {
                    content: vec![ContentBlock::from(TextContent::new(
                        summary,
                        None,
                        None,
                    ))],
                    is_error: None,
                    meta: None,
                    structured_content: Some(structured),
                })
                .expect("tool result serialization"),
            )
        }
        Err(err) => app_error_to_json_rpc(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(cache_name: &str) -> CacheSettingsParams {
        CacheSettingsParams {
            cache_name: cache_name.to_string(),
            eviction_type: None,
            expirable: None,
            notifications_enabled: None,
            time_to_live_mins: None,
            secondaries: None,
        }
    }

    #[test]
    fn every_listed_tool_has_a_role() {
        for tool in build_tools_list() {
            assert!(
                required_role(&tool.name).is_some(),
                "tool {} has no role",
                tool.name
            );
        }
        assert_eq!(required_role("get_cluster_health"), Some(Role::Users));
        assert_eq!(required_role("remove_caches"), Some(Role::Administrators));
        assert_eq!(required_role("format_disk"), None);
    }

    #[test]
    fn new_cache_defaults_to_lru_expirable_ten_minutes() {
        let config = cache_configuration(
            settings("orders"),
            default_cache_configuration("orders".to_string()),
        )
        .expect("valid settings");

        assert_eq!(config.eviction_type, EvictionType::Lru);
        assert!(config.is_expirable);
        assert_eq!(config.time_to_live_mins, 10);
        assert_eq!(config.secondaries, 0);
    }

    #[test]
    fn settings_override_only_given_values() {
        let base = CacheConfiguration {
            secondaries: 1,
            notifications_enabled: true,
            ..default_cache_configuration("orders".to_string())
        };
        let config = cache_configuration(
            CacheSettingsParams {
                eviction_type: Some(" None ".to_string()),
                time_to_live_mins: Some(60),
                ..settings("orders")
            },
            base,
        )
        .expect("valid settings");

        assert_eq!(config.eviction_type, EvictionType::None);
        assert_eq!(config.time_to_live_mins, 60);
        assert_eq!(config.secondaries, 1);
        assert!(config.notifications_enabled);
    }

    #[test]
    fn rejects_invalid_cache_settings() {
        let base = || default_cache_configuration("orders".to_string());

        let error = cache_configuration(
            CacheSettingsParams {
                eviction_type: Some("random".to_string()),
                ..settings("orders")
            },
            base(),
        )
        .expect_err("invalid eviction");
        assert!(error.to_string().contains("bad request"));

        assert!(cache_configuration(
            CacheSettingsParams {
                secondaries: Some(2),
                ..settings("orders")
            },
            base(),
        )
        .is_err());

        assert!(cache_configuration(
            CacheSettingsParams {
                time_to_live_mins: Some(0),
                ..settings("orders")
            },
            base(),
        )
        .is_err());
    }
}
