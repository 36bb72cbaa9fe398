//! JSON-RPC client of the cache administration service
//!
//! Every remote operation is one `tools/call`; the tool's structured content is
//! mapped back onto the shared domain records.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::console::monitor::ClusterReporting;
use crate::domain::models::{
    CacheConfiguration, CacheHost, CacheHostConfiguration, CacheItem, CacheStatistics,
    ClusterHealth, NamedCache, Region, Statistics,
};
use crate::mcp::server::SUPPORTED_PROTOCOL_VERSION;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("service answered with HTTP status {status}")]
    Status { status: u16 },
    #[error("{operation} failed with rpc error {code}: {message}")]
    Rpc {
        operation: String,
        code: i64,
        message: String,
    },
    #[error("invalid response to {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },
}

impl ConsoleError {
    fn invalid(operation: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug)]
pub struct AdminServiceClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    next_id: AtomicI64,
}

impl AdminServiceClient {
    pub fn new(uri: &str, token: impl Into<String>) -> Result<Self, ConsoleError> {
        let endpoint = format!("{}/mcp", uri.trim_end_matches('/'));
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("cache-admin-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ConsoleError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        Ok(Self {
            http,
            endpoint,
            token: token.into(),
            next_id: AtomicI64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, ConsoleError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(endpoint = %self.endpoint, method = %method, id, "sending rpc request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|source| ConsoleError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        if !response.status().is_success() {
            warn!(endpoint = %self.endpoint, status = response.status().as_u16(), "rpc request rejected");
            return Err(ConsoleError::Status {
                status: response.status().as_u16(),
            });
        }

        let mut body: Value = response
            .json()
            .await
            .map_err(|source| ConsoleError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        if let Some(error) = body.get("error") {
            let message = error
                .pointer("/data/message")
                .or_else(|| error.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(ConsoleError::Rpc {
                operation: method.to_string(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message,
            });
        }

        body.get_mut("result")
            .map(Value::take)
            .ok_or_else(|| ConsoleError::invalid(method, "response carries no result"))
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Map<String, Value>, ConsoleError> {
        let result = self
            .rpc("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
            .map_err(|err| match err {
                ConsoleError::Rpc { code, message, .. } => ConsoleError::Rpc {
                    operation: name.to_string(),
                    code,
                    message,
                },
                other => other,
            })?;

        match result.get("structuredContent") {
            Some(Value::Object(structured)) => Ok(structured.clone()),
            _ => Err(ConsoleError::invalid(name, "missing structured content")),
        }
    }

    async fn tool_field<T: DeserializeOwned>(
        &self,
        name: &str,
        arguments: Value,
        field: &str,
    ) -> Result<T, ConsoleError> {
        let mut structured = self.call_tool(name, arguments).await?;
        let value = structured
            .remove(field)
            .ok_or_else(|| ConsoleError::invalid(name, format!("missing field {field}")))?;
        serde_json::from_value(value)
            .map_err(|err| ConsoleError::invalid(name, format!("field {field}: {err}")))
    }

    /// Handshake; returns the service name and version.
    pub async fn initialize(&self) -> Result<(String, String), ConsoleError> {
        let result = self
            .rpc(
                "initialize",
                json!({
                    "protocolVersion": SUPPORTED_PROTOCOL_VERSION,
                    "clientInfo": {
                        "name": "cache-admin-console",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                    "capabilities": {},
                }),
            )
            .await?;

        let server_info = result
            .get("serverInfo")
            .ok_or_else(|| ConsoleError::invalid("initialize", "missing serverInfo"))?;
        let field = |key: &str| {
            server_info
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Ok((field("name"), field("version")))
    }

    pub async fn start_cluster(&self) -> Result<Vec<CacheHost>, ConsoleError> {
        self.tool_field("start_cluster", json!({}), "hosts").await
    }

    pub async fn stop_cluster(&self) -> Result<Vec<CacheHost>, ConsoleError> {
        self.tool_field("stop_cluster", json!({}), "hosts").await
    }

    pub async fn restart_cluster(&self) -> Result<Vec<CacheHost>, ConsoleError> {
        self.tool_field("restart_cluster", json!({}), "hosts").await
    }

    pub async fn start_host(
        &self,
        host_name: &str,
        cache_port: u16,
    ) -> Result<Option<CacheHost>, ConsoleError> {
        self.tool_field(
            "start_cache_host",
            json!({ "host_name": host_name, "cache_port": cache_port }),
            "host",
        )
        .await
    }

    pub async fn stop_host(
        &self,
        host_name: &str,
        cache_port: u16,
    ) -> Result<Option<CacheHost>, ConsoleError> {
        self.tool_field(
            "stop_cache_host",
            json!({ "host_name": host_name, "cache_port": cache_port }),
            "host",
        )
        .await
    }

    pub async fn restart_host(
        &self,
        host_name: &str,
        cache_port: u16,
    ) -> Result<Option<CacheHost>, ConsoleError> {
        self.tool_field(
            "restart_cache_host",
            json!({ "host_name": host_name, "cache_port": cache_port }),
            "host",
        )
        .await
    }

    pub async fn cache_host_config(
        &self,
        host_name: &str,
        cache_port: u16,
    ) -> Result<Option<CacheHostConfiguration>, ConsoleError> {
        self.tool_field(
            "get_cache_host_config",
            json!({ "host_name": host_name, "cache_port": cache_port }),
            "config",
        )
        .await
    }

    pub async fn set_cache_host_config(
        &self,
        config: &CacheHostConfiguration,
    ) -> Result<Option<CacheHostConfiguration>, ConsoleError> {
        self.tool_field(
            "set_cache_host_config",
            json!({
                "host_name": config.host_name,
                "cache_port": config.cache_port,
                "cluster_port": config.cluster_port,
                "arbitration_port": config.arbitration_port,
                "replication_port": config.replication_port,
                "size_mb": config.size_mb,
                "high_watermark": config.high_watermark,
                "low_watermark": config.low_watermark,
            }),
            "config",
        )
        .await
    }

    pub async fn cache_config(
        &self,
        cache_name: &str,
    ) -> Result<Option<CacheConfiguration>, ConsoleError> {
        self.tool_field("get_cache_config", json!({ "cache_name": cache_name }), "config")
            .await
    }

    pub async fn new_cache(
        &self,
        config: &CacheConfiguration,
    ) -> Result<Option<NamedCache>, ConsoleError> {
        self.tool_field("new_cache", cache_settings(config), "cache").await
    }

    pub async fn set_cache_config(
        &self,
        config: &CacheConfiguration,
    ) -> Result<Option<NamedCache>, ConsoleError> {
        self.tool_field("set_cache_config", cache_settings(config), "cache")
            .await
    }

    pub async fn remove_caches(&self, cache_names: &[String]) -> Result<Vec<String>, ConsoleError> {
        self.tool_field(
            "remove_caches",
            json!({ "cache_names": cache_names }),
            "removed",
        )
        .await
    }

    pub async fn cache_regions(&self, cache_name: &str) -> Result<Vec<Region>, ConsoleError> {
        self.tool_field("get_cache_regions", json!({ "cache_name": cache_name }), "regions")
            .await
    }

    pub async fn allowed_client_accounts(&self) -> Result<Vec<String>, ConsoleError> {
        self.tool_field("get_allowed_client_accounts", json!({}), "accounts")
            .await
    }

    pub async fn grant_client_accounts(
        &self,
        accounts: &[String],
    ) -> Result<Vec<String>, ConsoleError> {
        self.tool_field(
            "grant_client_accounts",
            json!({ "accounts": accounts }),
            "accounts",
        )
        .await
    }

    pub async fn revoke_client_accounts(
        &self,
        accounts: &[String],
    ) -> Result<Vec<String>, ConsoleError> {
        self.tool_field(
            "revoke_client_accounts",
            json!({ "accounts": accounts }),
            "accounts",
        )
        .await
    }

    pub async fn search_cache_items(
        &self,
        pattern: &str,
        cache_name: &str,
        region: Option<&str>,
    ) -> Result<Vec<CacheItem>, ConsoleError> {
        self.tool_field(
            "search_cache_items",
            json!({ "pattern": pattern, "cache_name": cache_name, "region": region }),
            "items",
        )
        .await
    }

    pub async fn remove_cache_items(
        &self,
        cache_name: &str,
        keys: &[String],
    ) -> Result<Vec<CacheItem>, ConsoleError> {
        self.tool_field(
            "remove_cache_items",
            json!({ "cache_name": cache_name, "keys": keys }),
            "removed",
        )
        .await
    }
}

fn cache_settings(config: &CacheConfiguration) -> Value {
    json!({
        "cache_name": config.cache_name,
        "eviction_type": config.eviction_type.to_string(),
        "expirable": config.is_expirable,
        "notifications_enabled": config.notifications_enabled,
        "time_to_live_mins": config.time_to_live_mins,
        "secondaries": config.secondaries,
    })
}

/// Omitted names ask the service for every host or cache.
fn names_argument(key: &str, names: &[String]) -> Value {
    if names.is_empty() {
        json!({})
    } else {
        json!({ key: names })
    }
}

#[async_trait]
impl ClusterReporting for AdminServiceClient {
    async fn cluster_health(&self) -> Result<ClusterHealth, ConsoleError> {
        self.tool_field("get_cluster_health", json!({}), "health").await
    }

    async fn cache_hosts(&self) -> Result<Vec<CacheHost>, ConsoleError> {
        self.tool_field("get_cache_hosts", json!({}), "hosts").await
    }

    async fn named_caches(&self) -> Result<Vec<NamedCache>, ConsoleError> {
        self.tool_field("get_named_caches", json!({}), "caches").await
    }

    async fn host_statistics(&self, hosts: &[String]) -> Result<Vec<Statistics>, ConsoleError> {
        self.tool_field(
            "get_host_statistics",
            names_argument("hosts", hosts),
            "statistics",
        )
        .await
    }

    async fn cache_statistics(
        &self,
        caches: &[String],
    ) -> Result<Vec<CacheStatistics>, ConsoleError> {
        self.tool_field(
            "get_cache_statistics",
            names_argument("caches", caches),
            "statistics",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::domain::fakes::{host, sample, FakeCluster};
    use crate::domain::models::{CacheServiceStatus, EvictionType};
    use crate::{build_app, AppState};

    const USERS_TOKEN: &str = "users-token-1234567890";
    const ADMIN_TOKEN: &str = "admin-token-1234567890";

    async fn serve(cluster: Arc<FakeCluster>) -> String {
        let state = AppState::new(
            USERS_TOKEN.to_string(),
            Some(ADMIN_TOKEN.to_string()),
            cluster.clone(),
            cluster.clone(),
            cluster,
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let address = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            axum::serve(listener, build_app(state).into_make_service())
                .await
                .expect("serve test app");
        });
        format!("http://{address}/")
    }

    fn cluster() -> Arc<FakeCluster> {
        Arc::new(FakeCluster {
            hosts: vec![host("hostA", CacheServiceStatus::Up)],
            host_samples: vec![sample("hostA", "Total Object Count", 12.0)],
            cache_samples: vec![sample("hostA", "Gets", 3.0)],
            caches: Mutex::new(vec![NamedCache {
                cache_name: "orders".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        })
    }

    #[test]
    fn endpoint_appends_mcp_path_once() {
        let client = AdminServiceClient::new("http://cache-admin:8080/", "t").expect("client");
        assert_eq!(client.endpoint(), "http://cache-admin:8080/mcp");
    }

    #[test]
    fn empty_name_list_asks_for_everything() {
        assert_eq!(names_argument("hosts", &[]), json!({}));
        assert_eq!(
            names_argument("hosts", &["a".to_string()]),
            json!({ "hosts": ["a"] })
        );
    }

    #[tokio::test]
    async fn reads_statistics_through_the_service() {
        let uri = serve(cluster()).await;
        let client = AdminServiceClient::new(&uri, USERS_TOKEN).expect("client");

        let (name, _) = client.initialize().await.expect("initialize");
        assert_eq!(name, env!("CARGO_PKG_NAME"));

        let hosts = client.host_statistics(&[]).await.expect("host statistics");
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].instance_name, "hostA");
        assert_eq!(hosts[0].counters[0].value, 12.0);

        let caches = client.cache_statistics(&[]).await.expect("cache statistics");
        assert_eq!(caches[0].instance_name, "orders");
        assert_eq!(caches[0].counters_by_host["hostA"][0].value, 3.0);

        let health = client.cluster_health().await.expect("fallback health");
        assert_eq!(health.hosts[0].status, CacheServiceStatus::Up);
    }

    #[tokio::test]
    async fn forbidden_operations_surface_as_rpc_errors() {
        let cluster = cluster();
        let uri = serve(cluster.clone()).await;
        let client = AdminServiceClient::new(&uri, USERS_TOKEN).expect("client");

        let error = client.stop_cluster().await.expect_err("forbidden");
        match error {
            ConsoleError::Rpc {
                operation, code, ..
            } => {
                assert_eq!(operation, "stop_cluster");
                assert_eq!(code, -32001);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn administrators_manage_caches_and_accounts() {
        let uri = serve(cluster()).await;
        let client = AdminServiceClient::new(&uri, ADMIN_TOKEN).expect("client");

        let created = client
            .new_cache(&CacheConfiguration {
                cache_name: "Sessions".to_string(),
                time_to_live_mins: 20,
                cache_type: None,
                secondaries: 1,
                is_expirable: true,
                eviction_type: EvictionType::None,
                notifications_enabled: false,
            })
            .await
            .expect("new cache")
            .expect("created cache");
        assert_eq!(created.cache_name, "Sessions");

        let removed = client
            .remove_caches(&["sessions".to_string(), "missing".to_string()])
            .await
            .expect("remove caches");
        assert_eq!(removed, vec!["sessions"]);

        let accounts = client
            .grant_client_accounts(&["CORP\\svc-web".to_string()])
            .await
            .expect("grant");
        assert_eq!(accounts, vec!["CORP\\svc-web"]);
    }

    #[tokio::test]
    async fn wrong_token_is_an_http_status_error() {
        let uri = serve(cluster()).await;
        let client = AdminServiceClient::new(&uri, "nope").expect("client");

        let error = client.cache_hosts().await.expect_err("unauthorized");
        assert!(matches!(error, ConsoleError::Status { status: 401 }));
    }
}
