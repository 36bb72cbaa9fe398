//! Read-only cluster snapshots published as `resource://cluster/...` documents

use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceRequestParams, ReadResourceResult, Resource,
    TextResourceContents,
};
use serde_json::{json, Value};

use crate::domain::reporting;
use crate::errors::AppError;
use crate::mcp::rpc::{app_error_to_json_rpc, decode_params, json_rpc_result, not_found};
use crate::AppState;

pub const HOSTS_RESOURCE_URI: &str = "resource://cluster/hosts";
pub const HEALTH_RESOURCE_URI: &str = "resource://cluster/health";
pub const CACHES_RESOURCE_URI: &str = "resource://cluster/caches";

const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterResource {
    Hosts,
    Health,
    Caches,
}

impl ClusterResource {
    pub const ALL: [ClusterResource; 3] = [Self::Hosts, Self::Health, Self::Caches];

    pub fn uri(self) -> &'static str {
        match self {
            Self::Hosts => HOSTS_RESOURCE_URI,
            Self::Health => HEALTH_RESOURCE_URI,
            Self::Caches => CACHES_RESOURCE_URI,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|resource| resource.uri() == uri.trim())
    }

    fn describe(self) -> (&'static str, &'static str) {
        match self {
            Self::Hosts => (
                "Cache Hosts",
                "Cache hosts of the cluster with their service status",
            ),
            Self::Health => (
                "Cluster Health",
                "Named cache health per host and unallocated named caches",
            ),
            Self::Caches => ("Named Caches", "Named caches and their regions per host"),
        }
    }

    fn descriptor(self) -> Resource {
        let (name, description) = self.describe();
        Resource {
            annotations: None,
            description: Some(description.to_string()),
            icons: vec![],
            meta: None,
            mime_type: Some(JSON_MIME_TYPE.to_string()),
            name: name.to_string(),
            size: None,
            title: None,
            uri: self.uri().to_string(),
        }
    }

    async fn snapshot(self, state: &AppState) -> Result<Value, AppError> {
        Ok(match self {
            Self::Hosts => json!({ "hosts": state.admin.cache_hosts(None).await? }),
            Self::Health => {
                json!({ "health": reporting::cluster_health(state.admin.as_ref()).await? })
            }
            Self::Caches => json!({ "caches": state.admin.named_caches().await? }),
        })
    }
}

pub fn build_resources_list() -> Vec<Resource> {
    ClusterResource::ALL
        .into_iter()
        .map(ClusterResource::descriptor)
        .collect()
}

pub async fn handle_resources_read(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let request: ReadResourceRequestParams = match decode_params(&id, params) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let Some(resource) = ClusterResource::from_uri(&request.uri) else {
        return not_found(id, "resource_not_found", "unknown resource uri", &request.uri);
    };

    match resource.snapshot(state).await {
        Ok(snapshot) => json_rpc_result(
            id,
            serde_json::to_value(ReadResourceResult {
                contents: vec![ReadResourceContent::from(TextResourceContents {
                    meta: None,
                    mime_type: Some(JSON_MIME_TYPE.to_string()),
                    text: snapshot.to_string(),
                    uri: resource.uri().to_string(),
                })],
                meta: None,
            })
            .expect("read resource result serialization"),
        ),
        Err(err) => app_error_to_json_rpc(id, err),
    }
}
