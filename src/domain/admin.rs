//! Cluster, host, named cache and client account administration

use tracing::{info, warn};

use crate::cluster_client::CacheAdminRepository;
use crate::domain::models::{
    CacheConfiguration, CacheHost, CacheHostConfiguration, HostEndpoint, NamedCache,
};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Start,
    Stop,
    Restart,
}

impl PowerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

pub async fn run_cluster_action(
    admin: &dyn CacheAdminRepository,
    action: PowerAction,
) -> Result<Vec<CacheHost>, AppError> {
    info!(action = action.as_str(), "cluster action requested");
    match action {
        PowerAction::Start => admin.start_cluster().await,
        PowerAction::Stop => admin.stop_cluster().await,
        PowerAction::Restart => admin.restart_cluster().await,
    }
}

pub async fn run_host_action(
    admin: &dyn CacheAdminRepository,
    host: &HostEndpoint,
    action: PowerAction,
) -> Result<Option<CacheHost>, AppError> {
    info!(host = %host, action = action.as_str(), "host action requested");
    match action {
        PowerAction::Start => admin.start_host(host).await,
        PowerAction::Stop => admin.stop_host(host).await,
        PowerAction::Restart => admin.restart_host(host).await,
    }
}

pub async fn set_cache_host_config(
    admin: &dyn CacheAdminRepository,
    config: &CacheHostConfiguration,
) -> Result<Option<CacheHostConfiguration>, AppError> {
    if config.low_watermark > config.high_watermark {
        return Err(AppError::bad_request(
            "invalid_watermark",
            "low_watermark must not exceed high_watermark",
        ));
    }

    admin.set_cache_host_config(config).await?;
    admin
        .cache_host_config(&HostEndpoint::new(config.host_name.clone(), config.cache_port))
        .await
}

async fn find_named_cache(
    admin: &dyn CacheAdminRepository,
    cache_name: &str,
) -> Result<Option<NamedCache>, AppError> {
    Ok(admin
        .named_caches()
        .await?
        .into_iter()
        .find(|cache| cache.cache_name.eq_ignore_ascii_case(cache_name)))
}

pub async fn new_cache(
    admin: &dyn CacheAdminRepository,
    config: &CacheConfiguration,
) -> Result<Option<NamedCache>, AppError> {
    admin.new_cache(config).await?;
    find_named_cache(admin, &config.cache_name).await
}

pub async fn set_cache_config(
    admin: &dyn CacheAdminRepository,
    config: &CacheConfiguration,
) -> Result<Option<NamedCache>, AppError> {
    admin.set_cache_config(config).await?;
    find_named_cache(admin, &config.cache_name).await
}

/// Removes each cache; a cache that fails to be removed is left out of the result.
pub async fn remove_caches(admin: &dyn CacheAdminRepository, cache_names: &[String]) -> Vec<String> {
    let mut removed = Vec::with_capacity(cache_names.len());
    for cache_name in cache_names {
        match admin.remove_cache(cache_name).await {
            Ok(()) => removed.push(cache_name.clone()),
            Err(err) => warn!(cache = %cache_name, error = %err, "named cache removal failed"),
        }
    }
    removed
}

pub async fn grant_client_accounts(
    admin: &dyn CacheAdminRepository,
    accounts: &[String],
) -> Result<Vec<String>, AppError> {
    for account in accounts {
        if let Err(err) = admin.grant_client_account(account).await {
            warn!(account = %account, error = %err, "client account grant failed");
        }
    }
    admin.allowed_client_accounts().await
}

pub async fn revoke_client_accounts(
    admin: &dyn CacheAdminRepository,
    accounts: &[String],
) -> Result<Vec<String>, AppError> {
    for account in accounts {
        if let Err(err) = admin.revoke_client_account(account).await {
            warn!(account = %account, error = %err, "client account revoke failed");
        }
    }
    admin.allowed_client_accounts().await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::fakes::{host, FakeCluster};
    use crate::domain::models::{CacheServiceStatus, EvictionType, DEFAULT_CACHE_PORT};

    fn cache_config(name: &str) -> CacheConfiguration {
        CacheConfiguration {
            cache_name: name.to_string(),
            time_to_live_mins: 10,
            cache_type: None,
            secondaries: 0,
            is_expirable: true,
            eviction_type: EvictionType::Lru,
            notifications_enabled: false,
        }
    }

    #[tokio::test]
    async fn new_cache_returns_cache_found_by_name() {
        let cluster = FakeCluster::default();
        let cache = new_cache(&cluster, &cache_config("Orders"))
            .await
            .expect("new cache")
            .expect("cache should exist");

        assert_eq!(cache.cache_name, "Orders");
    }

    #[tokio::test]
    async fn remove_caches_keeps_only_successful_removals() {
        let cluster = FakeCluster::default();
        new_cache(&cluster, &cache_config("orders")).await.expect("new cache");

        let removed = remove_caches(&cluster, &["missing".to_string(), "ORDERS".to_string()]).await;

        assert_eq!(removed, vec!["ORDERS"]);
    }

    #[tokio::test]
    async fn grant_continues_past_failures_and_returns_accounts() {
        let cluster = FakeCluster {
            accounts: Mutex::new(vec!["CORP\\existing".to_string()]),
            ..Default::default()
        };

        let accounts = grant_client_accounts(
            &cluster,
            &["CORP\\fail".to_string(), "CORP\\svc-web".to_string()],
        )
        .await
        .expect("grant");

        assert_eq!(accounts, vec!["CORP\\existing", "CORP\\svc-web"]);

        let accounts = revoke_client_accounts(&cluster, &["corp\\EXISTING".to_string()])
            .await
            .expect("revoke");
        assert_eq!(accounts, vec!["CORP\\svc-web"]);
    }

    #[tokio::test]
    async fn host_actions_return_the_host() {
        let cluster = FakeCluster {
            hosts: vec![host("cache01", CacheServiceStatus::Up)],
            ..Default::default()
        };
        let endpoint = HostEndpoint::new("cache01", DEFAULT_CACHE_PORT);

        let host = run_host_action(&cluster, &endpoint, PowerAction::Restart)
            .await
            .expect("restart")
            .expect("host");

        assert_eq!(host.host_name, "cache01");
        assert_eq!(cluster.calls(), vec!["restart_host cache01:22233"]);
    }

    #[tokio::test]
    async fn host_config_rejects_inverted_watermarks() {
        let cluster = FakeCluster::default();
        let config = CacheHostConfiguration {
            host_name: "cache01".to_string(),
            cluster_port: 22234,
            cache_port: DEFAULT_CACHE_PORT,
            arbitration_port: 22235,
            replication_port: 22236,
            size_mb: 1024,
            service_name: None,
            high_watermark: 50,
            low_watermark: 90,
            is_lead_host: false,
        };

        let error = set_cache_host_config(&cluster, &config)
            .await
            .expect_err("inverted watermarks");
        assert!(error.to_string().contains("bad request"));

        let config = CacheHostConfiguration {
            low_watermark: 70,
            high_watermark: 90,
            ..config
        };
        let stored = set_cache_host_config(&cluster, &config)
            .await
            .expect("set config")
            .expect("re-read config");
        assert_eq!(stored, config);
    }
}
