//! In-memory cluster backing the domain and router tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cluster_client::{CacheAdminRepository, CacheItemStore, CacheStatisticsRepository};
use crate::domain::models::{
    CacheConfiguration, CacheHost, CacheHostConfiguration, CacheServiceStatus, ClusterHealth,
    CounterSample, HostEndpoint, NamedCache, Region, DEFAULT_CACHE_PORT,
};
use crate::errors::AppError;
use crate::powershell::CommandError;

pub fn host(name: &str, status: CacheServiceStatus) -> CacheHost {
    CacheHost {
        host_name: name.to_string(),
        cache_port: DEFAULT_CACHE_PORT,
        cluster_port: None,
        arbitration_port: None,
        replication_port: None,
        size_mb: None,
        service_name: None,
        status,
        version_info: None,
    }
}

pub fn sample(machine: &str, counter: &str, value: f64) -> CounterSample {
    CounterSample {
        machine_name: machine.to_string(),
        counter_name: counter.to_string(),
        value,
    }
}

#[derive(Default)]
pub struct FakeCluster {
    pub hosts: Vec<CacheHost>,
    pub health: Option<ClusterHealth>,
    pub caches: Mutex<Vec<NamedCache>>,
    pub configs: Mutex<Vec<CacheConfiguration>>,
    pub host_configs: Mutex<Vec<CacheHostConfiguration>>,
    pub accounts: Mutex<Vec<String>>,
    pub regions: Vec<Region>,
    pub host_samples: Vec<CounterSample>,
    pub cache_samples: Vec<CounterSample>,
    /// `(region, key)` pairs of the single fake named cache.
    pub items: Mutex<Vec<(String, String)>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeCluster {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("calls lock").push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl CacheAdminRepository for FakeCluster {
    async fn start_cluster(&self) -> Result<Vec<CacheHost>, AppError> {
        self.record("start_cluster");
        Ok(self.hosts.clone())
    }

    async fn stop_cluster(&self) -> Result<Vec<CacheHost>, AppError> {
        self.record("stop_cluster");
        Ok(self.hosts.clone())
    }

    async fn restart_cluster(&self) -> Result<Vec<CacheHost>, AppError> {
        self.record("restart_cluster");
        Ok(self.hosts.clone())
    }

    async fn cluster_health(&self) -> Result<ClusterHealth, AppError> {
        self.health.clone().ok_or_else(|| {
            AppError::from(CommandError::failed(
                "Get-CacheClusterHealth",
                "cluster is not running",
            ))
        })
    }

    async fn allowed_client_accounts(&self) -> Result<Vec<String>, AppError> {
        Ok(self.accounts.lock().expect("accounts lock").clone())
    }

    async fn grant_client_account(&self, account: &str) -> Result<(), AppError> {
        if account.contains("fail") {
            return Err(CommandError::failed("Grant-CacheAllowedClientAccount", "denied").into());
        }
        self.accounts
            .lock()
            .expect("accounts lock")
            .push(account.to_string());
        Ok(())
    }

    async fn revoke_client_account(&self, account: &str) -> Result<(), AppError> {
        self.accounts
            .lock()
            .expect("accounts lock")
            .retain(|existing| !existing.eq_ignore_ascii_case(account));
        Ok(())
    }

    async fn cache_hosts(
        &self,
        host: Option<&HostEndpoint>,
    ) -> Result<Vec<CacheHost>, AppError> {
        Ok(match host {
            Some(endpoint) => self
                .hosts
                .iter()
                .filter(|host| host.host_name.eq_ignore_ascii_case(&endpoint.host_name))
                .cloned()
                .collect(),
            None => self.hosts.clone(),
        })
    }

    async fn cache_host_config(
        &self,
        host: &HostEndpoint,
    ) -> Result<Option<CacheHostConfiguration>, AppError> {
        Ok(self
            .host_configs
            .lock()
            .expect("host configs lock")
            .iter()
            .find(|config| config.host_name.eq_ignore_ascii_case(&host.host_name))
            .cloned())
    }

    async fn set_cache_host_config(
        &self,
        config: &CacheHostConfiguration,
    ) -> Result<(), AppError> {
        let mut configs = self.host_configs.lock().expect("host configs lock");
        configs.retain(|existing| !existing.host_name.eq_ignore_ascii_case(&config.host_name));
        configs.push(config.clone());
        Ok(())
    }

    async fn start_host(&self, host: &HostEndpoint) -> Result<Option<CacheHost>, AppError> {
        self.record(format!("start_host {host}"));
        Ok(self.cache_hosts(Some(host)).await?.into_iter().next())
    }

    async fn stop_host(&self, host: &HostEndpoint) -> Result<Option<CacheHost>, AppError> {
        self.record(format!("stop_host {host}"));
        Ok(self.cache_hosts(Some(host)).await?.into_iter().next())
    }

    async fn restart_host(&self, host: &HostEndpoint) -> Result<Option<CacheHost>, AppError> {
        self.record(format!("restart_host {host}"));
        Ok(self.cache_hosts(Some(host)).await?.into_iter().next())
    }

    async fn named_caches(&self) -> Result<Vec<NamedCache>, AppError> {
        Ok(self.caches.lock().expect("caches lock").clone())
    }

    async fn new_cache(&self, config: &CacheConfiguration) -> Result<(), AppError> {
        self.caches.lock().expect("caches lock").push(NamedCache {
            cache_name: config.cache_name.clone(),
            host_regions: BTreeMap::new(),
        });
        self.configs
            .lock()
            .expect("configs lock")
            .push(config.clone());
        Ok(())
    }

    async fn remove_cache(&self, cache_name: &str) -> Result<(), AppError> {
        let mut caches = self.caches.lock().expect("caches lock");
        let before = caches.len();
        caches.retain(|cache| !cache.cache_name.eq_ignore_ascii_case(cache_name));
        if caches.len() == before {
            return Err(CommandError::failed("Remove-Cache", "cache does not exist").into());
        }
        Ok(())
    }

    async fn cache_config(
        &self,
        cache_name: &str,
    ) -> Result<Option<CacheConfiguration>, AppError> {
        Ok(self
            .configs
            .lock()
            .expect("configs lock")
            .iter()
            .find(|config| config.cache_name.eq_ignore_ascii_case(cache_name))
            .cloned())
    }

    async fn set_cache_config(&self, config: &CacheConfiguration) -> Result<(), AppError> {
        let mut configs = self.configs.lock().expect("configs lock");
        configs.retain(|existing| !existing.cache_name.eq_ignore_ascii_case(&config.cache_name));
        configs.push(config.clone());
        Ok(())
    }

    async fn cache_regions(&self, cache_name: &str) -> Result<Vec<Region>, AppError> {
        if cache_name == "broken" {
            return Err(CommandError::failed("Get-CacheRegion", "ErrorCode<ERRCAdmin040>").into());
        }
        Ok(self
            .regions
            .iter()
            .filter(|region| region.cache_name.eq_ignore_ascii_case(cache_name))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CacheStatisticsRepository for FakeCluster {
    async fn host_samples(&self, host: &HostEndpoint) -> Result<Vec<CounterSample>, AppError> {
        if host.host_name == "broken" {
            return Err(CommandError::failed("Get-Counter", "host unreachable").into());
        }
        Ok(self
            .host_samples
            .iter()
            .filter(|sample| sample.machine_name.eq_ignore_ascii_case(&host.host_name))
            .cloned()
            .collect())
    }

    async fn cache_samples(
        &self,
        _cache_name: &str,
        hosts: &[String],
    ) -> Result<Vec<CounterSample>, AppError> {
        Ok(self
            .cache_samples
            .iter()
            .filter(|sample| hosts.contains(&sample.machine_name))
            .cloned()
            .collect())
    }
}


#[async_trait]
impl CacheItemStore for FakeCluster {
    async fn region_keys(&self, _cache_name: &str, region: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .items
            .lock()
            .expect("items lock")
            .iter()
            .filter(|(item_region, _)| item_region == region)
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn remove_item(&self, _cache_name: &str, key: &str) -> Result<bool, AppError> {
        if key == "poison" {
            return Err(CommandError::failed("Remove", "connection reset").into());
        }
        let mut items = self.items.lock().expect("items lock");
        let before = items.len();
        items.retain(|(_, existing)| existing != key);
        Ok(items.len() != before)
    }
}
