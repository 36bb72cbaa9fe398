use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::models::{
    CacheConfiguration, CacheHost, CacheHostConfiguration, CacheHostHealth, ClusterHealth,
    CounterSample, EvictionType, HostEndpoint, NamedCache, NamedCacheHealth, Region,
    UnallocatedNamedCache, CacheServiceStatus,
};
use crate::errors::AppError;
use crate::powershell::{parse_output, quote, PsCommand, PsSession, ScriptRunner};

pub const DEFAULT_HOST_COUNTERS: [&str; 5] = [
    "\\AppFabric Caching:Host\\Total Data Size Bytes",
    "\\AppFabric Caching:Host\\Total Object Count",
    "\\AppFabric Caching:Host\\Total Client Requests /sec",
    "\\AppFabric Caching:Host\\Total Get Requests /sec",
    "\\AppFabric Caching:Host\\Cache Miss Percentage",
];

pub const CACHE_COUNTER_CATEGORY: &str = "AppFabric Caching:Cache";

pub const DEFAULT_CACHE_COUNTERS: [&str; 5] = [
    "Total Data Size Bytes",
    "Total Object Count",
    "Total Client Requests",
    "Total Get Requests",
    "Total Get Misses",
];

const HOST_PROJECTION: &str = "Select-Object HostName, PortNo, ServiceName, @{n='Status';e={[string]$_.Status}}, @{n='VersionInfo';e={[string]$_.VersionInfo}}";

const HEALTH_PROJECTION: &str = "ForEach-Object { $health = $_; [pscustomobject]@{ Hosts = @($health.Hosts | ForEach-Object { $hostHealth = $_; [pscustomobject]@{ HostName = $hostHealth.HostName; NamedCaches = @($hostHealth.NamedCaches | ForEach-Object { [pscustomobject]@{ Name = $_.Name; Healthy = $_[[Microsoft.ApplicationServer.Caching.Commands.NamedCacheHealthPerHost]::Healthy]; NotPrimary = $_[[Microsoft.ApplicationServer.Caching.Commands.NamedCacheHealthPerHost]::NotPrimary]; InadequateSecondaries = $_[[Microsoft.ApplicationServer.Caching.Commands.NamedCacheHealthPerHost]::InadequateSecondaries]; Throttled = $_[[Microsoft.ApplicationServer.Caching.Commands.NamedCacheHealthPerHost]::Throttled]; UnderReconfiguration = $_[[Microsoft.ApplicationServer.Caching.Commands.NamedCacheHealthPerHost]::UnderReconfiguration] } }) } }); UnallocatedNamedCaches = @($health.UnallocatedNamedCaches.NamedCaches | ForEach-Object { [pscustomobject]@{ Name = $_.Name; Fraction = $_.Fraction } }) } }";

const CONFIG_PROJECTION: &str =
    "Select-Object *, @{n='EvictionType';e={[string]$_.EvictionType}} -ExcludeProperty EvictionType";

const COUNTER_SAMPLES: &str = "Select-Object -ExpandProperty CounterSamples";
const COUNTER_PROJECTION: &str = "Select-Object Path, CookedValue";

/// Administration commands of the cache cluster.
#[async_trait]
pub trait CacheAdminRepository: Send + Sync {
    async fn start_cluster(&self) -> Result<Vec<CacheHost>, AppError>;
    async fn stop_cluster(&self) -> Result<Vec<CacheHost>, AppError>;
    async fn restart_cluster(&self) -> Result<Vec<CacheHost>, AppError>;
    async fn cluster_health(&self) -> Result<ClusterHealth, AppError>;
    async fn allowed_client_accounts(&self) -> Result<Vec<String>, AppError>;
    async fn grant_client_account(&self, account: &str) -> Result<(), AppError>;
    async fn revoke_client_account(&self, account: &str) -> Result<(), AppError>;
    async fn cache_hosts(&self, host: Option<&HostEndpoint>) -> Result<Vec<CacheHost>, AppError>;
    async fn cache_host_config(
        &self,
        host: &HostEndpoint,
    ) -> Result<Option<CacheHostConfiguration>, AppError>;
    async fn set_cache_host_config(&self, config: &CacheHostConfiguration)
        -> Result<(), AppError>;
    async fn start_host(&self, host: &HostEndpoint) -> Result<Option<CacheHost>, AppError>;
    async fn stop_host(&self, host: &HostEndpoint) -> Result<Option<CacheHost>, AppError>;
    async fn restart_host(&self, host: &HostEndpoint) -> Result<Option<CacheHost>, AppError>;
    async fn named_caches(&self) -> Result<Vec<NamedCache>, AppError>;
    async fn new_cache(&self, config: &CacheConfiguration) -> Result<(), AppError>;
    async fn remove_cache(&self, cache_name: &str) -> Result<(), AppError>;
    async fn cache_config(&self, cache_name: &str)
        -> Result<Option<CacheConfiguration>, AppError>;
    async fn set_cache_config(&self, config: &CacheConfiguration) -> Result<(), AppError>;
    async fn cache_regions(&self, cache_name: &str) -> Result<Vec<Region>, AppError>;
}

/// Raw performance counter samples of hosts and named caches.
#[async_trait]
pub trait CacheStatisticsRepository: Send + Sync {
    async fn host_samples(&self, host: &HostEndpoint) -> Result<Vec<CounterSample>, AppError>;
    async fn cache_samples(
        &self,
        cache_name: &str,
        hosts: &[String],
    ) -> Result<Vec<CounterSample>, AppError>;
}

/// Data access to the items of a named cache.
#[async_trait]
pub trait CacheItemStore: Send + Sync {
    async fn region_keys(&self, cache_name: &str, region: &str) -> Result<Vec<String>, AppError>;
    async fn remove_item(&self, cache_name: &str, key: &str) -> Result<bool, AppError>;
}

#[derive(Debug, Clone)]
pub struct CounterSet {
    pub host_counters: Vec<String>,
    pub cache_counters: Vec<String>,
}

impl Default for CounterSet {
    fn default() -> Self {
        Self {
            host_counters: DEFAULT_HOST_COUNTERS.iter().map(|c| c.to_string()).collect(),
            cache_counters: DEFAULT_CACHE_COUNTERS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

pub struct PowerShellClusterClient {
    runner: Arc<dyn ScriptRunner>,
    session: PsSession,
    counters: CounterSet,
}

impl PowerShellClusterClient {
    pub fn new(runner: Arc<dyn ScriptRunner>, session: PsSession, counters: CounterSet) -> Self {
        Self {
            runner,
            session,
            counters,
        }
    }

    async fn invoke(&self, command: PsCommand) -> Result<Vec<Value>, AppError> {
        let script = self.session.admin_script(&command);
        let stdout = self.runner.run(command.name(), &script).await?;
        Ok(parse_output(command.name(), &stdout)?)
    }

    async fn invoke_client(&self, name: &str, body: &str) -> Result<Vec<Value>, AppError> {
        let script = self.session.client_script(body);
        let stdout = self.runner.run(name, &script).await?;
        Ok(parse_output(name, &stdout)?)
    }

    async fn host_command(
        &self,
        name: &'static str,
        host: &HostEndpoint,
    ) -> Result<Option<CacheHost>, AppError> {
        self.invoke(host_params(PsCommand::new(name), host)).await?;
        Ok(self.cache_hosts(Some(host)).await?.into_iter().next())
    }

    async fn cluster_command(&self, name: &'static str) -> Result<Vec<CacheHost>, AppError> {
        self.invoke(PsCommand::new(name)).await?;
        self.cache_hosts(None).await
    }

    async fn counter_samples(
        &self,
        hosts: Vec<String>,
        paths: Vec<String>,
    ) -> Result<Vec<CounterSample>, AppError> {
        if hosts.is_empty() || paths.is_empty() {
            return Ok(Vec::new());
        }

        let command = PsCommand::new("Get-Counter")
            .list("ComputerName", hosts)
            .list("Counter", paths)
            .int("MaxSamples", 1)
            .text("ErrorAction", "SilentlyContinue")
            .pipe(COUNTER_SAMPLES)
            .pipe(COUNTER_PROJECTION);

        let rows = self.invoke(command).await?;
        let known_names = self
            .counters
            .host_counters
            .iter()
            .map(|path| counter_name_from_path(path).to_string())
            .chain(self.counters.cache_counters.iter().cloned())
            .collect::<Vec<_>>();

        Ok(rows
            .iter()
            .filter_map(|row| sample_from_json(row, &known_names))
            .collect())
    }
}

#[async_trait]
impl CacheAdminRepository for PowerShellClusterClient {
    async fn start_cluster(&self) -> Result<Vec<CacheHost>, AppError> {
        self.cluster_command("Start-CacheCluster").await
    }

    async fn stop_cluster(&self) -> Result<Vec<CacheHost>, AppError> {
        self.cluster_command("Stop-CacheCluster").await
    }

    async fn restart_cluster(&self) -> Result<Vec<CacheHost>, AppError> {
        self.cluster_command("Restart-CacheCluster").await
    }

    async fn cluster_health(&self) -> Result<ClusterHealth, AppError> {
        let rows = self
            .invoke(PsCommand::new("Get-CacheClusterHealth").pipe(HEALTH_PROJECTION))
            .await?;
        Ok(rows.first().map(health_from_json).unwrap_or_default())
    }

    async fn allowed_client_accounts(&self) -> Result<Vec<String>, AppError> {
        let rows = self
            .invoke(PsCommand::new("Get-CacheAllowedClientAccounts"))
            .await?;
        Ok(rows
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|account| !account.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn grant_client_account(&self, account: &str) -> Result<(), AppError> {
        self.invoke(
            PsCommand::new("Grant-CacheAllowedClientAccount")
                .text("Account", account)
                .switch("Force"),
        )
        .await?;
        Ok(())
    }

    async fn revoke_client_account(&self, account: &str) -> Result<(), AppError> {
        self.invoke(PsCommand::new("Revoke-CacheAllowedClientAccount").text("Account", account))
            .await?;
        Ok(())
    }

    async fn cache_hosts(&self, host: Option<&HostEndpoint>) -> Result<Vec<CacheHost>, AppError> {
        let mut command = PsCommand::new("Get-CacheHost");
        if let Some(host) = host {
            command = host_params(command, host);
        }

        let rows = self.invoke(command.pipe(HOST_PROJECTION)).await?;
        Ok(rows.iter().filter_map(host_from_json).collect())
    }

    async fn cache_host_config(
        &self,
        host: &HostEndpoint,
    ) -> Result<Option<CacheHostConfiguration>, AppError> {
        let rows = self
            .invoke(host_params(PsCommand::new("Get-CacheHostConfig"), host))
            .await?;
        Ok(rows.first().and_then(host_config_from_json))
    }

    async fn set_cache_host_config(
        &self,
        config: &CacheHostConfiguration,
    ) -> Result<(), AppError> {
        let command = PsCommand::new("Set-CacheHostConfig")
            .text("HostName", config.host_name.as_str())
            .int("CachePort", i64::from(config.cache_port))
            .int("ArbitrationPortNumber", i64::from(config.arbitration_port))
            .int("CacheSize", config.size_mb as i64)
            .int("ClusterPortNumber", i64::from(config.cluster_port))
            .int("HighWatermark", i64::from(config.high_watermark))
            .int("LowWatermark", i64::from(config.low_watermark))
            .int("ReplicationPortNumber", i64::from(config.replication_port));
        self.invoke(command).await?;
        Ok(())
    }

    async fn start_host(&self, host: &HostEndpoint) -> Result<Option<CacheHost>, AppError> {
        self.host_command("Start-CacheHost", host).await
    }

    async fn stop_host(&self, host: &HostEndpoint) -> Result<Option<CacheHost>, AppError> {
        self.host_command("Stop-CacheHost", host).await
    }

    async fn restart_host(&self, host: &HostEndpoint) -> Result<Option<CacheHost>, AppError> {
        self.host_command("Restart-CacheHost", host).await
    }

    async fn named_caches(&self) -> Result<Vec<NamedCache>, AppError> {
        let rows = self.invoke(PsCommand::new("Get-Cache")).await?;
        Ok(rows.iter().filter_map(named_cache_from_json).collect())
    }

    async fn new_cache(&self, config: &CacheConfiguration) -> Result<(), AppError> {
        self.invoke(cache_config_params(PsCommand::new("New-Cache"), config))
            .await?;
        Ok(())
    }

    async fn remove_cache(&self, cache_name: &str) -> Result<(), AppError> {
        self.invoke(PsCommand::new("Remove-Cache").text("CacheName", cache_name))
            .await?;
        Ok(())
    }

    async fn cache_config(
        &self,
        cache_name: &str,
    ) -> Result<Option<CacheConfiguration>, AppError> {
        let rows = self
            .invoke(
                PsCommand::new("Get-CacheConfig")
                    .text("CacheName", cache_name)
                    .pipe(CONFIG_PROJECTION),
            )
            .await?;
        Ok(rows.first().and_then(cache_config_from_json))
    }

    async fn set_cache_config(&self, config: &CacheConfiguration) -> Result<(), AppError> {
        self.invoke(cache_config_params(PsCommand::new("Set-CacheConfig"), config))
            .await?;
        Ok(())
    }

    async fn cache_regions(&self, cache_name: &str) -> Result<Vec<Region>, AppError> {
        let rows = self
            .invoke(PsCommand::new("Get-CacheRegion").text("CacheName", cache_name))
            .await?;
        Ok(rows.iter().filter_map(region_from_json).collect())
    }
}

#[async_trait]
impl CacheStatisticsRepository for PowerShellClusterClient {
    async fn host_samples(&self, host: &HostEndpoint) -> Result<Vec<CounterSample>, AppError> {
        self.counter_samples(
            vec![host.host_name.clone()],
            self.counters.host_counters.clone(),
        )
        .await
    }

    async fn cache_samples(
        &self,
        cache_name: &str,
        hosts: &[String],
    ) -> Result<Vec<CounterSample>, AppError> {
        let paths = self
            .counters
            .cache_counters
            .iter()
            .map(|counter| format!("\\{CACHE_COUNTER_CATEGORY}({cache_name})\\{counter}"))
            .collect();
        self.counter_samples(hosts.to_vec(), paths).await
    }
}

#[async_trait]
impl CacheItemStore for PowerShellClusterClient {
    async fn region_keys(&self, cache_name: &str, region: &str) -> Result<Vec<String>, AppError> {
        let body = format!(
            "$factory = New-Object Microsoft.ApplicationServer.Caching.DataCacheFactory; try {{ $factory.GetCache({}).GetObjectsInRegion({}) | ForEach-Object {{ $_.Key }} }} finally {{ $factory.Dispose() }}",
            quote(cache_name),
            quote(region)
        );
        let rows = self.invoke_client("GetObjectsInRegion", &body).await?;
        Ok(rows
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    async fn remove_item(&self, cache_name: &str, key: &str) -> Result<bool, AppError> {
        let body = format!(
            "$factory = New-Object Microsoft.ApplicationServer.Caching.DataCacheFactory; try {{ $factory.GetCache({}).Remove({}) }} finally {{ $factory.Dispose() }}",
            quote(cache_name),
            quote(key)
        );
        let rows = self.invoke_client("Remove", &body).await?;
        Ok(rows.first().and_then(Value::as_bool).unwrap_or(false))
    }
}

fn host_params(command: PsCommand, host: &HostEndpoint) -> PsCommand {
    command
        .text("HostName", host.host_name.as_str())
        .int("CachePort", i64::from(host.port))
}

fn cache_config_params(command: PsCommand, config: &CacheConfiguration) -> PsCommand {
    command
        .text("CacheName", config.cache_name.as_str())
        .text("Eviction", config.eviction_type.to_string())
        .bool("Expirable", config.is_expirable)
        .bool("NotificationsEnabled", config.notifications_enabled)
        .int("TimeToLive", config.time_to_live_mins as i64)
        .int("Secondaries", i64::from(config.secondaries))
        .switch("Force")
}

fn text(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(text) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn number(value: &Value, field: &str) -> Option<f64> {
    match value.get(field)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn port(value: &Value, field: &str) -> Option<u16> {
    number(value, field)
        .filter(|port| *port >= 0.0 && *port <= f64::from(u16::MAX))
        .map(|port| port as u16)
}

fn flag(value: &Value, field: &str) -> bool {
    match value.get(field) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn host_from_json(value: &Value) -> Option<CacheHost> {
    Some(CacheHost {
        host_name: text(value, "HostName")?,
        cache_port: port(value, "PortNo")?,
        cluster_port: port(value, "ClusterPort"),
        arbitration_port: port(value, "ArbitrationPort"),
        replication_port: port(value, "ReplicationPort"),
        size_mb: number(value, "Size").map(|size| size as u64),
        service_name: text(value, "ServiceName"),
        status: text(value, "Status")
            .map(|status| CacheServiceStatus::parse(&status))
            .unwrap_or_default(),
        version_info: text(value, "VersionInfo"),
    })
}

fn host_config_from_json(value: &Value) -> Option<CacheHostConfiguration> {
    Some(CacheHostConfiguration {
        host_name: text(value, "HostName")?,
        cluster_port: port(value, "ClusterPort")?,
        cache_port: port(value, "CachePort")?,
        arbitration_port: port(value, "ArbitrationPort").unwrap_or_default(),
        replication_port: port(value, "ReplicationPort").unwrap_or_default(),
        size_mb: number(value, "Size").unwrap_or_default() as u64,
        service_name: text(value, "ServiceName"),
        high_watermark: number(value, "HighWatermark").unwrap_or_default() as u32,
        low_watermark: number(value, "LowWatermark").unwrap_or_default() as u32,
        is_lead_host: flag(value, "IsLeadHost"),
    })
}

fn named_cache_from_json(value: &Value) -> Option<NamedCache> {
    let cache_name = text(value, "CacheName")?;
    let host_regions = value
        .get("HostRegionMap")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(host, regions)| {
                    let regions = match regions {
                        Value::Array(items) => items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                        Value::String(region) => vec![region.clone()],
                        _ => Vec::new(),
                    };
                    (host.clone(), regions)
                })
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    Some(NamedCache {
        cache_name,
        host_regions,
    })
}

fn cache_config_from_json(value: &Value) -> Option<CacheConfiguration> {
    Some(CacheConfiguration {
        cache_name: text(value, "CacheName")?,
        time_to_live_mins: number(value, "TimeToLive").unwrap_or_default() as u64,
        cache_type: text(value, "CacheType"),
        secondaries: number(value, "Secondaries").unwrap_or_default() as u32,
        is_expirable: flag(value, "IsExpirable"),
        eviction_type: text(value, "EvictionType")
            .and_then(|eviction| eviction.parse::<EvictionType>().ok())
            .unwrap_or_default(),
        notifications_enabled: flag(value, "NotificationsEnabled"),
    })
}

fn region_from_json(value: &Value) -> Option<Region> {
    Some(Region {
        region_name: text(value, "RegionName")?,
        cache_name: text(value, "CacheName").unwrap_or_default(),
        host_name: text(value, "HostName"),
        port: port(value, "PortNo"),
        role: text(value, "Role"),
    })
}

fn health_from_json(value: &Value) -> ClusterHealth {
    let hosts = value
        .get("Hosts")
        .and_then(Value::as_array)
        .map(|hosts| {
            hosts
                .iter()
                .filter_map(|host| {
                    Some(CacheHostHealth {
                        host_name: text(host, "HostName")?,
                        status: CacheServiceStatus::Unknown,
                        named_caches: host
                            .get("NamedCaches")
                            .and_then(Value::as_array)
                            .map(|caches| {
                                caches.iter().filter_map(named_cache_health_from_json).collect()
                            })
                            .unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let unallocated_named_caches = value
        .get("UnallocatedNamedCaches")
        .and_then(Value::as_array)
        .map(|caches| {
            caches
                .iter()
                .filter_map(|cache| {
                    Some(UnallocatedNamedCache {
                        name: text(cache, "Name")?,
                        fraction: number(cache, "Fraction").unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    ClusterHealth {
        hosts,
        unallocated_named_caches,
    }
}

fn named_cache_health_from_json(value: &Value) -> Option<NamedCacheHealth> {
    Some(NamedCacheHealth {
        name: text(value, "Name")?,
        healthy: number(value, "Healthy").unwrap_or_default(),
        not_primary: number(value, "NotPrimary").unwrap_or_default(),
        inadequate_secondaries: number(value, "InadequateSecondaries").unwrap_or_default(),
        throttled: number(value, "Throttled").unwrap_or_default(),
        under_reconfiguration: number(value, "UnderReconfiguration").unwrap_or_default(),
    })
}

fn counter_name_from_path(path: &str) -> &str {
    path.rsplit('\\').next().unwrap_or(path)
}

/// `Get-Counter` reports lower-cased paths of the form `\\machine\category(instance)\counter`;
/// counter names are restored to their configured spelling when one matches.
fn sample_from_json(value: &Value, known_names: &[String]) -> Option<CounterSample> {
    let path = text(value, "Path")?;
    let machine_name = path
        .strip_prefix("\\\\")?
        .split('\\')
        .next()
        .filter(|machine| !machine.is_empty())?
        .to_string();
    let parsed_name = counter_name_from_path(&path);
    let counter_name = known_names
        .iter()
        .find(|known| known.eq_ignore_ascii_case(parsed_name))
        .cloned()
        .unwrap_or_else(|| parsed_name.to_string());

    Some(CounterSample {
        machine_name,
        counter_name,
        value: number(value, "CookedValue")?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::powershell::CommandError;

    struct RecordingRunner {
        outputs: Mutex<Vec<Result<String, CommandError>>>,
        scripts: Mutex<Vec<String>>,
    }

    impl RecordingRunner {
        fn new(outputs: Vec<Result<String, CommandError>>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs),
                scripts: Mutex::new(Vec::new()),
            })
        }

        fn scripts(&self) -> Vec<String> {
            self.scripts.lock().expect("scripts lock").clone()
        }
    }

    #[async_trait]
    impl ScriptRunner for RecordingRunner {
        async fn run(&self, _command: &str, script: &str) -> Result<String, CommandError> {
            self.scripts
                .lock()
                .expect("scripts lock")
                .push(script.to_string());
            let mut outputs = self.outputs.lock().expect("outputs lock");
            if outputs.is_empty() {
                Ok(String::new())
            } else {
                outputs.remove(0)
            }
        }
    }

    fn client(runner: Arc<RecordingRunner>) -> PowerShellClusterClient {
        PowerShellClusterClient::new(runner, PsSession::default(), CounterSet::default())
    }

    #[test]
    fn maps_host_info_records() {
        let host = host_from_json(&json!({
            "HostName": "cache01",
            "PortNo": 22233,
            "ServiceName": "AppFabricCachingService",
            "Status": "Up",
            "VersionInfo": "3000[3,3][1,3]"
        }))
        .expect("host should map");

        assert_eq!(host.host_name, "cache01");
        assert_eq!(host.cache_port, 22233);
        assert_eq!(host.status, CacheServiceStatus::Up);
        assert_eq!(host.version_info.as_deref(), Some("3000[3,3][1,3]"));
        assert!(host_from_json(&json!({"PortNo": 22233})).is_none());
    }

    #[test]
    fn maps_named_cache_region_map() {
        let cache = named_cache_from_json(&json!({
            "CacheName": "default",
            "HostRegionMap": {
                "cache01": ["Default_Region_0103", "orders"],
                "cache02": "Default_Region_0200"
            }
        }))
        .expect("cache should map");

        assert_eq!(cache.host_regions["cache01"].len(), 2);
        assert_eq!(cache.host_regions["cache02"], vec!["Default_Region_0200"]);
    }

    #[test]
    fn maps_cache_configuration_eviction() {
        let config = cache_config_from_json(&json!({
            "CacheName": "orders",
            "TimeToLive": 10,
            "CacheType": "Partitioned",
            "Secondaries": 1,
            "IsExpirable": "True",
            "EvictionType": "None",
            "NotificationsEnabled": false
        }))
        .expect("config should map");

        assert_eq!(config.eviction_type, EvictionType::None);
        assert!(config.is_expirable);
        assert_eq!(config.secondaries, 1);
    }

    #[test]
    fn parses_counter_sample_paths() {
        let known = vec!["Total Object Count".to_string()];
        let sample = sample_from_json(
            &json!({
                "Path": "\\\\cache01\\appfabric caching:cache(orders)\\total object count",
                "CookedValue": 42.0
            }),
            &known,
        )
        .expect("sample should parse");

        assert_eq!(sample.machine_name, "cache01");
        assert_eq!(sample.counter_name, "Total Object Count");
        assert_eq!(sample.value, 42.0);
        assert!(sample_from_json(&json!({"Path": "garbage", "CookedValue": 1}), &known).is_none());
    }

    #[tokio::test]
    async fn cluster_health_maps_projection_output() {
        let runner = RecordingRunner::new(vec![Ok(json!({
            "Hosts": [{
                "HostName": "cache01",
                "NamedCaches": [{"Name": "default", "Healthy": 1, "NotPrimary": 0}]
            }],
            "UnallocatedNamedCaches": [{"Name": "orders", "Fraction": 0.5}]
        })
        .to_string())]);

        let health = client(runner.clone())
            .cluster_health()
            .await
            .expect("health should load");

        assert_eq!(health.hosts.len(), 1);
        assert_eq!(health.hosts[0].status, CacheServiceStatus::Unknown);
        assert_eq!(health.hosts[0].named_caches[0].healthy, 1.0);
        assert_eq!(health.unallocated_named_caches[0].fraction, 0.5);
        assert!(runner.scripts()[0].contains("Get-CacheClusterHealth"));
    }

    #[tokio::test]
    async fn start_host_reads_back_host_state() {
        let runner = RecordingRunner::new(vec![
            Ok(String::new()),
            Ok(json!({"HostName": "cache01", "PortNo": 22233, "Status": "Starting"}).to_string()),
        ]);

        let host = client(runner.clone())
            .start_host(&HostEndpoint::new("cache01", 22233))
            .await
            .expect("start should succeed")
            .expect("host should be returned");

        assert_eq!(host.status, CacheServiceStatus::Starting);
        let scripts = runner.scripts();
        assert!(scripts[0].contains("Start-CacheHost -HostName 'cache01' -CachePort 22233"));
        assert!(scripts[1].contains("Get-CacheHost -HostName 'cache01' -CachePort 22233"));
    }

    #[tokio::test]
    async fn command_failures_surface_as_command_errors() {
        let runner = RecordingRunner::new(vec![Err(CommandError::failed(
            "Remove-Cache",
            "ErrorCode<ERRCAdmin040>: cache does not exist",
        ))]);

        let err = client(runner)
            .remove_cache("missing")
            .await
            .expect_err("remove should fail");

        assert!(matches!(err, AppError::Command(_)));
        assert!(err.to_string().contains("ERRCAdmin040"));
    }

    #[tokio::test]
    async fn cache_samples_skip_when_no_hosts_are_known() {
        let runner = RecordingRunner::new(vec![]);
        let samples = client(runner.clone())
            .cache_samples("orders", &[])
            .await
            .expect("no hosts is not an error");

        assert!(samples.is_empty());
        assert!(runner.scripts().is_empty());
    }

    #[tokio::test]
    async fn region_keys_quote_cache_and_region() {
        let runner = RecordingRunner::new(vec![Ok(json!(["order:1", "order:2"]).to_string())]);
        let keys = client(runner.clone())
            .region_keys("orders", "it's")
            .await
            .expect("keys should load");

        assert_eq!(keys, vec!["order:1", "order:2"]);
        assert!(runner.scripts()[0].contains("GetObjectsInRegion('it''s')"));
    }
}
