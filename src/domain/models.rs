//! Cluster records shared by the service, the wire contract and the console

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_PORT: u16 = 22233;
pub const MIN_CACHE_PORT: u16 = 1024;

/// Synthetic host key carrying the per-cache totals.
pub const TOTAL_SERIES: &str = "Total";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheServiceStatus {
    #[default]
    Unknown,
    Up,
    Down,
    Starting,
    ShuttingDown,
}

impl CacheServiceStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Self::Up,
            "down" => Self::Down,
            "starting" => Self::Starting,
            "shuttingdown" | "shutting_down" | "stopping" => Self::ShuttingDown,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for CacheServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Up => "up",
            Self::Down => "down",
            Self::Starting => "starting",
            Self::ShuttingDown => "shutting_down",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvictionType {
    None,
    #[default]
    Lru,
}

impl FromStr for EvictionType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lru" => Ok(Self::Lru),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EvictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "None",
            Self::Lru => "LRU",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheHost {
    pub host_name: String,
    pub cache_port: u16,
    pub cluster_port: Option<u16>,
    pub arbitration_port: Option<u16>,
    pub replication_port: Option<u16>,
    pub size_mb: Option<u64>,
    pub service_name: Option<String>,
    pub status: CacheServiceStatus,
    pub version_info: Option<String>,
}

impl CacheHost {
    pub fn endpoint(&self) -> HostEndpoint {
        HostEndpoint::new(self.host_name.clone(), self.cache_port)
    }
}

/// A cache host addressed by name and cache port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct HostEndpoint {
    pub host_name: String,
    pub port: u16,
}

impl HostEndpoint {
    pub fn new(host_name: impl Into<String>, port: u16) -> Self {
        Self {
            host_name: host_name.into(),
            port,
        }
    }
}

impl fmt::Display for HostEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_name, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheHostConfiguration {
    pub host_name: String,
    pub cluster_port: u16,
    pub cache_port: u16,
    pub arbitration_port: u16,
    pub replication_port: u16,
    pub size_mb: u64,
    pub service_name: Option<String>,
    pub high_watermark: u32,
    pub low_watermark: u32,
    pub is_lead_host: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedCache {
    pub cache_name: String,
    pub host_regions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfiguration {
    pub cache_name: String,
    pub time_to_live_mins: u64,
    pub cache_type: Option<String>,
    pub secondaries: u32,
    pub is_expirable: bool,
    pub eviction_type: EvictionType,
    pub notifications_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamedCacheHealth {
    pub name: String,
    pub healthy: f64,
    pub not_primary: f64,
    pub inadequate_secondaries: f64,
    pub throttled: f64,
    pub under_reconfiguration: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CacheHostHealth {
    pub host_name: String,
    pub status: CacheServiceStatus,
    pub named_caches: Vec<NamedCacheHealth>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UnallocatedNamedCache {
    pub name: String,
    pub fraction: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterHealth {
    pub hosts: Vec<CacheHostHealth>,
    pub unallocated_named_caches: Vec<UnallocatedNamedCache>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Counter {
    pub name: String,
    pub value: f64,
}

impl Counter {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub instance_name: String,
    pub counters: Vec<Counter>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CacheStatistics {
    pub instance_name: String,
    pub counters: Vec<Counter>,
    pub counters_by_host: BTreeMap<String, Vec<Counter>>,
}

/// One raw performance counter sample as read from a machine.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSample {
    pub machine_name: String,
    pub counter_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Region {
    pub region_name: String,
    pub cache_name: String,
    pub host_name: Option<String>,
    pub port: Option<u16>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheItem {
    pub key: String,
    pub named_cache: String,
    pub region: Option<String>,
}
