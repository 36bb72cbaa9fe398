//! Health and statistics aggregation over the cluster repositories

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::cluster_client::{CacheAdminRepository, CacheStatisticsRepository};
use crate::domain::models::{
    CacheHost, CacheHostHealth, CacheServiceStatus, CacheStatistics, ClusterHealth, Counter,
    CounterSample, HostEndpoint, Statistics, DEFAULT_CACHE_PORT,
};
use crate::errors::AppError;

/// Cluster health with each host's live service status.
///
/// When the health command itself fails the live host list stands in, so the
/// console still sees every host (without named-cache detail).
pub async fn cluster_health(admin: &dyn CacheAdminRepository) -> Result<ClusterHealth, AppError> {
    let mut health = match admin.cluster_health().await {
        Ok(health) => health,
        Err(err) => {
            warn!(error = %err, "cluster health unavailable, falling back to host list");
            let hosts = admin.cache_hosts(None).await?;
            ClusterHealth {
                hosts: hosts
                    .into_iter()
                    .map(|host| CacheHostHealth {
                        host_name: host.host_name,
                        status: CacheServiceStatus::Unknown,
                        named_caches: Vec::new(),
                    })
                    .collect(),
                unallocated_named_caches: Vec::new(),
            }
        }
    };

    for host in &mut health.hosts {
        let endpoint = HostEndpoint::new(host.host_name.clone(), DEFAULT_CACHE_PORT);
        host.status = match admin.cache_hosts(Some(&endpoint)).await {
            Ok(live) => live_status(&live, &host.host_name),
            Err(err) => {
                debug!(host = %endpoint, error = %err, "host status lookup failed");
                CacheServiceStatus::Unknown
            }
        };
    }

    Ok(health)
}

fn live_status(live: &[CacheHost], host_name: &str) -> CacheServiceStatus {
    live.iter()
        .find(|host| host.host_name.eq_ignore_ascii_case(host_name))
        .map(|host| host.status)
        .unwrap_or_default()
}

pub async fn host_statistics(
    stats: &dyn CacheStatisticsRepository,
    host: &HostEndpoint,
) -> Result<Option<Statistics>, AppError> {
    let samples = stats.host_samples(host).await?;
    if samples.is_empty() {
        return Ok(None);
    }

    Ok(Some(Statistics {
        instance_name: host.host_name.clone(),
        counters: sum_by_counter(&samples),
    }))
}

pub async fn cache_statistics(
    admin: &dyn CacheAdminRepository,
    stats: &dyn CacheStatisticsRepository,
    cache_name: &str,
) -> Result<Option<CacheStatistics>, AppError> {
    let hosts = admin
        .cache_hosts(None)
        .await?
        .into_iter()
        .map(|host| host.host_name)
        .collect::<Vec<_>>();
    let samples = stats.cache_samples(cache_name, &hosts).await?;

    Ok(group_cache_samples(cache_name, &samples))
}

/// Batch form used by the RPC tools: a host whose counters cannot be read is
/// left out of the result.
pub async fn host_statistics_batch(
    stats: &dyn CacheStatisticsRepository,
    hosts: &[HostEndpoint],
) -> Vec<Statistics> {
    let mut result = Vec::with_capacity(hosts.len());
    for host in hosts {
        match host_statistics(stats, host).await {
            Ok(Some(statistics)) => result.push(statistics),
            Ok(None) => debug!(host = %host, "no counter samples for host"),
            Err(err) => warn!(host = %host, error = %err, "host statistics failed"),
        }
    }
    result
}

pub async fn cache_statistics_batch(
    admin: &dyn CacheAdminRepository,
    stats: &dyn CacheStatisticsRepository,
    cache_names: &[String],
) -> Vec<CacheStatistics> {
    let mut result = Vec::with_capacity(cache_names.len());
    for cache_name in cache_names {
        match cache_statistics(admin, stats, cache_name).await {
            Ok(Some(statistics)) => result.push(statistics),
            Ok(None) => debug!(cache = %cache_name, "no counter samples for cache"),
            Err(err) => warn!(cache = %cache_name, error = %err, "cache statistics failed"),
        }
    }
    result
}

pub fn group_cache_samples(cache_name: &str, samples: &[CounterSample]) -> Option<CacheStatistics> {
    if samples.is_empty() {
        return None;
    }

    let mut by_host: BTreeMap<String, Vec<CounterSample>> = BTreeMap::new();
    for sample in samples {
        by_host
            .entry(sample.machine_name.clone())
            .or_default()
            .push(sample.clone());
    }

    Some(CacheStatistics {
        instance_name: cache_name.to_string(),
        counters: sum_by_counter(samples),
        counters_by_host: by_host
            .into_iter()
            .map(|(host, samples)| (host, sum_by_counter(&samples)))
            .collect(),
    })
}

/// Sums samples per counter name, keeping the order in which names first appear.
pub fn sum_by_counter(samples: &[CounterSample]) -> Vec<Counter> {
    let mut counters: Vec<Counter> = Vec::new();
    for sample in samples {
        match counters
            .iter_mut()
            .find(|counter| counter.name.eq_ignore_ascii_case(&sample.counter_name))
        {
            Some(counter) => counter.value += sample.value,
            None => counters.push(Counter::new(sample.counter_name.clone(), sample.value)),
        }
    }
    counters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fakes::{host, sample, FakeCluster};
    use crate::domain::models::{NamedCacheHealth, UnallocatedNamedCache};

    #[tokio::test]
    async fn health_takes_live_status_and_defaults_unknown() {
        let cluster = FakeCluster {
            hosts: vec![host("cache01", CacheServiceStatus::Up)],
            health: Some(ClusterHealth {
                hosts: vec![
                    CacheHostHealth {
                        host_name: "CACHE01".to_string(),
                        status: CacheServiceStatus::Unknown,
                        named_caches: vec![NamedCacheHealth {
                            name: "default".to_string(),
                            healthy: 1.0,
                            ..Default::default()
                        }],
                    },
                    CacheHostHealth {
                        host_name: "cache02".to_string(),
                        ..Default::default()
                    },
                ],
                unallocated_named_caches: vec![UnallocatedNamedCache {
                    name: "orders".to_string(),
                    fraction: 0.25,
                }],
            }),
            ..Default::default()
        };

        let health = cluster_health(&cluster).await.expect("health");

        assert_eq!(health.hosts[0].status, CacheServiceStatus::Up);
        assert_eq!(health.hosts[1].status, CacheServiceStatus::Unknown);
        assert_eq!(health.unallocated_named_caches.len(), 1);
    }

    #[tokio::test]
    async fn health_falls_back_to_host_list_when_command_fails() {
        let cluster = FakeCluster {
            hosts: vec![
                host("cache01", CacheServiceStatus::Up),
                host("cache02", CacheServiceStatus::Down),
            ],
            health: None,
            ..Default::default()
        };

        let health = cluster_health(&cluster).await.expect("fallback health");

        assert_eq!(health.hosts.len(), 2);
        assert_eq!(health.hosts[1].status, CacheServiceStatus::Down);
        assert!(health.hosts.iter().all(|host| host.named_caches.is_empty()));
    }

    #[test]
    fn groups_cache_samples_by_host_and_sums_totals() {
        let stats = group_cache_samples(
            "orders",
            &[
                sample("hostA", "Gets", 10.0),
                sample("hostB", "Gets", 20.0),
                sample("hostA", "Misses", 1.0),
            ],
        )
        .expect("statistics");

        assert_eq!(stats.instance_name, "orders");
        assert_eq!(stats.counters, vec![Counter::new("Gets", 30.0), Counter::new("Misses", 1.0)]);
        assert_eq!(stats.counters_by_host["hostA"].len(), 2);
        assert_eq!(stats.counters_by_host["hostB"], vec![Counter::new("Gets", 20.0)]);
        assert!(group_cache_samples("orders", &[]).is_none());
    }

    #[tokio::test]
    async fn host_batch_drops_failed_and_empty_hosts() {
        let cluster = FakeCluster {
            host_samples: vec![sample("cache01", "Total Object Count", 5.0)],
            ..Default::default()
        };

        let stats = host_statistics_batch(
            &cluster,
            &[
                HostEndpoint::new("cache01", DEFAULT_CACHE_PORT),
                HostEndpoint::new("broken", DEFAULT_CACHE_PORT),
                HostEndpoint::new("idle", DEFAULT_CACHE_PORT),
            ],
        )
        .await;

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].instance_name, "cache01");
    }

    #[tokio::test]
    async fn cache_statistics_sample_every_live_host() {
        let cluster = FakeCluster {
            hosts: vec![host("hostA", CacheServiceStatus::Up)],
            cache_samples: vec![sample("hostA", "Gets", 4.0), sample("hostB", "Gets", 6.0)],
            ..Default::default()
        };

        let stats = cache_statistics_batch(&cluster, &cluster, &["orders".to_string()]).await;

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].counters, vec![Counter::new("Gets", 4.0)]);
    }
}
