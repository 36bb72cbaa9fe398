//! Statistics and health subscribers built on the poller

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::console::charts::{StatisticsCharts, StatisticsSnapshot};
use crate::console::client::ConsoleError;
use crate::console::poller::{PollFetch, PollState, Poller, Subscription};
use crate::domain::models::{
    CacheHost, CacheHostHealth, CacheStatistics, ClusterHealth, NamedCache, Statistics,
    UnallocatedNamedCache,
};

/// Remote reporting operations the monitors depend on.
#[async_trait]
pub trait ClusterReporting: Send + Sync {
    async fn cluster_health(&self) -> Result<ClusterHealth, ConsoleError>;
    async fn cache_hosts(&self) -> Result<Vec<CacheHost>, ConsoleError>;
    async fn named_caches(&self) -> Result<Vec<NamedCache>, ConsoleError>;
    /// An empty list asks for every host.
    async fn host_statistics(&self, hosts: &[String]) -> Result<Vec<Statistics>, ConsoleError>;
    /// An empty list asks for every named cache.
    async fn cache_statistics(&self, caches: &[String])
        -> Result<Vec<CacheStatistics>, ConsoleError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTarget {
    Cluster,
    Host(String),
    Cache(String),
}

impl PollTarget {
    pub fn label(&self) -> String {
        match self {
            Self::Cluster => "cluster".to_string(),
            Self::Host(host) => format!("host {host}"),
            Self::Cache(cache) => format!("cache {cache}"),
        }
    }
}

pub struct StatisticsFetch {
    reporting: Arc<dyn ClusterReporting>,
    target: PollTarget,
}

impl StatisticsFetch {
    pub fn new(reporting: Arc<dyn ClusterReporting>, target: PollTarget) -> Self {
        Self { reporting, target }
    }
}

#[async_trait]
impl PollFetch for StatisticsFetch {
    type Output = StatisticsSnapshot;

    async fn fetch(&self) -> Result<StatisticsSnapshot, ConsoleError> {
        let snapshot = match &self.target {
            PollTarget::Cluster => StatisticsSnapshot {
                hosts: self.reporting.host_statistics(&[]).await?,
                caches: self.reporting.cache_statistics(&[]).await?,
            },
            PollTarget::Host(host) => StatisticsSnapshot {
                hosts: self
                    .reporting
                    .host_statistics(std::slice::from_ref(host))
                    .await?,
                caches: Vec::new(),
            },
            PollTarget::Cache(cache) => StatisticsSnapshot {
                hosts: Vec::new(),
                caches: self
                    .reporting
                    .cache_statistics(std::slice::from_ref(cache))
                    .await?,
            },
        };
        Ok(snapshot)
    }
}

pub struct HealthFetch {
    reporting: Arc<dyn ClusterReporting>,
}

impl HealthFetch {
    pub fn new(reporting: Arc<dyn ClusterReporting>) -> Self {
        Self { reporting }
    }
}

#[async_trait]
impl PollFetch for HealthFetch {
    type Output = ClusterHealth;

    async fn fetch(&self) -> Result<ClusterHealth, ConsoleError> {
        self.reporting.cluster_health().await
    }
}

/// Owns the charts of one polled entity; they change only while draining.
pub struct StatisticsMonitor {
    target: PollTarget,
    subscription: Subscription<StatisticsSnapshot>,
    charts: StatisticsCharts,
    polls: usize,
}

impl StatisticsMonitor {
    pub fn start(
        reporting: Arc<dyn ClusterReporting>,
        target: PollTarget,
        interval: Duration,
        shutdown: &CancellationToken,
    ) -> Self {
        let subscription = Poller::new(StatisticsFetch::new(reporting, target.clone()))
            .with_interval(interval)
            .with_label(target.label())
            .with_cancellation(shutdown)
            .start();

        Self {
            target,
            subscription,
            charts: StatisticsCharts::default(),
            polls: 0,
        }
    }

    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    pub fn charts(&self) -> &StatisticsCharts {
        &self.charts
    }

    /// Successful polls applied so far.
    pub fn polls(&self) -> usize {
        self.polls
    }

    fn apply(&mut self, snapshot: &StatisticsSnapshot, received_at: DateTime<Utc>) {
        if snapshot.is_empty() {
            debug!(target_entity = %self.target.label(), "statistics poll returned no counters");
        }
        self.charts.apply(snapshot, received_at);
        self.polls += 1;
    }

    /// Waits for the next successful poll; `false` once stopped.
    pub async fn next_update(&mut self) -> bool {
        match self.subscription.recv().await {
            Some(delivery) => {
                self.apply(&delivery.value, delivery.received_at);
                true
            }
            None => false,
        }
    }

    /// Applies whatever already arrived without waiting.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Some(delivery) = self.subscription.try_recv() {
            self.apply(&delivery.value, delivery.received_at);
            applied += 1;
        }
        applied
    }

    pub fn poll_now(&self) {
        self.subscription.poll_now();
    }

    pub fn stop(&self) {
        self.subscription.stop();
    }

    pub fn state(&self) -> PollState {
        self.subscription.state()
    }
}

pub struct HealthMonitor {
    subscription: Subscription<ClusterHealth>,
    hosts: Vec<CacheHostHealth>,
    unallocated: Vec<UnallocatedNamedCache>,
    updated_at: Option<DateTime<Utc>>,
}

impl HealthMonitor {
    pub fn start(
        reporting: Arc<dyn ClusterReporting>,
        interval: Duration,
        shutdown: &CancellationToken,
    ) -> Self {
        let subscription = Poller::new(HealthFetch::new(reporting))
            .with_interval(interval)
            .with_label("cluster health")
            .with_cancellation(shutdown)
            .start();

        Self {
            subscription,
            hosts: Vec::new(),
            unallocated: Vec::new(),
            updated_at: None,
        }
    }

    pub fn hosts(&self) -> &[CacheHostHealth] {
        &self.hosts
    }

    pub fn unallocated_named_caches(&self) -> &[UnallocatedNamedCache] {
        &self.unallocated
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub async fn next_update(&mut self) -> bool {
        match self.subscription.recv().await {
            Some(delivery) => {
                self.hosts = delivery.value.hosts;
                self.unallocated = delivery.value.unallocated_named_caches;
                self.updated_at = Some(delivery.received_at);
                true
            }
            None => false,
        }
    }

    pub fn poll_now(&self) {
        self.subscription.poll_now();
    }

    pub fn stop(&self) {
        self.subscription.stop();
    }

    pub fn state(&self) -> PollState {
        self.subscription.state()
    }
}
