//! Time-series chart models fed by statistics snapshots

use chrono::{DateTime, Utc};

use crate::domain::models::{CacheStatistics, Counter, Statistics, TOTAL_SERIES};

/// Maximum of a fresh chart before any value was seen.
pub const INITIAL_Y_AXIS_MAX: f64 = 1.0;
/// Headroom factor applied when a value outgrows the axis.
pub const Y_AXIS_HEADROOM: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
}

impl LineSeries {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            points: Vec::new(),
        }
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    /// Keeps points in timestamp order even if the wall clock steps back.
    fn push(&mut self, timestamp: DateTime<Utc>, value: f64) {
        let timestamp = match self.points.last() {
            Some(last) if last.timestamp > timestamp => last.timestamp,
            _ => timestamp,
        };
        self.points.push(DataPoint { timestamp, value });
    }
}

/// One chart per counter; one line per host or instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    pub title: String,
    pub y_axis_max: f64,
    pub series: Vec<LineSeries>,
}

impl ChartModel {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            y_axis_max: INITIAL_Y_AXIS_MAX,
            series: Vec::new(),
        }
    }

    pub fn series(&self, name: &str) -> Option<&LineSeries> {
        self.series
            .iter()
            .find(|series| series.name.eq_ignore_ascii_case(name))
    }

    pub fn add_point(&mut self, series_name: &str, timestamp: DateTime<Utc>, value: f64) {
        let index = match self
            .series
            .iter()
            .position(|series| series.name.eq_ignore_ascii_case(series_name))
        {
            Some(index) => index,
            None => {
                self.series.push(LineSeries::new(series_name));
                self.series.len() - 1
            }
        };
        self.series[index].push(timestamp, value);

        let grown = value * Y_AXIS_HEADROOM;
        if grown > self.y_axis_max {
            self.y_axis_max = grown;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSet {
    charts: Vec<ChartModel>,
}

impl ChartSet {
    pub fn charts(&self) -> &[ChartModel] {
        &self.charts
    }

    pub fn chart(&self, title: &str) -> Option<&ChartModel> {
        self.charts
            .iter()
            .find(|chart| chart.title.eq_ignore_ascii_case(title))
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    fn chart_mut(&mut self, title: &str) -> &mut ChartModel {
        let index = match self
            .charts
            .iter()
            .position(|chart| chart.title.eq_ignore_ascii_case(title))
        {
            Some(index) => index,
            None => {
                self.charts.push(ChartModel::new(title));
                self.charts.len() - 1
            }
        };
        &mut self.charts[index]
    }

    pub fn record(&mut self, series_name: &str, counters: &[Counter], timestamp: DateTime<Utc>) {
        for counter in counters {
            self.chart_mut(&counter.name)
                .add_point(series_name, timestamp, counter.value);
        }
    }

    /// Host or instance statistics: the instance name labels the line.
    pub fn apply_statistics(&mut self, statistics: &Statistics, timestamp: DateTime<Utc>) {
        self.record(&statistics.instance_name, &statistics.counters, timestamp);
    }

    /// Per-host lines first, then the cache totals as the `Total` line.
    pub fn apply_cache_statistics(&mut self, statistics: &CacheStatistics, timestamp: DateTime<Utc>) {
        for (host_name, counters) in &statistics.counters_by_host {
            self.record(host_name, counters, timestamp);
        }
        self.record(TOTAL_SERIES, &statistics.counters, timestamp);
    }
}

/// One poll's worth of counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsSnapshot {
    pub hosts: Vec<Statistics>,
    pub caches: Vec<CacheStatistics>,
}

impl StatisticsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.caches.is_empty()
    }
}

/// Host counters share one chart set; every named cache gets its own, since
/// caches reuse the same host names as line labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsCharts {
    pub hosts: ChartSet,
    pub caches: Vec<(String, ChartSet)>,
}

impl StatisticsCharts {
    pub fn cache(&self, cache_name: &str) -> Option<&ChartSet> {
        self.caches
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(cache_name))
            .map(|(_, charts)| charts)
    }

    fn cache_mut(&mut self, cache_name: &str) -> &mut ChartSet {
        let index = match self
            .caches
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(cache_name))
        {
            Some(index) => index,
            None => {
                self.caches.push((cache_name.to_string(), ChartSet::default()));
                self.caches.len() - 1
            }
        };
        &mut self.caches[index].1
    }

    pub fn apply(&mut self, snapshot: &StatisticsSnapshot, timestamp: DateTime<Utc>) {
        for statistics in &snapshot.hosts {
            self.hosts.apply_statistics(statistics, timestamp);
        }
        for statistics in &snapshot.caches {
            self.cache_mut(&statistics.instance_name)
                .apply_cache_statistics(statistics, timestamp);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0)
            .single()
            .expect("valid timestamp")
            + Duration::seconds(seconds)
    }

    fn gets(value: f64) -> Vec<Counter> {
        vec![Counter::new("Gets", value)]
    }

    fn orders(hosts: &[(&str, f64)], total: f64) -> CacheStatistics {
        CacheStatistics {
            instance_name: "orders".to_string(),
            counters: gets(total),
            counters_by_host: hosts
                .iter()
                .map(|(host, value)| (host.to_string(), gets(*value)))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn cache_statistics_become_host_and_total_series() {
        let mut charts = ChartSet::default();
        charts.apply_cache_statistics(&orders(&[("hostA", 10.0), ("hostB", 20.0)], 30.0), at(0));

        assert_eq!(charts.charts().len(), 1);
        let chart = charts.chart("Gets").expect("Gets chart");
        let lines = chart
            .series
            .iter()
            .map(|series| (series.name.as_str(), series.points.len(), series.points[0].value))
            .collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![("hostA", 1, 10.0), ("hostB", 1, 20.0), ("Total", 1, 30.0)]
        );
    }

    #[test]
    fn repeated_samples_append_in_time_order() {
        let mut charts = ChartSet::default();
        for poll in 0..5 {
            charts.record("hostA", &gets(poll as f64), at(poll * 10));
        }

        let series = charts
            .chart("gets")
            .and_then(|chart| chart.series("HOSTA"))
            .expect("series found case-insensitively");
        assert_eq!(series.points.len(), 5);
        assert!(series
            .points
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn clock_stepping_back_keeps_order() {
        let mut chart = ChartModel::new("Gets");
        chart.add_point("hostA", at(20), 1.0);
        chart.add_point("hostA", at(5), 2.0);

        let points = &chart.series("hostA").expect("series").points;
        assert_eq!(points[1].timestamp, at(20));
        assert_eq!(points[1].value, 2.0);
    }

    #[test]
    fn y_axis_grows_with_headroom_and_never_shrinks() {
        let mut chart = ChartModel::new("Gets");
        assert_eq!(chart.y_axis_max, INITIAL_Y_AXIS_MAX);

        let mut previous = chart.y_axis_max;
        let mut highest: f64 = 0.0;
        for (index, value) in [0.5, 40.0, 12.0, 100.0, 3.0].into_iter().enumerate() {
            chart.add_point("hostA", at(index as i64), value);
            highest = highest.max(value);
            assert!(chart.y_axis_max >= previous);
            assert!(chart.y_axis_max >= highest * Y_AXIS_HEADROOM);
            previous = chart.y_axis_max;
        }
        assert!((chart.y_axis_max - 110.0).abs() < 1e-9);
    }

    #[test]
    fn small_values_keep_initial_axis() {
        let mut chart = ChartModel::new("Gets");
        chart.add_point("hostA", at(0), 0.5);
        assert_eq!(chart.y_axis_max, INITIAL_Y_AXIS_MAX);
    }

    #[test]
    fn snapshot_keeps_host_and_cache_charts_apart() {
        let snapshot = StatisticsSnapshot {
            hosts: vec![Statistics {
                instance_name: "hostA".to_string(),
                counters: gets(7.0),
            }],
            caches: vec![orders(&[("hostA", 1.0)], 1.0)],
        };

        let mut charts = StatisticsCharts::default();
        charts.apply(&snapshot, at(0));
        charts.apply(&snapshot, at(10));

        let host_line = charts
            .hosts
            .chart("Gets")
            .and_then(|chart| chart.series("hostA"))
            .expect("host line");
        assert_eq!(host_line.points.len(), 2);
        assert!(host_line.points.iter().all(|point| point.value == 7.0));

        let cache = charts.cache("ORDERS").expect("cache charts");
        let cache_chart = cache.chart("Gets").expect("cache chart");
        assert_eq!(cache_chart.series.len(), 2);
        assert_eq!(cache_chart.series("Total").expect("total").points.len(), 2);
    }
}
