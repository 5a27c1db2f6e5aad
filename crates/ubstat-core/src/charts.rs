//! Registry of declared chart series.
//!
//! Series are discovered from the keys a service actually reports, so the
//! set grows whenever a new thread or an optional statistics group shows up.
//! Nothing is ever removed: downstream consumers see a stable chart layout
//! for the lifetime of the process.
//!
//! Each series carries the metadata the reconciler needs (counter or gauge)
//! and the emission precision, so the counter/gauge decision is made once,
//! here, instead of at every call site.

use std::collections::BTreeMap;

/// How raw values of a series behave over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Monotonic since service start; reconciled into per-cycle deltas.
    Counter,
    /// Point-in-time value; always passed through.
    Gauge,
}

/// Metadata of one declared dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub id: String,
    /// Chart the dimension is drawn on.
    pub chart: String,
    pub family: String,
    pub units: &'static str,
    pub kind: SeriesKind,
    /// Applied before truncation to keep sub-unit precision.
    pub multiplier: i64,
}

/// A chart and the dimensions declared on it, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub id: String,
    pub family: String,
    pub units: &'static str,
    pub dimensions: Vec<String>,
}

/// Append-only set of charts and their series.
#[derive(Debug, Clone, Default)]
pub struct ChartSet {
    charts: BTreeMap<String, Chart>,
    series: BTreeMap<String, Series>,
}

impl ChartSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `dimension` if unseen. Returns true if it was newly added.
    pub fn ensure(&mut self, dimension: &str) -> bool {
        if self.series.contains_key(dimension) {
            return false;
        }

        let series = describe(dimension);
        self.charts
            .entry(series.chart.clone())
            .or_insert_with(|| Chart {
                id: series.chart.clone(),
                family: series.family.clone(),
                units: series.units,
                dimensions: Vec::new(),
            })
            .dimensions
            .push(series.id.clone());
        self.series.insert(series.id.clone(), series);
        true
    }

    pub fn contains(&self, dimension: &str) -> bool {
        self.series.contains_key(dimension)
    }

    pub fn series(&self, dimension: &str) -> Option<&Series> {
        self.series.get(dimension)
    }

    /// Kind of a dimension; undeclared dimensions are treated as gauges.
    pub fn kind_of(&self, dimension: &str) -> SeriesKind {
        self.series
            .get(dimension)
            .map(|s| s.kind)
            .unwrap_or(SeriesKind::Gauge)
    }

    /// Precision multiplier of a dimension; 1 if undeclared.
    pub fn multiplier_of(&self, dimension: &str) -> i64 {
        self.series.get(dimension).map(|s| s.multiplier).unwrap_or(1)
    }

    pub fn chart(&self, id: &str) -> Option<&Chart> {
        self.charts.get(id)
    }

    pub fn charts(&self) -> impl Iterator<Item = &Chart> {
        self.charts.values()
    }

    /// Number of declared series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Infers series metadata from a raw statistics key.
pub fn describe(dimension: &str) -> Series {
    let (scope, metric) = split_scope(dimension);

    let (chart, family) = match scope {
        Some(scope) if scope.starts_with("thread") => (scope.to_string(), "threads".to_string()),
        Some(scope) => (scope.to_string(), scope.to_string()),
        None if dimension == "time.up" => ("uptime".to_string(), "uptime".to_string()),
        None if dimension.starts_with("time.") => ("time".to_string(), "uptime".to_string()),
        None if dimension.starts_with("histogram.") => {
            ("histogram".to_string(), "histogram".to_string())
        }
        None if is_extended(dimension) => (extended_chart(dimension), "extended".to_string()),
        None => {
            let first = dimension.split('.').next().unwrap_or(dimension);
            (first.to_string(), first.to_string())
        }
    };

    let kind = if is_gauge(dimension, metric) {
        SeriesKind::Gauge
    } else {
        SeriesKind::Counter
    };

    Series {
        id: dimension.to_string(),
        chart,
        family,
        units: units_of(dimension, metric),
        kind,
        multiplier: multiplier_of(dimension, metric),
    }
}

/// Splits `thread<N>.` / `total.` prefixes off a key.
fn split_scope(dimension: &str) -> (Option<&str>, &str) {
    if let Some((scope, rest)) = dimension.split_once('.') {
        let is_thread = scope
            .strip_prefix("thread")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        if is_thread || scope == "total" {
            return (Some(scope), rest);
        }
    }
    (None, dimension)
}

fn is_extended(dimension: &str) -> bool {
    dimension.starts_with("mem.")
        || dimension.starts_with("num.")
        || dimension.starts_with("unwanted.")
        || dimension.ends_with(".cache.count")
}

fn extended_chart(dimension: &str) -> String {
    if dimension.ends_with(".cache.count") {
        return "cache.count".to_string();
    }
    match dimension.rsplit_once('.') {
        Some((parent, _)) => parent.to_string(),
        None => dimension.to_string(),
    }
}

fn is_gauge(dimension: &str, metric: &str) -> bool {
    dimension.starts_with("mem.")
        || dimension.starts_with("time.")
        || dimension.ends_with(".cache.count")
        || matches!(
            metric,
            "requestlist.avg"
                | "requestlist.max"
                | "recursion.time.avg"
                | "recursion.time.median"
                | "tcpusage"
        )
        || metric.starts_with("requestlist.current.")
}

fn units_of(dimension: &str, metric: &str) -> &'static str {
    if dimension.starts_with("mem.") {
        "bytes"
    } else if dimension.starts_with("time.") {
        "seconds"
    } else if metric.starts_with("recursion.time.") {
        "milliseconds"
    } else if dimension.ends_with(".cache.count") {
        "items"
    } else if metric == "tcpusage" {
        "buffers"
    } else {
        "queries"
    }
}

fn multiplier_of(dimension: &str, metric: &str) -> i64 {
    match (dimension, metric) {
        ("time.up", _) => 1,
        (d, _) if d.starts_with("time.") => 1000,
        (_, "recursion.time.avg" | "recursion.time.median" | "requestlist.avg") => 1000,
        _ => 1,
    }
}
