//! Reconciliation of cumulative counters into per-cycle values.
//!
//! The resolver reports counters as totals since it started. In delta mode
//! the reconciler subtracts the previous cycle's reading; in cumulative mode
//! it passes totals through. Gauges are passed through in both modes.
//!
//! A counter that goes backwards is taken as a service restart and the raw
//! current value is emitted. A genuine wraparound looks the same and is
//! handled the same way.

use std::collections::BTreeMap;

use crate::charts::{ChartSet, SeriesKind};
use crate::snapshot::Snapshot;

/// Public output of one poll cycle.
pub type EmittedMetrics = BTreeMap<String, i64>;

/// How counter series are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Life-of-service totals.
    Cumulative,
    /// Increase since the previous cycle.
    Delta,
}

impl ReconcileMode {
    pub fn from_cumulative(cumulative: bool) -> Self {
        if cumulative {
            ReconcileMode::Cumulative
        } else {
            ReconcileMode::Delta
        }
    }
}

/// Compute f64 delta, returning `None` on counter regression (stats reset).
pub fn df64(curr: f64, prev: f64) -> Option<f64> {
    (curr >= prev).then_some(curr - prev)
}

/// Holds the previous and current snapshots of one collector instance.
#[derive(Debug)]
pub struct CounterReconciler {
    mode: ReconcileMode,
    previous: Snapshot,
    current: Snapshot,
}

impl CounterReconciler {
    pub fn new(mode: ReconcileMode) -> Self {
        Self {
            mode,
            previous: Snapshot::new(),
            current: Snapshot::new(),
        }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Snapshot the next cycle will be reconciled against.
    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    /// Produces the emitted mapping for `raw` and promotes it to previous.
    ///
    /// Counter/gauge classification and precision come from `charts`;
    /// dimensions must be declared there before reconciling.
    pub fn reconcile(&mut self, raw: Snapshot, charts: &ChartSet) -> EmittedMetrics {
        self.current = raw;

        let mut emitted = EmittedMetrics::new();
        for (key, &value) in &self.current {
            let value = match (self.mode, charts.kind_of(key)) {
                (ReconcileMode::Delta, SeriesKind::Counter) => self
                    .previous
                    .get(key)
                    .and_then(|prev| df64(value, prev))
                    .unwrap_or(value),
                _ => value,
            };
            emitted.insert(key.clone(), quantize(value, charts.multiplier_of(key)));
        }

        self.promote();
        emitted
    }

    /// Ends a cycle that produced no snapshot.
    ///
    /// The empty current snapshot is still promoted so the next cycle starts
    /// from raw values instead of a delta across the gap.
    pub fn skip(&mut self) {
        self.current = Snapshot::new();
        self.promote();
    }

    fn promote(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }
}

/// Scales and truncates toward zero; out-of-range values saturate.
fn quantize(value: f64, multiplier: i64) -> i64 {
    (value * multiplier as f64) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pairs: &[(&str, f64)]) -> Snapshot {
        pairs.iter().map(|&(k, v)| (k, v)).collect()
    }

    fn declared(keys: &[&str]) -> ChartSet {
        let mut charts = ChartSet::new();
        for key in keys {
            charts.ensure(key);
        }
        charts
    }

    #[test]
    fn df64_handles_regression() {
        assert_eq!(df64(135.0, 100.0), Some(35.0));
        assert_eq!(df64(100.0, 100.0), Some(0.0));
        assert_eq!(df64(10.0, 100.0), None);
    }

    #[test]
    fn delta_mode_subtracts_previous() {
        let charts = declared(&["total.num.cachemiss"]);
        let mut r = CounterReconciler::new(ReconcileMode::Delta);

        let first = r.reconcile(snap(&[("total.num.cachemiss", 100.0)]), &charts);
        assert_eq!(first["total.num.cachemiss"], 100);

        let second = r.reconcile(snap(&[("total.num.cachemiss", 135.0)]), &charts);
        assert_eq!(second["total.num.cachemiss"], 35);
    }

    #[test]
    fn delta_mode_restart_emits_raw_value() {
        let charts = declared(&["total.num.cachemiss"]);
        let mut r = CounterReconciler::new(ReconcileMode::Delta);

        r.reconcile(snap(&[("total.num.cachemiss", 100.0)]), &charts);
        let after_restart = r.reconcile(snap(&[("total.num.cachemiss", 10.0)]), &charts);
        assert_eq!(after_restart["total.num.cachemiss"], 10);
    }

    #[test]
    fn stable_input_yields_zero_delta() {
        let charts = declared(&["total.num.queries", "total.requestlist.avg"]);
        let mut r = CounterReconciler::new(ReconcileMode::Delta);
        let raw = snap(&[("total.num.queries", 500.0), ("total.requestlist.avg", 2.5)]);

        r.reconcile(raw.clone(), &charts);
        let second = r.reconcile(raw, &charts);
        assert_eq!(second["total.num.queries"], 0);
        // Gauges are not differenced.
        assert_eq!(second["total.requestlist.avg"], 2500);
    }

    #[test]
    fn deltas_are_never_negative() {
        let charts = declared(&["total.num.queries"]);
        let mut r = CounterReconciler::new(ReconcileMode::Delta);

        // Deterministic pseudo-random walk with occasional resets.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut prev: Option<f64> = None;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let value = (seed >> 40) as f64;

            let emitted = r.reconcile(snap(&[("total.num.queries", value)]), &charts);
            let got = emitted["total.num.queries"];
            assert!(got >= 0);
            match prev {
                Some(p) if value >= p => assert_eq!(got, (value - p) as i64),
                _ => assert_eq!(got, value as i64),
            }
            prev = Some(value);
        }
    }

    #[test]
    fn wraparound_is_indistinguishable_from_restart() {
        // A counter wrapping past its maximum looks like a restart; the raw
        // post-wrap value is emitted rather than the true increase.
        let charts = declared(&["total.num.queries"]);
        let mut r = CounterReconciler::new(ReconcileMode::Delta);

        r.reconcile(snap(&[("total.num.queries", 4_294_967_290.0)]), &charts);
        let wrapped = r.reconcile(snap(&[("total.num.queries", 5.0)]), &charts);
        assert_eq!(wrapped["total.num.queries"], 5);
    }

    #[test]
    fn cumulative_mode_passes_counters_through() {
        let charts = declared(&["total.num.queries"]);
        let mut r = CounterReconciler::new(ReconcileMode::Cumulative);

        r.reconcile(snap(&[("total.num.queries", 100.0)]), &charts);
        let second = r.reconcile(snap(&[("total.num.queries", 135.0)]), &charts);
        assert_eq!(second["total.num.queries"], 135);
    }

    #[test]
    fn gauges_pass_through_in_delta_mode() {
        let charts = declared(&["mem.cache.rrset", "time.up"]);
        let mut r = CounterReconciler::new(ReconcileMode::Delta);

        r.reconcile(snap(&[("mem.cache.rrset", 4096.0), ("time.up", 10.9)]), &charts);
        let second = r.reconcile(snap(&[("mem.cache.rrset", 1024.0), ("time.up", 20.9)]), &charts);
        assert_eq!(second["mem.cache.rrset"], 1024);
        assert_eq!(second["time.up"], 20);
    }

    #[test]
    fn new_key_mid_run_emits_raw_value() {
        let charts = declared(&["thread0.num.queries", "thread1.num.queries"]);
        let mut r = CounterReconciler::new(ReconcileMode::Delta);

        r.reconcile(snap(&[("thread0.num.queries", 10.0)]), &charts);
        let second = r.reconcile(
            snap(&[("thread0.num.queries", 15.0), ("thread1.num.queries", 7.0)]),
            &charts,
        );
        assert_eq!(second["thread0.num.queries"], 5);
        assert_eq!(second["thread1.num.queries"], 7);
    }

    #[test]
    fn skip_promotes_empty_snapshot() {
        let charts = declared(&["total.num.queries"]);
        let mut r = CounterReconciler::new(ReconcileMode::Delta);

        r.reconcile(snap(&[("total.num.queries", 100.0)]), &charts);
        r.skip();
        assert!(r.previous().is_empty());

        let after_gap = r.reconcile(snap(&[("total.num.queries", 150.0)]), &charts);
        assert_eq!(after_gap["total.num.queries"], 150);
    }

    #[test]
    fn previous_is_promoted_after_reconcile() {
        let charts = declared(&["total.num.queries"]);
        let mut r = CounterReconciler::new(ReconcileMode::Delta);
        r.reconcile(snap(&[("total.num.queries", 42.0)]), &charts);
        assert_eq!(r.previous().get("total.num.queries"), Some(42.0));
    }

    #[test]
    fn quantize_truncates() {
        assert_eq!(quantize(0.013874, 1000), 13);
        assert_eq!(quantize(7.99, 1), 7);
        assert_eq!(quantize(-1.5, 1), -1);
        assert_eq!(quantize(f64::MAX, 1), i64::MAX);
    }

    #[test]
    fn mode_from_flag() {
        assert_eq!(ReconcileMode::from_cumulative(true), ReconcileMode::Cumulative);
        assert_eq!(ReconcileMode::from_cumulative(false), ReconcileMode::Delta);
    }
}
