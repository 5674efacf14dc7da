//! Aggregate threshold accumulator: absorbs completed per-sweep record sets
//! between repeats and computes summary threshold estimates. Persisting the
//! report is the caller's job; this only produces a serializable snapshot.

use serde::Serialize;
use tracing::{debug, warn};

use crate::trial::sweep::TrialRecord;

#[derive(Clone, Debug, Serialize)]
pub struct RecordSet {
    pub key: f32,
    pub records: Vec<TrialRecord>,
}

/// Per-sweep threshold estimate: the deepest successfully tracked sample.
#[derive(Clone, Debug, Serialize)]
pub struct SweepSummary {
    pub key: f32,
    pub successes: usize,
    pub failures: usize,
    pub threshold_spatial_freq: f32,
    pub threshold_contrast: f32,
}

#[derive(Debug, Default, Serialize)]
pub struct ThresholdAggregate {
    sets: Vec<RecordSet>,
}

impl ThresholdAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one sweep's records. Empty sets are skipped with a diagnostic;
    /// that is expected for sweeps that never left the backlog.
    pub fn absorb(&mut self, key: f32, records: Vec<TrialRecord>) {
        if records.is_empty() {
            debug!(target: "trial::aggregate", key, "no records for sweep; skipping");
            return;
        }
        if let Some(set) = self.sets.iter_mut().find(|s| s.key == key) {
            set.records.extend(records);
        } else {
            self.sets.push(RecordSet { key, records });
        }
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn record_count(&self) -> usize {
        self.sets.iter().map(|s| s.records.len()).sum()
    }

    pub fn sets(&self) -> &[RecordSet] {
        &self.sets
    }

    /// Per-sweep threshold estimates. Sweeps without a single success are
    /// skipped with a diagnostic; failing to fit anything at all is an
    /// error the caller reports and moves past. Raw records are never
    /// touched either way.
    pub fn summarize(&self) -> Result<Vec<SweepSummary>, String> {
        if self.sets.is_empty() {
            return Err("no sweep data collected".to_string());
        }
        let mut summaries = Vec::new();
        for set in &self.sets {
            let successes = set.records.iter().filter(|r| r.success).count();
            let failures = set.records.len() - successes;
            let Some(deepest) = set.records.iter().filter(|r| r.success).next_back() else {
                warn!(
                    target: "trial::aggregate",
                    key = set.key,
                    "no successful samples; skipping threshold fit"
                );
                continue;
            };
            summaries.push(SweepSummary {
                key: set.key,
                successes,
                failures,
                threshold_spatial_freq: deepest.spatial_freq,
                threshold_contrast: deepest.contrast,
            });
        }
        if summaries.is_empty() {
            return Err("insufficient data to fit any threshold".to_string());
        }
        Ok(summaries)
    }

    /// Serializable report snapshot (summaries plus raw sets).
    pub fn report_json(&self) -> Result<serde_json::Value, String> {
        let summaries = self.summarize()?;
        serde_json::to_value(serde_json::json!({
            "summaries": summaries,
            "sweeps": self.sets,
        }))
        .map_err(|e| format!("serialize report: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: bool, sf: f32, c: f32) -> TrialRecord {
        TrialRecord {
            success,
            duration_sec: 1.0,
            spatial_freq: sf,
            contrast: c,
        }
    }

    #[test]
    fn empty_sets_are_skipped() {
        let mut agg = ThresholdAggregate::new();
        agg.absorb(45.0, Vec::new());
        assert_eq!(agg.set_count(), 0);
    }

    #[test]
    fn threshold_is_deepest_success() {
        let mut agg = ThresholdAggregate::new();
        agg.absorb(
            90.0,
            vec![
                record(true, 4.0, 0.5),
                record(true, 4.0, 0.2),
                record(false, 4.0, 0.08),
            ],
        );
        let summaries = agg.summarize().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].successes, 2);
        assert_eq!(summaries[0].failures, 1);
        assert!((summaries[0].threshold_contrast - 0.2).abs() < 1e-6);
    }

    #[test]
    fn summarize_fails_without_any_success() {
        let mut agg = ThresholdAggregate::new();
        assert!(agg.summarize().is_err());
        agg.absorb(90.0, vec![record(false, 4.0, 0.5)]);
        assert!(agg.summarize().is_err());
        // Raw records survive the failed fit.
        assert_eq!(agg.record_count(), 1);
    }

    #[test]
    fn absorb_merges_same_key_across_repeats() {
        let mut agg = ThresholdAggregate::new();
        agg.absorb(45.0, vec![record(true, 2.0, 0.4)]);
        agg.absorb(45.0, vec![record(false, 2.0, 0.2)]);
        assert_eq!(agg.set_count(), 1);
        assert_eq!(agg.record_count(), 2);
    }
}
