//! Trial-level evidence gate: the movement-independent accumulator that
//! decides when a trial ends.

use tracing::debug;

use crate::config::GateConfig;
use crate::core::evidence::EvidenceAccumulator;

/// Why a trial ended. Checks are priority-ordered and mutually exclusive:
/// a configured manual event suppresses the duration and threshold checks
/// entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    Manual,
    Duration,
    EvidenceExhausted,
}

#[derive(Debug)]
pub struct TrialEvidenceGate {
    evidence: EvidenceAccumulator,
    manual_event: Option<String>,
    manual_raised: bool,
    end_threshold: f32,
    decay_per_sec: f32,
    off_screen_loss_per_sec: f32,
    saccade_loss_weight: f32,
    radius_tolerance: f32,
    max_duration: f32,
    start_time: f32,
}

impl TrialEvidenceGate {
    pub fn new(cfg: &GateConfig, start_time: f32) -> Self {
        Self {
            evidence: EvidenceAccumulator::new(cfg.start, cfg.min, cfg.max),
            manual_event: cfg.manual_termination_event.clone(),
            manual_raised: false,
            end_threshold: cfg.end_threshold(),
            decay_per_sec: cfg.decay_per_sec,
            off_screen_loss_per_sec: cfg.off_screen_loss_per_sec,
            saccade_loss_weight: cfg.saccade_loss_weight,
            radius_tolerance: cfg.radius_tolerance,
            max_duration: cfg.max_duration_sec,
            start_time,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.evidence.value()
    }

    /// Sweep tracking gains couple into the gate through this handle.
    pub fn evidence_mut(&mut self) -> &mut EvidenceAccumulator {
        &mut self.evidence
    }

    #[inline]
    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    #[inline]
    pub fn radius_tolerance(&self) -> f32 {
        self.radius_tolerance
    }

    /// Raise the configured manual-termination event. Edge-triggered: one
    /// raise yields exactly one positive termination check.
    pub fn raise_event(&mut self, name: &str) -> bool {
        match &self.manual_event {
            Some(event) if event == name => {
                debug!(target: "trial::gate", event = name, "manual termination raised");
                self.manual_raised = true;
                true
            }
            _ => false,
        }
    }

    /// Movement-independent per-frame update: automatic decay, off-screen
    /// loss, and the end-of-saccade penalty when a saccade landed on no
    /// tracked stimulus (`saccade_miss` carries its amplitude).
    pub fn tick(&mut self, dt: f32, on_screen: bool, saccade_miss: Option<f32>) {
        let mut delta = -self.decay_per_sec * dt;
        if !on_screen {
            delta -= self.off_screen_loss_per_sec * dt;
        }
        if let Some(distance) = saccade_miss {
            delta -= distance * self.saccade_loss_weight;
        }
        self.evidence.apply_delta(delta);
    }

    /// Evaluate the priority-ordered termination rule. Consuming: the manual
    /// flag resets on read, so a second check without re-raising is negative.
    /// The engine discards the gate once this returns `Some`.
    pub fn check_end(&mut self, t: f32) -> Option<EndReason> {
        if self.manual_event.is_some() {
            return std::mem::take(&mut self.manual_raised).then_some(EndReason::Manual);
        }
        if self.max_duration > 0.0 && t - self.start_time >= self.max_duration {
            return Some(EndReason::Duration);
        }
        (self.evidence.value() <= self.end_threshold).then_some(EndReason::EvidenceExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;

    #[test]
    fn manual_mode_suppresses_threshold() {
        let cfg = GateConfig {
            manual_termination_event: Some("operator_stop".to_string()),
            start: -400.0,
            min: -500.0,
            ..Default::default()
        };
        let mut gate = TrialEvidenceGate::new(&cfg, 0.0);
        // Evidence already below default threshold, but manual mode rules.
        assert_eq!(gate.check_end(1.0), None);
        assert!(!gate.raise_event("wrong_name"));
        assert!(gate.raise_event("operator_stop"));
        assert_eq!(gate.check_end(2.0), Some(EndReason::Manual));
        assert_eq!(gate.check_end(3.0), None, "edge flag must auto-reset");
    }

    #[test]
    fn duration_limit() {
        let cfg = GateConfig {
            max_duration_sec: 10.0,
            ..Default::default()
        };
        let mut gate = TrialEvidenceGate::new(&cfg, 5.0);
        assert_eq!(gate.check_end(14.9), None);
        assert_eq!(gate.check_end(15.0), Some(EndReason::Duration));
    }

    #[test]
    fn saccade_miss_penalty_scales_with_amplitude() {
        let cfg = GateConfig {
            start: 0.0,
            max: 0.0,
            decay_per_sec: 0.0,
            saccade_loss_weight: 0.5,
            ..Default::default()
        };
        let mut gate = TrialEvidenceGate::new(&cfg, 0.0);
        gate.tick(0.016, true, Some(100.0));
        assert!((gate.value() + 50.0).abs() < 1e-3);
    }
}
