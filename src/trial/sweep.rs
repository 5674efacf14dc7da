//! One probe's progress along its path: evidence, advancement, records.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EvidenceConfig;
use crate::core::evidence::EvidenceAccumulator;
use crate::core::sweep_space::PathPoint;
use crate::gaze::GazeSource;
use crate::trial::ghost::GhostAssist;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepState {
    Pending,
    Active,
    /// Terminal within a repeat: either the path was exhausted or the trial
    /// gate closed while the sweep was active.
    Finished,
}

/// One sampled outcome, success or failure, at a path point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialRecord {
    pub success: bool,
    /// Seconds since trial start.
    pub duration_sec: f32,
    pub spatial_freq: f32,
    pub contrast: f32,
}

/// Per-frame inputs to the evidence update, assembled by the engine.
pub struct SweepFrame<'a> {
    pub dt: f32,
    /// Absolute time.
    pub t: f32,
    /// Seconds since trial start.
    pub trial_elapsed: f32,
    pub gaze: &'a dyn GazeSource,
    /// Eye inside screen bounds this frame.
    pub on_screen: bool,
    /// Gaze target handle for this sweep.
    pub target: usize,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SweepTickOutcome {
    /// Point recorded by an advancement this frame, if any.
    pub advanced: Option<PathPoint>,
    pub finished: bool,
}

#[derive(Debug)]
pub struct Sweep {
    key: f32,
    path: Vec<PathPoint>,
    current_index: usize,
    pub evidence: EvidenceAccumulator,
    push: f32,
    state: SweepState,
    trackable: bool,
    motor_slot: Option<usize>,
    pub ghost: Option<GhostAssist>,
    records: Vec<TrialRecord>,
    success_count: u32,
}

impl Sweep {
    pub fn new(key: f32, path: Vec<PathPoint>, cfg: &EvidenceConfig, trackable: bool) -> Self {
        Self {
            key,
            path,
            current_index: 0,
            evidence: EvidenceAccumulator::new(cfg.start, cfg.min, cfg.max),
            push: 0.0,
            state: SweepState::Pending,
            trackable,
            motor_slot: None,
            ghost: None,
            records: Vec::new(),
            success_count: 0,
        }
    }

    #[inline]
    pub fn key(&self) -> f32 {
        self.key
    }

    #[inline]
    pub fn state(&self) -> SweepState {
        self.state
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == SweepState::Finished
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == SweepState::Active
    }

    #[inline]
    pub fn trackable(&self) -> bool {
        self.trackable
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[inline]
    pub fn path_len(&self) -> usize {
        self.path.len()
    }

    pub fn current_point(&self) -> Option<PathPoint> {
        self.path.get(self.current_index).copied()
    }

    #[inline]
    pub fn motor_slot(&self) -> Option<usize> {
        self.motor_slot
    }

    #[inline]
    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    #[inline]
    pub fn push_value(&self) -> f32 {
        self.push
    }

    pub fn add_push(&mut self, amount: f32) {
        if amount.is_finite() && amount > 0.0 {
            self.push += amount;
        }
    }

    /// Take one whole unit of push credit. Caller converts it into a
    /// synthetic advancement.
    pub fn consume_push_unit(&mut self) -> bool {
        if self.push > 1.0 {
            self.push -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<TrialRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn activate(&mut self, slot: usize) {
        debug_assert!(self.state == SweepState::Pending, "activating non-pending sweep");
        self.state = SweepState::Active;
        self.motor_slot = Some(slot);
    }

    /// Return a persisted sweep to the backlog pool for the next repeat.
    /// Progress and evidence are retained; only tenure state resets.
    pub fn reset_for_repeat(&mut self) {
        self.state = SweepState::Pending;
        self.motor_slot = None;
        self.ghost = None;
        self.push = 0.0;
    }

    /// Failure path: the trial gate closed while this sweep was active.
    /// Records a failure at the current point and ends the sweep's tenure.
    pub fn deactivate(&mut self, trial_elapsed: f32) {
        debug_assert!(self.state == SweepState::Active);
        if let Some(point) = self.current_point() {
            self.records.push(TrialRecord {
                success: false,
                duration_sec: trial_elapsed,
                spatial_freq: point.spatial_freq,
                contrast: point.contrast,
            });
        } else {
            debug!(target: "trial::sweep", key = self.key, "deactivated with no point to record");
        }
        self.state = SweepState::Finished;
        self.motor_slot = None;
        self.ghost = None;
    }

    /// One advancement: success record at the current point, evidence back
    /// to zero, index forward. Identical for real and pushed successes.
    /// Returns the recorded point.
    pub fn advance(&mut self, trial_elapsed: f32) -> Option<PathPoint> {
        let point = self.current_point()?;
        self.records.push(TrialRecord {
            success: true,
            duration_sec: trial_elapsed,
            spatial_freq: point.spatial_freq,
            contrast: point.contrast,
        });
        self.success_count += 1;
        self.evidence.reset(0.0);
        self.current_index += 1;
        if self.current_index >= self.path.len() {
            self.state = SweepState::Finished;
            self.motor_slot = None;
            self.ghost = None;
            info!(target: "trial::sweep", key = self.key, samples = self.path.len(), "path exhausted");
        }
        Some(point)
    }

    /// Per-frame evidence update for an active, trackable sweep. Tracking
    /// gains couple into `gate_evidence`; off-screen loss stays local so one
    /// neglected sweep cannot collapse an otherwise-successful trial.
    pub fn tick_evidence(
        &mut self,
        ctx: &SweepFrame,
        gate_evidence: &mut EvidenceAccumulator,
        cfg: &EvidenceConfig,
    ) -> SweepTickOutcome {
        let mut out = SweepTickOutcome::default();
        if self.state != SweepState::Active || !self.trackable {
            return out;
        }

        let suppressed = self
            .ghost
            .as_ref()
            .map_or(false, |g| g.suppresses_gain(ctx.t));

        if ctx.gaze.is_position_tracking(ctx.target) {
            let trajectory = ctx.gaze.is_trajectory_tracking(ctx.target);
            let saccade =
                cfg.allow_saccade_tracking && ctx.gaze.is_saccade_tracking(ctx.target);
            let rate = if trajectory || saccade {
                cfg.full_gain_per_sec
            } else {
                cfg.position_only_gain_per_sec
            };
            if !suppressed {
                let gain = rate * ctx.dt;
                self.evidence.apply_delta(gain);
                gate_evidence.apply_delta(gain);
            }
        } else if !ctx.on_screen {
            self.evidence.apply_delta(-cfg.off_screen_loss_per_sec * ctx.dt);
        }

        self.evidence.apply_delta(-cfg.automatic_loss_per_sec * ctx.dt);

        if self.evidence.value() >= cfg.success_threshold {
            out.advanced = self.advance(ctx.trial_elapsed);
            out.finished = self.is_finished();
        }
        out
    }
}
