//! Cross-sweep push: a success nudges trailing neighbors toward automatic
//! success, decaying linearly with angular key distance.
//!
//! Real advancements broadcast credit immediately and are resolved in the
//! same frame's resolution pass. Pushes broadcast *by* synthetic
//! advancements are staged and merged after the pass, so cascades propagate
//! with exactly one frame of latency and iteration order cannot matter.

use crate::config::PushConfig;
use crate::trial::events::{EventBus, TrialEvent};
use crate::trial::sweep::Sweep;

#[derive(Debug)]
pub struct PushPropagator {
    max_push: f32,
    max_angle: f32,
    min_success_lead: u32,
    staged: Vec<(usize, f32)>,
}

impl PushPropagator {
    pub fn new(cfg: &PushConfig) -> Self {
        Self {
            max_push: cfg.max_push,
            max_angle: cfg.max_angle_deg,
            min_success_lead: cfg.min_success_lead,
            staged: Vec::new(),
        }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.max_push > 0.0 && self.max_angle > 0.0
    }

    fn credit_for(&self, advancer_key: f32, advancer_successes: u32, other: &Sweep) -> Option<f32> {
        if !other.is_active() {
            return None;
        }
        if advancer_successes < other.success_count() + self.min_success_lead {
            return None;
        }
        let weight = 1.0 - (advancer_key - other.key()).abs() / self.max_angle;
        (weight > 0.0).then(|| self.max_push * weight)
    }

    /// Broadcast from a real advancement: credit lands directly on trailing
    /// active sweeps and is eligible for this frame's resolution.
    pub fn broadcast(&mut self, sweeps: &mut [Sweep], advancer: usize) {
        if !self.enabled() {
            return;
        }
        let key = sweeps[advancer].key();
        let successes = sweeps[advancer].success_count();
        for (i, sweep) in sweeps.iter_mut().enumerate() {
            if i == advancer {
                continue;
            }
            if let Some(credit) = self.credit_for(key, successes, sweep) {
                sweep.add_push(credit);
            }
        }
    }

    /// Once-per-frame resolution: every whole unit of credit above 1 becomes
    /// one synthetic advancement. Secondary broadcasts are staged for the
    /// next frame.
    pub fn resolve(&mut self, sweeps: &mut [Sweep], trial_elapsed: f32, bus: &mut EventBus) {
        for i in 0..sweeps.len() {
            while sweeps[i].is_active() && sweeps[i].consume_push_unit() {
                let Some(point) = sweeps[i].advance(trial_elapsed) else {
                    break;
                };
                bus.emit(TrialEvent::Advancement {
                    key: sweeps[i].key(),
                    spatial_freq: point.spatial_freq,
                    contrast: point.contrast,
                });
                if self.enabled() {
                    let key = sweeps[i].key();
                    let successes = sweeps[i].success_count();
                    for (j, other) in sweeps.iter().enumerate() {
                        if j == i {
                            continue;
                        }
                        if let Some(credit) = self.credit_for(key, successes, other) {
                            self.staged.push((j, credit));
                        }
                    }
                }
                if sweeps[i].is_finished() {
                    bus.emit(TrialEvent::SweepFinished { key: sweeps[i].key() });
                }
            }
        }
        for (idx, credit) in self.staged.drain(..) {
            if sweeps[idx].is_active() {
                sweeps[idx].add_push(credit);
            }
        }
    }
}
