//! Backlog rotation through a fixed number of motor slots.
//!
//! The backlog is a stack: sweeps are loaded in order and popped from the
//! end. Slots refill at trial onset and whenever a sweep leaves its slot.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::config::SchedulerConfig;
use crate::trial::events::{EventBus, TrialEvent};
use crate::trial::sweep::Sweep;

#[derive(Debug)]
pub struct SweepSetScheduler {
    backlog: Vec<usize>,
    slots: Vec<Option<usize>>,
    fade_in_sec: f32,
}

impl SweepSetScheduler {
    pub fn new(cfg: &SchedulerConfig) -> Self {
        assert!(cfg.capacity > 0, "scheduler needs at least one slot");
        Self {
            backlog: Vec::new(),
            slots: vec![None; cfg.capacity],
            fade_in_sec: cfg.fade_in_sec,
        }
    }

    /// Load a fresh backlog in the given order (last entry pops first).
    pub fn load_backlog(&mut self, order: impl IntoIterator<Item = usize>) {
        self.backlog.clear();
        self.backlog.extend(order);
        debug!(target: "trial::sched", backlog = self.backlog.len(), "backlog loaded");
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// (slot, sweep index) pairs currently occupied.
    pub fn active_pairs(&self) -> Vec<(usize, usize)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, idx)| idx.map(|i| (slot, i)))
            .collect()
    }

    /// Pop from the backlog into free slots. A popped sweep that is already
    /// finished is a defensive anomaly: skipped with a diagnostic, never
    /// activated. Returns the indices of sweeps activated this call.
    pub fn refill(&mut self, sweeps: &mut [Sweep], bus: &mut EventBus) -> Vec<usize> {
        let mut activated = Vec::new();
        for slot in 0..self.slots.len() {
            if self.slots[slot].is_some() {
                continue;
            }
            while let Some(idx) = self.backlog.pop() {
                if sweeps[idx].is_finished() {
                    warn!(
                        target: "trial::sched",
                        key = sweeps[idx].key(),
                        "finished sweep reached the backlog; skipping"
                    );
                    continue;
                }
                sweeps[idx].activate(slot);
                self.slots[slot] = Some(idx);
                bus.emit(TrialEvent::SweepActivated {
                    key: sweeps[idx].key(),
                    slot,
                    fade_in_sec: self.fade_in_sec,
                });
                activated.push(idx);
                break;
            }
        }
        activated
    }

    /// Free slots whose sweeps are no longer active (finished or failed
    /// out). The freed slots refill on the next `refill` call.
    pub fn release_inactive(&mut self, sweeps: &[Sweep]) {
        for slot in self.slots.iter_mut() {
            if let Some(idx) = *slot {
                if !sweeps[idx].is_active() {
                    *slot = None;
                }
            }
        }
    }

    pub fn clear_slots(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    /// Repeat completes when nothing is queued and nothing is running.
    pub fn is_repeat_complete(&self) -> bool {
        self.backlog.is_empty() && self.slots.iter().all(|s| s.is_none())
    }
}

/// Permute sweep keys ahead of path generation so key-to-path binding for a
/// repeat is independent of prior repeats. Deterministic per (seed, repeat).
pub fn shuffle_keys(keys: &mut [f32], seed: u64, repeat: u32) {
    let mut rng = SmallRng::seed_from_u64(seed ^ (repeat as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    keys.shuffle(&mut rng);
}

#[cfg(test)]
mod tests {
    use super::shuffle_keys;

    #[test]
    fn shuffle_is_deterministic_per_repeat() {
        let base = [15.0f32, 45.0, 75.0, 105.0, 135.0, 165.0];
        let mut a = base;
        let mut b = base;
        shuffle_keys(&mut a, 7, 1);
        shuffle_keys(&mut b, 7, 1);
        assert_eq!(a, b);

        let mut c = base;
        shuffle_keys(&mut c, 7, 2);
        assert_ne!(a, c, "different repeat should permute differently");

        let mut sorted = a;
        sorted.sort_by(f32::total_cmp);
        assert_eq!(sorted, base, "shuffle must preserve the key set");
    }
}
