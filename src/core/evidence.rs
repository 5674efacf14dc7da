//! core/evidence.rs — Clamped evidence scalar.
//!
//! The floor is hard: `value` never drops below `min`. The ceiling is soft in
//! one direction only: a value may start above `max` (a grace buffer set at
//! trial onset) and decay toward it, but no update ever lifts it above
//! `max(max, value_before)`.

use tracing::debug;

/// Bounded scalar confidence score used per sweep and per trial.
#[derive(Clone, Copy, Debug)]
pub struct EvidenceAccumulator {
    value: f32,
    min: f32,
    max: f32,
    locked: bool,
}

impl EvidenceAccumulator {
    pub fn new(start: f32, min: f32, max: f32) -> Self {
        assert!(min <= max, "evidence bounds inverted: min={min} max={max}");
        let value = if start.is_finite() { start.max(min) } else { min };
        Self {
            value,
            min,
            max,
            locked: false,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn min(&self) -> f32 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Add `d` and clamp to `[min, max(max, value_before)]`.
    ///
    /// Non-finite deltas are dropped without touching state; a NaN gain is an
    /// upstream gaze-signal bug and must not move the score.
    pub fn apply_delta(&mut self, d: f32) {
        if self.locked {
            return;
        }
        if !d.is_finite() {
            debug!(target: "core::evidence", delta = d, "dropping non-finite delta");
            return;
        }
        let ceiling = self.max.max(self.value);
        self.value = (self.value + d).clamp(self.min, ceiling);
    }

    /// Set the value directly. The ceiling is computed against the new value,
    /// so a reset may legitimately land above the nominal maximum.
    pub fn reset(&mut self, v: f32) {
        if self.locked {
            return;
        }
        if !v.is_finite() {
            debug!(target: "core::evidence", value = v, "dropping non-finite reset");
            return;
        }
        let ceiling = self.max.max(v);
        self.value = v.clamp(self.min, ceiling);
    }

    /// Freeze the score. Mutations while locked are silently dropped.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

#[cfg(test)]
mod tests {
    use super::EvidenceAccumulator;

    #[test]
    fn floor_is_hard() {
        let mut acc = EvidenceAccumulator::new(0.0, -10.0, 5.0);
        acc.apply_delta(-100.0);
        assert_eq!(acc.value(), -10.0);
        acc.apply_delta(-1.0);
        assert_eq!(acc.value(), -10.0);
    }

    #[test]
    fn ceiling_blocks_gains_from_below() {
        let mut acc = EvidenceAccumulator::new(4.0, -10.0, 5.0);
        acc.apply_delta(100.0);
        assert_eq!(acc.value(), 5.0);
    }

    #[test]
    fn grace_buffer_decays_and_is_never_reinflated() {
        // Start above ceiling, decay toward it, then fail to climb back.
        let mut acc = EvidenceAccumulator::new(8.0, -10.0, 5.0);
        acc.apply_delta(-1.0);
        assert_eq!(acc.value(), 7.0);
        acc.apply_delta(1.0);
        assert_eq!(acc.value(), 7.0, "gain must not exceed value_before ceiling");
        acc.apply_delta(-3.0);
        assert_eq!(acc.value(), 4.0);
        acc.apply_delta(10.0);
        assert_eq!(acc.value(), 5.0, "back under nominal ceiling");
    }

    #[test]
    fn reset_may_sit_above_nominal_max() {
        let mut acc = EvidenceAccumulator::new(0.0, -10.0, 5.0);
        acc.reset(12.0);
        assert_eq!(acc.value(), 12.0);
        acc.reset(-20.0);
        assert_eq!(acc.value(), -10.0);
    }

    #[test]
    fn locked_drops_mutations() {
        let mut acc = EvidenceAccumulator::new(1.0, -10.0, 5.0);
        acc.lock();
        acc.apply_delta(2.0);
        acc.reset(3.0);
        assert_eq!(acc.value(), 1.0);
        acc.unlock();
        acc.apply_delta(2.0);
        assert_eq!(acc.value(), 3.0);
    }

    #[test]
    fn non_finite_inputs_are_dropped() {
        let mut acc = EvidenceAccumulator::new(1.0, -10.0, 5.0);
        acc.apply_delta(f32::NAN);
        acc.apply_delta(f32::INFINITY);
        acc.apply_delta(f32::NEG_INFINITY);
        acc.reset(f32::NAN);
        assert_eq!(acc.value(), 1.0);
    }
}
