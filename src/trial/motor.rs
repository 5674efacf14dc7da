//! Fixed pool of movement generators. One motor per active slot; the pool
//! is owned by the engine for the lifetime of a trial and handed out by
//! slot index, never duplicated.

use crate::config::ScreenConfig;
use crate::gaze::Vec2;

/// A movement generator producing a stimulus position each frame. The
/// engine treats the trajectory as opaque.
pub trait Motor {
    fn tick(&mut self, dt: f32) -> Vec2;
    fn reset(&mut self);
}

/// Lissajous-style orbit around a fixed center.
#[derive(Debug)]
pub struct OrbitMotor {
    center: Vec2,
    radius: Vec2,
    rate_hz: Vec2,
    phase: f32,
    elapsed: f32,
}

impl OrbitMotor {
    pub fn new(center: Vec2, radius: Vec2, rate_hz: Vec2, phase: f32) -> Self {
        Self {
            center,
            radius,
            rate_hz,
            phase,
            elapsed: 0.0,
        }
    }
}

impl Motor for OrbitMotor {
    fn tick(&mut self, dt: f32) -> Vec2 {
        self.elapsed += dt;
        let tau = std::f32::consts::TAU;
        let x = self.center.x
            + self.radius.x * (tau * self.rate_hz.x * self.elapsed + self.phase).cos();
        let y = self.center.y
            + self.radius.y * (tau * self.rate_hz.y * self.elapsed + self.phase).sin();
        Vec2::new(x, y)
    }

    fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

pub struct MotorPool {
    motors: Vec<Box<dyn Motor>>,
    positions: Vec<Vec2>,
}

impl MotorPool {
    pub fn new(motors: Vec<Box<dyn Motor>>) -> Self {
        let positions = vec![Vec2::default(); motors.len()];
        Self { motors, positions }
    }

    /// Default pool: staggered orbits spread across the screen.
    pub fn orbits(capacity: usize, screen: &ScreenConfig) -> Self {
        let motors: Vec<Box<dyn Motor>> = (0..capacity)
            .map(|i| {
                let frac = (i as f32 + 0.5) / capacity as f32;
                let center = Vec2::new(screen.width * frac, screen.height * 0.5);
                let radius = Vec2::new(screen.width * 0.12, screen.height * 0.25);
                let rate = Vec2::new(0.11 + 0.02 * i as f32, 0.07 + 0.03 * i as f32);
                Box::new(OrbitMotor::new(center, radius, rate, frac * std::f32::consts::PI))
                    as Box<dyn Motor>
            })
            .collect();
        Self::new(motors)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.motors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }

    pub fn tick_all(&mut self, dt: f32) {
        for (motor, pos) in self.motors.iter_mut().zip(self.positions.iter_mut()) {
            *pos = motor.tick(dt);
        }
    }

    /// Stimulus position for a slot, as of the last `tick_all`.
    #[inline]
    pub fn position(&self, slot: usize) -> Vec2 {
        self.positions[slot]
    }

    /// Restart a slot's trajectory for a freshly assigned sweep.
    pub fn reset_slot(&mut self, slot: usize) {
        if let Some(motor) = self.motors.get_mut(slot) {
            motor.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_stays_within_radius_of_center() {
        let mut motor = OrbitMotor::new(
            Vec2::new(100.0, 100.0),
            Vec2::new(40.0, 20.0),
            Vec2::new(0.5, 0.3),
            0.0,
        );
        for _ in 0..500 {
            let p = motor.tick(0.016);
            assert!((p.x - 100.0).abs() <= 40.0 + 1e-3);
            assert!((p.y - 100.0).abs() <= 20.0 + 1e-3);
        }
    }

    #[test]
    fn pool_tracks_one_position_per_slot() {
        let screen = ScreenConfig::default();
        let mut pool = MotorPool::orbits(3, &screen);
        assert_eq!(pool.len(), 3);
        pool.tick_all(0.016);
        let a = pool.position(0);
        let b = pool.position(1);
        assert_ne!(a, b, "slots must move independently");
    }
}
