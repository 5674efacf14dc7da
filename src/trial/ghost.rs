//! Onboarding ghost cue: a transient visual assist shown when a sweep
//! activates. Once the eye lands inside the detection radius the cue fades
//! out, and tracking-evidence gain stays suppressed for a settle delay
//! (observer saccade-and-settle latency after noticing the cue).

use crate::config::GhostConfig;
use crate::gaze::Vec2;

/// Edge event produced by a ghost update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GhostTransition {
    Detected,
    Faded,
}

#[derive(Clone, Debug)]
pub struct GhostAssist {
    visible: bool,
    detected: bool,
    detected_at: f32,
    fade_elapsed: f32,
    radius_tolerance: f32,
    fade_duration: f32,
    post_detection_delay: f32,
}

impl GhostAssist {
    /// A ghost starts visible; it only exists while its sweep needs the cue.
    pub fn new(cfg: &GhostConfig) -> Self {
        Self {
            visible: true,
            detected: false,
            detected_at: 0.0,
            fade_elapsed: 0.0,
            radius_tolerance: cfg.radius_tolerance,
            fade_duration: cfg.fade_duration_sec.max(1e-4),
            post_detection_delay: cfg.post_detection_delay_sec.max(0.0),
        }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Monotone: never reverts within the sweep's activation.
    #[inline]
    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// 0 at detection, 1 when fully faded.
    pub fn fade_progress(&self) -> f32 {
        if !self.detected {
            return 0.0;
        }
        (self.fade_elapsed / self.fade_duration).clamp(0.0, 1.0)
    }

    /// Treat the cue as noticed right now, regardless of eye position.
    /// Used for operator force-triggered detection.
    pub fn force_detect(&mut self, t: f32) -> Option<GhostTransition> {
        if self.detected {
            return None;
        }
        self.detected = true;
        self.detected_at = t;
        Some(GhostTransition::Detected)
    }

    /// Per-frame update against the eye and the ghost's stimulus position.
    pub fn update(&mut self, eye: Option<Vec2>, pos: Vec2, t: f32, dt: f32) -> Option<GhostTransition> {
        if !self.visible {
            return None;
        }
        if self.detected {
            self.fade_elapsed += dt;
            if self.fade_elapsed >= self.fade_duration {
                self.visible = false;
                return Some(GhostTransition::Faded);
            }
            return None;
        }
        if let Some(eye) = eye {
            if eye.distance(pos) <= self.radius_tolerance {
                self.detected = true;
                self.detected_at = t;
                return Some(GhostTransition::Detected);
            }
        }
        None
    }

    /// Gain is held at zero from detection until the settle delay elapses.
    pub fn suppresses_gain(&self, t: f32) -> bool {
        self.detected && t < self.detected_at + self.post_detection_delay
    }
}
