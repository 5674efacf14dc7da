//! Gaze-tracking capability consumed by the trial engine.
//!
//! The engine never computes gaze quality itself; it asks this interface
//! three independent questions per target (position / trajectory / saccade
//! tracking) plus eye position and the most recent saccade. Targets are
//! addressed by sweep index, assigned by the engine.

/// Screen-space position in the host's coordinate units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// The most recently completed saccade.
#[derive(Clone, Copy, Debug)]
pub struct Saccade {
    /// Amplitude in screen units.
    pub distance: f32,
    /// Absolute time the saccade ended.
    pub ended_at: f32,
}

pub trait GazeSource {
    /// Whether the tracker currently has a usable signal.
    fn is_active(&self) -> bool;

    /// Current eye position, if known.
    fn eye_position(&self) -> Option<Vec2>;

    fn is_position_tracking(&self, target: usize) -> bool;
    fn is_trajectory_tracking(&self, target: usize) -> bool;
    fn is_saccade_tracking(&self, target: usize) -> bool;

    fn last_saccade(&self) -> Option<Saccade>;
}

/// One frame of scripted gaze state.
#[derive(Clone, Debug, Default)]
pub struct GazeFrame {
    pub active: bool,
    pub eye: Option<Vec2>,
    pub position_tracking: Vec<usize>,
    pub trajectory_tracking: Vec<usize>,
    pub saccade_tracking: Vec<usize>,
    pub saccade: Option<Saccade>,
}

/// Deterministic gaze source driven frame by frame by the caller.
/// Used by the trial simulator and the integration tests.
#[derive(Debug, Default)]
pub struct ScriptedGaze {
    frame: GazeFrame,
}

impl ScriptedGaze {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_frame(&mut self, frame: GazeFrame) {
        self.frame = frame;
    }

    pub fn frame_mut(&mut self) -> &mut GazeFrame {
        &mut self.frame
    }

    /// Convenience: full-quality tracking of the given targets at `eye`.
    pub fn tracking(targets: &[usize], eye: Vec2) -> Self {
        Self {
            frame: GazeFrame {
                active: true,
                eye: Some(eye),
                position_tracking: targets.to_vec(),
                trajectory_tracking: targets.to_vec(),
                saccade_tracking: Vec::new(),
                saccade: None,
            },
        }
    }

    /// Convenience: tracker active but following nothing.
    pub fn idle(eye: Option<Vec2>) -> Self {
        Self {
            frame: GazeFrame {
                active: true,
                eye,
                ..Default::default()
            },
        }
    }
}

impl GazeSource for ScriptedGaze {
    fn is_active(&self) -> bool {
        self.frame.active
    }

    fn eye_position(&self) -> Option<Vec2> {
        self.frame.eye
    }

    fn is_position_tracking(&self, target: usize) -> bool {
        self.frame.position_tracking.contains(&target)
    }

    fn is_trajectory_tracking(&self, target: usize) -> bool {
        self.frame.trajectory_tracking.contains(&target)
    }

    fn is_saccade_tracking(&self, target: usize) -> bool {
        self.frame.saccade_tracking.contains(&target)
    }

    fn last_saccade(&self) -> Option<Saccade> {
        self.frame.saccade
    }
}
