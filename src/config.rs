use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Per-sweep evidence rates and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    #[serde(default = "EvidenceConfig::default_start")]
    pub start: f32,
    #[serde(default = "EvidenceConfig::default_min")]
    pub min: f32,
    #[serde(default = "EvidenceConfig::default_max")]
    pub max: f32,
    /// Sweep advances when its evidence reaches this value.
    #[serde(default = "EvidenceConfig::default_success_threshold")]
    pub success_threshold: f32,
    #[serde(default = "EvidenceConfig::default_full_gain_per_sec")]
    pub full_gain_per_sec: f32,
    #[serde(default = "EvidenceConfig::default_position_only_gain_per_sec")]
    pub position_only_gain_per_sec: f32,
    /// Loss magnitude while the eye is off screen (local to the sweep).
    #[serde(default = "EvidenceConfig::default_off_screen_loss_per_sec")]
    pub off_screen_loss_per_sec: f32,
    /// Unconditional decay magnitude.
    #[serde(default = "EvidenceConfig::default_automatic_loss_per_sec")]
    pub automatic_loss_per_sec: f32,
    /// Whether saccade-tracking counts as full-quality tracking.
    #[serde(default = "EvidenceConfig::default_allow_saccade_tracking")]
    pub allow_saccade_tracking: bool,
}

impl EvidenceConfig {
    fn default_start() -> f32 {
        0.0
    }
    fn default_min() -> f32 {
        -0.5
    }
    fn default_max() -> f32 {
        2.0
    }
    fn default_success_threshold() -> f32 {
        1.0
    }
    fn default_full_gain_per_sec() -> f32 {
        1.0
    }
    fn default_position_only_gain_per_sec() -> f32 {
        0.35
    }
    fn default_off_screen_loss_per_sec() -> f32 {
        0.4
    }
    fn default_automatic_loss_per_sec() -> f32 {
        0.25
    }
    fn default_allow_saccade_tracking() -> bool {
        true
    }
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            start: Self::default_start(),
            min: Self::default_min(),
            max: Self::default_max(),
            success_threshold: Self::default_success_threshold(),
            full_gain_per_sec: Self::default_full_gain_per_sec(),
            position_only_gain_per_sec: Self::default_position_only_gain_per_sec(),
            off_screen_loss_per_sec: Self::default_off_screen_loss_per_sec(),
            automatic_loss_per_sec: Self::default_automatic_loss_per_sec(),
            allow_saccade_tracking: Self::default_allow_saccade_tracking(),
        }
    }
}

/// Trial-level evidence gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "GateConfig::default_start")]
    pub start: f32,
    #[serde(default = "GateConfig::default_min")]
    pub min: f32,
    #[serde(default = "GateConfig::default_max")]
    pub max: f32,
    /// Trial ends when gate evidence falls to this value. Defaults to `min`.
    #[serde(default)]
    pub end_threshold: Option<f32>,
    #[serde(default = "GateConfig::default_decay_per_sec")]
    pub decay_per_sec: f32,
    #[serde(default = "GateConfig::default_off_screen_loss_per_sec")]
    pub off_screen_loss_per_sec: f32,
    /// Loss per screen unit of saccade amplitude when a saccade lands on no
    /// tracked stimulus.
    #[serde(default = "GateConfig::default_saccade_loss_weight")]
    pub saccade_loss_weight: f32,
    /// How close the eye must land to a stimulus to excuse a saccade.
    #[serde(default = "GateConfig::default_radius_tolerance")]
    pub radius_tolerance: f32,
    /// When set, this named event is the only way a trial ends.
    #[serde(default)]
    pub manual_termination_event: Option<String>,
    /// 0 = unlimited.
    #[serde(default)]
    pub max_duration_sec: f32,
}

impl GateConfig {
    fn default_start() -> f32 {
        500.0
    }
    fn default_min() -> f32 {
        -300.0
    }
    fn default_max() -> f32 {
        0.0
    }
    fn default_decay_per_sec() -> f32 {
        60.0
    }
    fn default_off_screen_loss_per_sec() -> f32 {
        120.0
    }
    fn default_saccade_loss_weight() -> f32 {
        0.5
    }
    fn default_radius_tolerance() -> f32 {
        120.0
    }

    pub fn end_threshold(&self) -> f32 {
        self.end_threshold.unwrap_or(self.min)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            start: Self::default_start(),
            min: Self::default_min(),
            max: Self::default_max(),
            end_threshold: None,
            decay_per_sec: Self::default_decay_per_sec(),
            off_screen_loss_per_sec: Self::default_off_screen_loss_per_sec(),
            saccade_loss_weight: Self::default_saccade_loss_weight(),
            radius_tolerance: Self::default_radius_tolerance(),
            manual_termination_event: None,
            max_duration_sec: 0.0,
        }
    }
}

/// Onboarding ghost cue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhostConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "GhostConfig::default_radius_tolerance")]
    pub radius_tolerance: f32,
    #[serde(default = "GhostConfig::default_fade_duration_sec")]
    pub fade_duration_sec: f32,
    /// Settle latency after detection during which tracking gain is held at
    /// zero.
    #[serde(default = "GhostConfig::default_post_detection_delay_sec")]
    pub post_detection_delay_sec: f32,
}

impl GhostConfig {
    fn default_radius_tolerance() -> f32 {
        90.0
    }
    fn default_fade_duration_sec() -> f32 {
        0.5
    }
    fn default_post_detection_delay_sec() -> f32 {
        1.0
    }
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radius_tolerance: Self::default_radius_tolerance(),
            fade_duration_sec: Self::default_fade_duration_sec(),
            post_detection_delay_sec: Self::default_post_detection_delay_sec(),
        }
    }
}

/// Cross-sweep push propagation. Disabled when `max_angle_deg` is zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub max_push: f32,
    #[serde(default)]
    pub max_angle_deg: f32,
    /// A sweep only receives push when it trails the advancer by at least
    /// this many successes.
    #[serde(default = "PushConfig::default_min_success_lead")]
    pub min_success_lead: u32,
}

impl PushConfig {
    fn default_min_success_lead() -> u32 {
        3
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            max_push: 0.0,
            max_angle_deg: 0.0,
            min_success_lead: Self::default_min_success_lead(),
        }
    }
}

/// Backlog rotation through motor slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Concurrency cap: number of motor slots.
    #[serde(default = "SchedulerConfig::default_capacity")]
    pub capacity: usize,
    /// Fade-in applied by the renderer when a sweep activates.
    #[serde(default = "SchedulerConfig::default_fade_in_sec")]
    pub fade_in_sec: f32,
    /// Permute sweep keys before path generation each repeat.
    #[serde(default)]
    pub shuffle_keys: bool,
    #[serde(default = "SchedulerConfig::default_seed")]
    pub seed: u64,
}

impl SchedulerConfig {
    fn default_capacity() -> usize {
        2
    }
    fn default_fade_in_sec() -> f32 {
        0.75
    }
    fn default_seed() -> u64 {
        0x5EED
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
            fade_in_sec: Self::default_fade_in_sec(),
            shuffle_keys: false,
            seed: Self::default_seed(),
        }
    }
}

/// Session-level trial structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_repeats")]
    pub repeats: u32,
    /// Run all repeats inside one engine run (MAIN re-entered between
    /// repeats) instead of one repeat per session.
    #[serde(default = "SessionConfig::default_all_repeats_in_one")]
    pub all_repeats_in_one: bool,
    /// Keep sweep position/evidence across repeats; only records flush.
    #[serde(default)]
    pub sweeps_persist: bool,
    #[serde(default = "SessionConfig::default_intro_fade_sec")]
    pub intro_fade_sec: f32,
    /// Contrast-only sweeps (vertical rays).
    #[serde(default)]
    pub contrast_only: bool,
    /// Fixed low-contrast acuity sweeps. Mutually exclusive with
    /// `contrast_only`.
    #[serde(default)]
    pub fixed_low_contrast_acuity: bool,
}

impl SessionConfig {
    fn default_repeats() -> u32 {
        1
    }
    fn default_all_repeats_in_one() -> bool {
        true
    }
    fn default_intro_fade_sec() -> f32 {
        2.0
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            repeats: Self::default_repeats(),
            all_repeats_in_one: Self::default_all_repeats_in_one(),
            sweeps_persist: false,
            intro_fade_sec: Self::default_intro_fade_sec(),
            contrast_only: false,
            fixed_low_contrast_acuity: false,
        }
    }
}

/// Screen bounds used for the off-screen test, in gaze coordinate units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "ScreenConfig::default_width")]
    pub width: f32,
    #[serde(default = "ScreenConfig::default_height")]
    pub height: f32,
}

impl ScreenConfig {
    fn default_width() -> f32 {
        1920.0
    }
    fn default_height() -> f32 {
        1080.0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x <= self.width && y <= self.height
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrialConfig {
    #[serde(default)]
    pub evidence: EvidenceConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub ghost: GhostConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
}

impl TrialConfig {
    /// Reject configurations the engine cannot run. Fatal at setup; nothing
    /// here is recoverable mid-trial.
    pub fn validate(&self) -> Result<(), String> {
        if self.session.contrast_only && self.session.fixed_low_contrast_acuity {
            return Err(
                "contrast_only and fixed_low_contrast_acuity are mutually exclusive".to_string(),
            );
        }
        if self.scheduler.capacity == 0 {
            return Err("scheduler.capacity must be at least 1".to_string());
        }
        if self.evidence.min > self.evidence.max {
            return Err(format!(
                "evidence bounds inverted: min={} max={}",
                self.evidence.min, self.evidence.max
            ));
        }
        if self.gate.min > self.gate.max {
            return Err(format!(
                "gate bounds inverted: min={} max={}",
                self.gate.min, self.gate.max
            ));
        }
        if self.evidence.success_threshold <= self.evidence.min {
            return Err("evidence.success_threshold must sit above evidence.min".to_string());
        }
        if self.session.repeats == 0 {
            return Err("session.repeats must be at least 1".to_string());
        }
        Ok(())
    }

    /// Load TOML config from `path`, writing a default file when missing.
    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        eprintln!("Failed to parse config {path}: {err}. Using defaults.");
                    }
                },
                Err(err) => {
                    eprintln!("Failed to read config {path}: {err}. Using defaults.");
                }
            }
            return Self::default();
        }

        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                let body = format!("# gradiate trial configuration (defaults)\n\n{text}");
                if let Err(err) = fs::write(path_obj, body) {
                    eprintln!("Failed to write default config to {path}: {err}");
                }
            }
            Err(err) => {
                eprintln!("Failed to serialize default config: {err}");
            }
        }
        default_cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(TrialConfig::default().validate().is_ok());
    }

    #[test]
    fn conflicting_sweep_modes_are_fatal() {
        let mut cfg = TrialConfig::default();
        cfg.session.contrast_only = true;
        cfg.session.fixed_low_contrast_acuity = true;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("mutually exclusive"), "{err}");
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut cfg = TrialConfig::default();
        cfg.scheduler.capacity = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn gate_end_threshold_defaults_to_min() {
        let cfg = GateConfig::default();
        assert_eq!(cfg.end_threshold(), cfg.min);
        let cfg = GateConfig {
            end_threshold: Some(-100.0),
            ..Default::default()
        };
        assert_eq!(cfg.end_threshold(), -100.0);
    }

    #[test]
    fn load_or_default_round_trips() {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "gradiate_config_test_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let path_str = path.to_string_lossy().to_string();
        let _ = fs::remove_file(&path);

        let cfg = TrialConfig::load_or_default(&path_str);
        assert!(path.exists(), "default config file should be created");
        assert_eq!(cfg.scheduler.capacity, 2);
        assert_eq!(cfg.gate.start, 500.0);

        let reread = TrialConfig::load_or_default(&path_str);
        assert_eq!(reread.gate.min, cfg.gate.min);
        assert_eq!(
            reread.evidence.success_threshold,
            cfg.evidence.success_threshold
        );

        let _ = fs::remove_file(&path);
    }
}
