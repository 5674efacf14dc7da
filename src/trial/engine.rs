//! Per-frame orchestration and the trial state machine.
//!
//! One `tick` per rendered frame. The update order inside `Main` is
//! load-bearing: ghosts run before evidence so a same-frame detection
//! suppresses that frame's gain, and push resolution runs after the
//! advancement pass so pushes reflect this frame's successes.

use tracing::{info, warn};

use crate::config::TrialConfig;
use crate::core::sweep_space::PathSource;
use crate::gaze::{GazeSource, Vec2};
use crate::trial::aggregate::ThresholdAggregate;
use crate::trial::events::{EventBus, SubscriptionToken, TrialEvent};
use crate::trial::gate::TrialEvidenceGate;
use crate::trial::ghost::{GhostAssist, GhostTransition};
use crate::trial::motor::MotorPool;
use crate::trial::push::PushPropagator;
use crate::trial::scheduler::{SweepSetScheduler, shuffle_keys};
use crate::trial::sweep::{Sweep, SweepFrame};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialPhase {
    /// Fade to baseline luminance; no sweeps yet.
    Intro,
    /// Repeats in progress.
    Main,
    /// Measurement done; reward/cleanup is the host's concern.
    Reward,
}

/// Host-supplied frame timing.
#[derive(Clone, Copy, Debug)]
pub struct FrameCtx {
    /// Elapsed seconds since the previous frame.
    pub dt: f32,
    /// Absolute time in seconds.
    pub t: f32,
}

/// Sweep conservation snapshot: backlog + active + finished == total at all
/// times within a repeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepCensus {
    pub backlog: usize,
    pub active: usize,
    pub finished: usize,
    pub total: usize,
}

pub struct SweepTrialEngine {
    cfg: TrialConfig,
    base_keys: Vec<f32>,
    paths: Box<dyn PathSource>,
    sweeps: Vec<Sweep>,
    scheduler: SweepSetScheduler,
    motors: MotorPool,
    push: PushPropagator,
    gate: TrialEvidenceGate,
    bus: EventBus,
    aggregate: ThresholdAggregate,
    phase: TrialPhase,
    intro_elapsed: f32,
    completed_repeats: u32,
    ghost_trigger: bool,
}

impl SweepTrialEngine {
    /// Construct an engine for one session. `keys` are the sweep identities
    /// (ray angles); `paths` binds keys to point sequences at each repeat
    /// start; `motors` is the fixed movement pool, one motor per slot.
    pub fn new(
        cfg: TrialConfig,
        keys: Vec<f32>,
        paths: Box<dyn PathSource>,
        motors: MotorPool,
    ) -> Result<Self, String> {
        cfg.validate()?;
        if keys.is_empty() {
            return Err("at least one sweep key is required".to_string());
        }
        if motors.len() < cfg.scheduler.capacity {
            return Err(format!(
                "motor pool holds {} motors but capacity is {}",
                motors.len(),
                cfg.scheduler.capacity
            ));
        }
        let scheduler = SweepSetScheduler::new(&cfg.scheduler);
        let gate = TrialEvidenceGate::new(&cfg.gate, 0.0);
        let push = PushPropagator::new(&cfg.push);
        Ok(Self {
            cfg,
            base_keys: keys,
            paths,
            sweeps: Vec::new(),
            scheduler,
            motors,
            push,
            gate,
            bus: EventBus::new(),
            aggregate: ThresholdAggregate::new(),
            phase: TrialPhase::Intro,
            intro_elapsed: 0.0,
            completed_repeats: 0,
            ghost_trigger: false,
        })
    }

    #[inline]
    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    #[inline]
    pub fn sweeps(&self) -> &[Sweep] {
        &self.sweeps
    }

    #[inline]
    pub fn gate_value(&self) -> f32 {
        self.gate.value()
    }

    #[inline]
    pub fn completed_repeats(&self) -> u32 {
        self.completed_repeats
    }

    #[inline]
    pub fn aggregate(&self) -> &ThresholdAggregate {
        &self.aggregate
    }

    pub fn subscribe(&mut self, sink: impl FnMut(&TrialEvent) + 'static) -> SubscriptionToken {
        self.bus.subscribe(sink)
    }

    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.bus.unsubscribe(token)
    }

    /// Forward a discrete named event (e.g. operator input) to the gate.
    pub fn raise_event(&mut self, name: &str) -> bool {
        self.gate.raise_event(name)
    }

    /// Force ghost cues onto active sweeps that lack one, independent of the
    /// scheduled onset trigger. Edge-triggered; consumed next tick.
    pub fn trigger_ghosts(&mut self) {
        self.ghost_trigger = true;
    }

    pub fn census(&self) -> SweepCensus {
        SweepCensus {
            backlog: self.scheduler.backlog_len(),
            active: self.scheduler.active_count(),
            finished: self.sweeps.iter().filter(|s| s.is_finished()).count(),
            total: self.sweeps.len(),
        }
    }

    pub fn tick(&mut self, ctx: FrameCtx, gaze: &dyn GazeSource) {
        match self.phase {
            TrialPhase::Intro => {
                self.intro_elapsed += ctx.dt;
                if self.intro_elapsed >= self.cfg.session.intro_fade_sec {
                    self.phase = TrialPhase::Main;
                    self.begin_repeat(ctx.t);
                }
            }
            TrialPhase::Main => self.tick_main(ctx, gaze),
            TrialPhase::Reward => {}
        }
    }

    fn begin_repeat(&mut self, t: f32) {
        let mut keys = self.base_keys.clone();
        if self.cfg.scheduler.shuffle_keys {
            shuffle_keys(&mut keys, self.cfg.scheduler.seed, self.completed_repeats);
        }

        let persist = self.cfg.session.sweeps_persist && !self.sweeps.is_empty();
        if persist {
            // Position/evidence carry over; exhausted sweeps stay finished.
            for sweep in &mut self.sweeps {
                if sweep.current_index() < sweep.path_len() {
                    sweep.reset_for_repeat();
                }
            }
        } else {
            let generated = self.paths.generate(&keys);
            self.sweeps = generated
                .into_iter()
                .map(|(key, path)| Sweep::new(key, path, &self.cfg.evidence, true))
                .collect();
        }

        let order: Vec<usize> = self
            .sweeps
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_finished())
            .map(|(i, _)| i)
            .collect();
        self.scheduler.load_backlog(order);
        info!(
            target: "trial::engine",
            repeat = self.completed_repeats + 1,
            sweeps = self.sweeps.len(),
            "repeat started"
        );
        self.start_trial(t);
    }

    /// New trial within the repeat: fresh gate, refill slots.
    fn start_trial(&mut self, t: f32) {
        self.gate = TrialEvidenceGate::new(&self.cfg.gate, t);
        let activated = self.scheduler.refill(&mut self.sweeps, &mut self.bus);
        self.on_activated(&activated);
    }

    fn on_activated(&mut self, activated: &[usize]) {
        for &idx in activated {
            if let Some(slot) = self.sweeps[idx].motor_slot() {
                self.motors.reset_slot(slot);
            }
            if self.cfg.ghost.enabled && self.sweeps[idx].ghost.is_none() {
                self.sweeps[idx].ghost = Some(GhostAssist::new(&self.cfg.ghost));
                self.bus.emit(TrialEvent::GhostShown {
                    key: self.sweeps[idx].key(),
                });
            }
        }
    }

    fn tick_main(&mut self, ctx: FrameCtx, gaze: &dyn GazeSource) {
        let FrameCtx { dt, t } = ctx;

        self.motors.tick_all(dt);

        let eye = if gaze.is_active() {
            gaze.eye_position()
        } else {
            None
        };
        let on_screen = eye.is_some_and(|e| self.cfg.screen.contains(e.x, e.y));

        self.update_ghosts(eye, t, dt);

        let saccade_miss = self.saccade_miss(gaze, eye, &ctx);
        self.gate.tick(dt, on_screen, saccade_miss);

        let trial_elapsed = t - self.gate.start_time();
        for (_, idx) in self.scheduler.active_pairs() {
            let frame = SweepFrame {
                dt,
                t,
                trial_elapsed,
                gaze,
                on_screen,
                target: idx,
            };
            let outcome =
                self.sweeps[idx].tick_evidence(&frame, self.gate.evidence_mut(), &self.cfg.evidence);
            if let Some(point) = outcome.advanced {
                self.bus.emit(TrialEvent::Advancement {
                    key: self.sweeps[idx].key(),
                    spatial_freq: point.spatial_freq,
                    contrast: point.contrast,
                });
                self.push.broadcast(&mut self.sweeps, idx);
                if outcome.finished {
                    self.bus.emit(TrialEvent::SweepFinished {
                        key: self.sweeps[idx].key(),
                    });
                }
            }
        }

        self.push.resolve(&mut self.sweeps, trial_elapsed, &mut self.bus);

        self.scheduler.release_inactive(&self.sweeps);
        let activated = self.scheduler.refill(&mut self.sweeps, &mut self.bus);
        self.on_activated(&activated);

        if self.scheduler.is_repeat_complete() {
            self.complete_repeat(t);
            return;
        }

        if let Some(reason) = self.gate.check_end(t) {
            info!(target: "trial::engine", ?reason, "trial ended");
            self.bus.emit(TrialEvent::TrialEnded { reason });
            for (_, idx) in self.scheduler.active_pairs() {
                self.sweeps[idx].deactivate(trial_elapsed);
                self.bus.emit(TrialEvent::SweepDeactivated {
                    key: self.sweeps[idx].key(),
                });
            }
            self.scheduler.clear_slots();
            if self.scheduler.backlog_len() > 0 {
                // More sweeps to run: next trial, same repeat.
                self.start_trial(t);
            } else {
                self.complete_repeat(t);
            }
        }
    }

    fn update_ghosts(&mut self, eye: Option<Vec2>, t: f32, dt: f32) {
        if std::mem::take(&mut self.ghost_trigger) {
            for (_, idx) in self.scheduler.active_pairs() {
                if self.sweeps[idx].ghost.is_none() {
                    self.sweeps[idx].ghost = Some(GhostAssist::new(&self.cfg.ghost));
                    self.bus.emit(TrialEvent::GhostShown {
                        key: self.sweeps[idx].key(),
                    });
                }
            }
        }
        for (slot, idx) in self.scheduler.active_pairs() {
            let pos = self.motors.position(slot);
            let key = self.sweeps[idx].key();
            let Some(ghost) = self.sweeps[idx].ghost.as_mut() else {
                continue;
            };
            match ghost.update(eye, pos, t, dt) {
                Some(GhostTransition::Detected) => {
                    self.bus.emit(TrialEvent::GhostDetected { key });
                }
                Some(GhostTransition::Faded) => {
                    self.bus.emit(TrialEvent::GhostFaded { key });
                }
                None => {}
            }
        }
    }

    /// Amplitude of a saccade that ended exactly this frame and landed on no
    /// tracked stimulus.
    fn saccade_miss(&self, gaze: &dyn GazeSource, eye: Option<Vec2>, ctx: &FrameCtx) -> Option<f32> {
        let saccade = gaze.last_saccade()?;
        if saccade.ended_at <= ctx.t - ctx.dt || saccade.ended_at > ctx.t {
            return None;
        }
        let eye = eye?;
        let tolerance = self.gate.radius_tolerance();
        let near_any = self
            .scheduler
            .active_pairs()
            .iter()
            .any(|&(slot, _)| eye.distance(self.motors.position(slot)) <= tolerance);
        (!near_any).then_some(saccade.distance)
    }

    fn complete_repeat(&mut self, t: f32) {
        self.completed_repeats += 1;
        for sweep in &mut self.sweeps {
            let key = sweep.key();
            let records = sweep.take_records();
            self.aggregate.absorb(key, records);
        }
        info!(
            target: "trial::engine",
            repeat = self.completed_repeats,
            records = self.aggregate.record_count(),
            "repeat completed"
        );
        self.bus.emit(TrialEvent::RepeatCompleted {
            repeat: self.completed_repeats,
        });

        if self.completed_repeats < self.cfg.session.repeats && self.cfg.session.all_repeats_in_one
        {
            self.begin_repeat(t);
        } else {
            self.phase = TrialPhase::Reward;
            match self.aggregate.summarize() {
                Ok(summaries) => {
                    info!(target: "trial::engine", sweeps = summaries.len(), "threshold summary ready");
                }
                Err(err) => {
                    warn!(target: "trial::engine", %err, "threshold fit skipped");
                }
            }
        }
    }
}
