use gradiate::config::EvidenceConfig;
use gradiate::core::evidence::EvidenceAccumulator;
use gradiate::core::sweep_space::PathPoint;
use gradiate::gaze::{GazeFrame, ScriptedGaze, Vec2};
use gradiate::trial::sweep::{Sweep, SweepFrame, SweepState};

fn cfg() -> EvidenceConfig {
    EvidenceConfig {
        min: -2.0,
        full_gain_per_sec: 1.0,
        position_only_gain_per_sec: 0.25,
        automatic_loss_per_sec: 0.0,
        ..Default::default()
    }
}

fn active_sweep(points: usize) -> Sweep {
    let path = (0..points)
        .map(|i| PathPoint {
            spatial_freq: 2.0 + i as f32,
            contrast: 0.5 / (i + 1) as f32,
        })
        .collect();
    let mut s = Sweep::new(45.0, path, &cfg(), true);
    s.activate(0);
    s
}

fn gate_acc() -> EvidenceAccumulator {
    EvidenceAccumulator::new(-100.0, -300.0, 0.0)
}

fn frame<'a>(gaze: &'a ScriptedGaze, t: f32) -> SweepFrame<'a> {
    SweepFrame {
        dt: 0.25,
        t,
        trial_elapsed: t,
        gaze,
        on_screen: true,
        target: 0,
    }
}

#[test]
fn full_quality_tracking_advances_and_resets_evidence() {
    let mut sweep = active_sweep(4);
    let mut gate = gate_acc();
    let gaze = ScriptedGaze::tracking(&[0], Vec2::new(500.0, 500.0));
    let cfg = cfg();

    let mut advanced = None;
    for tick in 1..=4 {
        let out = sweep.tick_evidence(&frame(&gaze, tick as f32 * 0.25), &mut gate, &cfg);
        if out.advanced.is_some() {
            advanced = out.advanced;
            assert_eq!(tick, 4, "1.0 of evidence at 1.0/s over 0.25s ticks");
        }
    }

    let point = advanced.unwrap();
    assert_eq!(point.spatial_freq, 2.0, "records the point that was passed");
    assert_eq!(sweep.current_index(), 1);
    assert_eq!(sweep.evidence.value(), 0.0, "evidence restarts per point");
    assert_eq!(sweep.records().len(), 1);
    assert!(sweep.records()[0].success);
    // The same gains flowed into the trial-level accumulator.
    assert!((gate.value() + 99.0).abs() < 1e-4);
}

#[test]
fn position_only_tracking_earns_the_reduced_rate() {
    let mut sweep = active_sweep(4);
    let mut gate = gate_acc();
    let mut gaze = ScriptedGaze::new();
    gaze.set_frame(GazeFrame {
        active: true,
        eye: Some(Vec2::new(500.0, 500.0)),
        position_tracking: vec![0],
        ..Default::default()
    });
    let cfg = cfg();

    for tick in 1..=4 {
        sweep.tick_evidence(&frame(&gaze, tick as f32 * 0.25), &mut gate, &cfg);
    }
    assert_eq!(sweep.current_index(), 0, "quarter rate cannot advance in 1s");
    assert!((sweep.evidence.value() - 0.25).abs() < 1e-5);
}

#[test]
fn saccade_tracking_counts_as_full_quality_when_allowed() {
    let mut gaze = ScriptedGaze::new();
    gaze.set_frame(GazeFrame {
        active: true,
        eye: Some(Vec2::new(500.0, 500.0)),
        position_tracking: vec![0],
        saccade_tracking: vec![0],
        ..Default::default()
    });

    let mut allowed = cfg();
    allowed.allow_saccade_tracking = true;
    let mut sweep = active_sweep(4);
    let mut gate = gate_acc();
    sweep.tick_evidence(&frame(&gaze, 0.25), &mut gate, &allowed);
    assert!((sweep.evidence.value() - 0.25).abs() < 1e-5, "full rate");

    let mut denied = cfg();
    denied.allow_saccade_tracking = false;
    let mut sweep = active_sweep(4);
    let mut gate = gate_acc();
    sweep.tick_evidence(&frame(&gaze, 0.25), &mut gate, &denied);
    assert!((sweep.evidence.value() - 0.0625).abs() < 1e-5, "reduced rate");
}

#[test]
fn off_screen_loss_stays_local_to_the_sweep() {
    let mut sweep = active_sweep(4);
    let mut gate = gate_acc();
    let gaze = ScriptedGaze::idle(None);
    let mut cfg = cfg();
    cfg.off_screen_loss_per_sec = 0.4;
    cfg.automatic_loss_per_sec = 0.25;

    let f = SweepFrame {
        dt: 1.0,
        t: 1.0,
        trial_elapsed: 1.0,
        gaze: &gaze,
        on_screen: false,
        target: 0,
    };
    sweep.tick_evidence(&f, &mut gate, &cfg);
    assert!((sweep.evidence.value() + 0.65).abs() < 1e-5);
    assert_eq!(gate.value(), -100.0, "gate off-screen loss is not applied here");
}

#[test]
fn path_exhaustion_is_terminal() {
    let mut sweep = active_sweep(2);
    assert!(sweep.advance(1.0).is_some());
    assert_eq!(sweep.state(), SweepState::Active);
    assert!(sweep.advance(2.0).is_some());
    assert_eq!(sweep.state(), SweepState::Finished);
    assert_eq!(sweep.motor_slot(), None);
    assert!(sweep.current_point().is_none());
    assert!(sweep.advance(3.0).is_none(), "no points left to record");
    assert_eq!(sweep.records().len(), 2);
    assert!(sweep.records().iter().all(|r| r.success));
}
