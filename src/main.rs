// Entry point: runs the sweep engine against a synthetic observer so a full
// session can be exercised without a tracker or a renderer attached.

use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use gradiate::config::TrialConfig;
use gradiate::core::sweep_space::{RayPathSource, SweepSpace};
use gradiate::gaze::{GazeFrame, ScriptedGaze, Vec2};
use gradiate::trial::engine::{FrameCtx, SweepTrialEngine, TrialPhase};
use gradiate::trial::motor::MotorPool;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Trial configuration (written with defaults when missing)
    #[arg(long, default_value = "gradiate.toml")]
    config: String,

    /// Number of sweeps (ray angles spread over 0..180 degrees)
    #[arg(long, default_value_t = 6)]
    sweeps: usize,

    /// Path points per sweep
    #[arg(long, default_value_t = 10)]
    points: usize,

    /// Simulated frame duration in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Hard stop after this many frames
    #[arg(long, default_value_t = 200_000)]
    max_frames: u64,

    /// Probability scale of the synthetic observer tracking a visible sweep
    #[arg(long, default_value_t = 0.9)]
    accuracy: f32,

    /// Observer seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Print the full JSON report instead of the summary table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = TrialConfig::load_or_default(&args.config);

    let keys: Vec<f32> = (0..args.sweeps)
        .map(|i| 180.0 * (i as f32 + 0.5) / args.sweeps as f32)
        .collect();
    let paths = RayPathSource {
        space: SweepSpace::new(0.5, 32.0, 0.002, 1.0),
        points_per_sweep: args.points.max(2),
    };
    let motors = MotorPool::orbits(cfg.scheduler.capacity, &cfg.screen);
    let center = Vec2::new(cfg.screen.width * 0.5, cfg.screen.height * 0.5);

    let mut engine = SweepTrialEngine::new(cfg, keys, Box::new(paths), motors)?;
    let mut gaze = ScriptedGaze::idle(Some(center));
    let mut rng = SmallRng::seed_from_u64(args.seed);

    let mut t = 0.0f32;
    for _ in 0..args.max_frames {
        t += args.dt;

        // Synthetic observer: track each visible sweep with a probability
        // that falls off as its contrast approaches threshold.
        let mut frame = GazeFrame {
            active: true,
            eye: Some(center),
            ..Default::default()
        };
        for (idx, sweep) in engine.sweeps().iter().enumerate() {
            if !sweep.is_active() {
                continue;
            }
            let Some(point) = sweep.current_point() else {
                continue;
            };
            let visibility = (point.contrast / 0.05).min(1.0);
            if rng.random::<f32>() < args.accuracy * visibility {
                frame.position_tracking.push(idx);
                frame.trajectory_tracking.push(idx);
            }
        }
        gaze.set_frame(frame);

        engine.tick(FrameCtx { dt: args.dt, t }, &gaze);
        if engine.phase() == TrialPhase::Reward {
            break;
        }
    }

    if args.json {
        let report = engine.aggregate().report_json()?;
        println!("{}", serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?);
        return Ok(());
    }

    println!("repeats completed: {}", engine.completed_repeats());
    match engine.aggregate().summarize() {
        Ok(summaries) => {
            println!("key(deg)  success  failure  threshold_sf  threshold_contrast");
            for s in summaries {
                println!(
                    "{:8.1} {:8} {:8} {:13.3} {:19.5}",
                    s.key, s.successes, s.failures, s.threshold_spatial_freq, s.threshold_contrast
                );
            }
        }
        Err(err) => println!("no threshold summary: {err}"),
    }
    Ok(())
}
