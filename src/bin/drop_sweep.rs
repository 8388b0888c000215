//! drop-sweep: drop an object onto a plane from a grid of heights.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use drop_settle::{
    run_sweep, ConnectionMode, HarnessConfig, PhysicsBackend, ScriptedBackend, SweepReport,
};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// rapier3d rigid-body engine.
    Rapier,
    /// Engine-free free-fall playback, for dry runs.
    Scripted,
}

#[derive(Parser)]
#[command(name = "drop-sweep")]
#[command(version, about = "Drop-and-settle trials over a rigid-body physics backend")]
struct Cli {
    /// Harness config (TOML). Defaults reproduce the reference sweep.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Physics backend to drive.
    #[arg(short, long, value_enum)]
    backend: Option<BackendKind>,

    /// Interactive mode: pace steps to real time.
    #[arg(long)]
    gui: bool,

    /// Falling object model (URDF).
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Comma-separated drop heights in meters.
    #[arg(long, value_delimiter = ',')]
    heights: Option<Vec<f32>>,

    /// Trials per height.
    #[arg(short, long)]
    trials: Option<usize>,

    /// Seed for the orientation sampler.
    #[arg(long)]
    seed: Option<u64>,

    /// Give up on a trial after this many steps.
    #[arg(long)]
    max_steps: Option<u64>,
}

impl Cli {
    fn harness_config(&self) -> drop_settle::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };
        if self.gui {
            config.mode = ConnectionMode::Gui;
        }
        if let Some(model) = &self.model {
            config.scene.object.model = model.clone();
        }
        if let Some(heights) = &self.heights {
            config.sweep.heights = Some(heights.clone());
        }
        if let Some(trials) = self.trials {
            config.sweep.trials_per_height = trials;
        }
        if self.seed.is_some() {
            config.sweep.seed = self.seed;
        }
        if self.max_steps.is_some() {
            config.settle.max_steps_per_trial = self.max_steps;
        }
        config.validate()?;
        Ok(config)
    }
}

fn make_backend(kind: BackendKind) -> drop_settle::Result<Box<dyn PhysicsBackend>> {
    match kind {
        #[cfg(feature = "rapier")]
        BackendKind::Rapier => Ok(Box::new(drop_settle::RapierBackend::new())),
        #[cfg(not(feature = "rapier"))]
        BackendKind::Rapier => Err(drop_settle::HarnessError::Config(
            "built without the `rapier` feature".into(),
        )),
        BackendKind::Scripted => Ok(Box::new(ScriptedBackend::default())),
    }
}

fn run(cli: &Cli) -> drop_settle::Result<SweepReport> {
    let config = cli.harness_config()?;
    let kind = cli.backend.unwrap_or(if cfg!(feature = "rapier") {
        BackendKind::Rapier
    } else {
        BackendKind::Scripted
    });
    info!(
        "object {}, heights {:?}, {} trial(s) per height",
        config.scene.object.model.display(),
        config.sweep.heights(),
        config.sweep.trials_per_height
    );
    run_sweep(make_backend(kind)?, &config)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
