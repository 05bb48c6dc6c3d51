use anyhow::Context;
use clap::Parser;
use orbit_ring::{HoverStrategy, MotionPreference, OrbitConfig, OrbitConfigPatch, OrbitRing, RotationAxis};
use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

mod terminal;

/// Run an animated orbit ring in the terminal.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// The YAML config file to use.
    #[arg(long, env = "ORBIT_RING_CONFIG")]
    config: Option<PathBuf>,

    /// The axis the ring spins around.
    #[arg(long, value_parser = RotationAxis::parse)]
    axis: Option<RotationAxis>,

    /// What to do on hover.
    #[arg(long, value_parser = HoverStrategy::parse)]
    strategy: Option<HoverStrategy>,

    /// Constant tilt around the X axis, in degrees.
    #[arg(long, allow_negative_numbers = true)]
    tilt_x: Option<f64>,

    /// Constant tilt around the Y axis, in degrees.
    #[arg(long, allow_negative_numbers = true)]
    tilt_y: Option<f64>,

    /// Don't loop: hover only nudges the ring.
    #[arg(long)]
    reduced_motion: bool,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Print one JSON frame per line instead of drawing.
    #[arg(long)]
    trace: bool,

    /// How many frames to trace.
    #[arg(long, default_value_t = 150, requires = "trace")]
    frames: u64,

    /// When to start hovering while tracing, in milliseconds.
    #[arg(long, requires = "trace")]
    hover_at: Option<u64>,

    /// When to stop hovering while tracing, in milliseconds.
    #[arg(long, requires = "trace")]
    leave_at: Option<u64>,

    /// Print the config file's JSON schema and exit.
    #[cfg(feature = "json-schema")]
    #[arg(long)]
    print_schema: bool,
}

impl Cli {
    fn overrides(&self) -> OrbitConfigPatch {
        OrbitConfigPatch {
            rotation_axis: self.axis,
            hover_strategy: self.strategy,
            tilt_x: self.tilt_x,
            tilt_y: self.tilt_y,
            ..Default::default()
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<OrbitConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match OrbitConfig::default_path().filter(|path| path.exists()) {
            Some(path) => path,
            None => return Ok(OrbitConfig::default()),
        },
    };
    log::debug!("loading config from {}", path.display());
    OrbitConfig::load(&path).with_context(|| format!("loading config from {}", path.display()))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    #[cfg(feature = "json-schema")]
    if cli.print_schema {
        let schema = schemars::schema_for!(OrbitConfig);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let base = load_config(cli.config.as_deref())?;
    let config = cli.overrides().apply(&base).context("invalid command line overrides")?;
    let motion = if cli.reduced_motion { MotionPreference::Reduced } else { MotionPreference::Full };
    let mut ring = OrbitRing::construct(config, motion, Instant::now())?;

    if cli.trace {
        let script = terminal::TraceScript {
            frames: cli.frames,
            fps: cli.fps,
            hover_at: cli.hover_at.map(Duration::from_millis),
            leave_at: cli.leave_at.map(Duration::from_millis),
        };
        let mut stdout = io::stdout().lock();
        return terminal::trace(&mut ring, &script, Instant::now(), &mut stdout);
    }
    terminal::run(&mut ring, cli.fps)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error running orbit-ring: {e:#}");
        std::process::exit(1);
    }
}
