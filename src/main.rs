use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use diskgas::config::RunConfig;
use diskgas::core::{
    diffusion_coefficient, mean_pressure, pressure_series, Chamber, Enclosure, Horizon, ImpactLog,
    MsdObserver, Simulation,
};
use diskgas::error::{Error, Result};
use diskgas::io::{self, generator, TrajectoryWriter};
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Event-driven hard-disk gas in a two-chamber enclosure
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (can be specified multiple times)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write random initial configurations
    Generate(GenerateArgs),
    /// Simulate every iteration and write trajectories
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Optional TOML run configuration
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(short = 'n', long, value_parser = positive_usize)]
    particles: Option<usize>,

    #[clap(short, long, value_parser = positive_usize)]
    iterations: Option<usize>,

    /// Input directory to populate
    #[clap(short, long)]
    out: Option<PathBuf>,

    #[clap(long, value_parser = positive_f64)]
    speed: Option<f64>,

    #[clap(long, value_parser = positive_f64)]
    radius: Option<f64>,

    /// Side of the (square) left chamber
    #[clap(long, value_parser = positive_f64)]
    size: Option<f64>,

    /// Base seed; iteration `i` uses `seed + i`
    #[clap(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Optional TOML run configuration
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(short = 'n', long, value_parser = positive_usize)]
    particles: Option<usize>,

    /// Door width L
    #[clap(short = 'L', long, value_parser = positive_f64)]
    door: Option<f64>,

    #[clap(short, long, value_parser = positive_usize)]
    iterations: Option<usize>,

    /// Stop after this many events
    #[clap(long, value_parser = clap::value_parser!(u64).range(1..), conflicts_with = "time")]
    steps: Option<u64>,

    /// Stop at this simulation time
    #[clap(long, value_parser = positive_f64)]
    time: Option<f64>,

    #[clap(long)]
    input: Option<PathBuf>,

    #[clap(long)]
    output: Option<PathBuf>,
}

fn positive_f64(s: &str) -> std::result::Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(format!("{s} is not a positive finite number"))
    }
}

fn positive_usize(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be greater than zero".into()),
        Ok(v) => Ok(v),
        Err(e) => Err(format!("{e}")),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load(path),
        None => Ok(RunConfig::default()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| "diskgas=info".into()),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let outcome = match cli.command {
        Command::Generate(args) => prepare_generate(&args).and_then(|cfg| generate(&cfg)),
        Command::Run(args) => prepare_run(&args).and_then(|cfg| run(&cfg)),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ (Error::InvalidParam(_) | Error::Config(_))) => {
            error!(%err, "invalid run parameters");
            ExitCode::from(2)
        }
        Err(err) => {
            error!(%err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn prepare_generate(args: &GenerateArgs) -> Result<RunConfig> {
    let mut cfg = load_config(args.config.as_ref())?;
    if let Some(n) = args.particles {
        cfg.particles = n;
    }
    if let Some(k) = args.iterations {
        cfg.iterations = k;
    }
    if let Some(dir) = &args.out {
        cfg.input_dir = dir.clone();
    }
    if let Some(speed) = args.speed {
        cfg.generator.speed = speed;
    }
    if let Some(radius) = args.radius {
        cfg.generator.radius = radius;
    }
    if let Some(size) = args.size {
        cfg.enclosure.width = size;
        cfg.enclosure.height = size;
    }
    if args.seed.is_some() {
        cfg.generator.seed = args.seed;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn prepare_run(args: &RunArgs) -> Result<RunConfig> {
    let mut cfg = load_config(args.config.as_ref())?;
    if let Some(n) = args.particles {
        cfg.particles = n;
    }
    if args.door.is_some() {
        cfg.enclosure.door = args.door;
    }
    if let Some(k) = args.iterations {
        cfg.iterations = k;
    }
    if let Some(steps) = args.steps {
        cfg.horizon.steps = Some(steps);
        cfg.horizon.time = None;
    }
    if let Some(time) = args.time {
        cfg.horizon.time = Some(time);
        cfg.horizon.steps = None;
    }
    if let Some(dir) = &args.input {
        cfg.input_dir = dir.clone();
    }
    if let Some(dir) = &args.output {
        cfg.output_dir = dir.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn generate(cfg: &RunConfig) -> Result<()> {
    let gen_cfg = cfg.generator_config();
    for i in 0..cfg.iterations {
        let seed = cfg.generator.seed.map(|s| s.wrapping_add(i as u64));
        let mut rng = generator::seeded_rng(seed);
        let particles = generator::generate(&gen_cfg, &mut rng)?;

        let path = io::input_path(&cfg.input_dir, cfg.particles, i);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(fs::File::create(&path)?);
        generator::write_particles(&mut out, &particles)?;
        info!(iteration = i, path = %path.display(), "initial configuration written");
    }
    Ok(())
}

fn run(cfg: &RunConfig) -> Result<()> {
    let enclosure = cfg.enclosure.build()?;
    let horizon = cfg.horizon.to_horizon()?;
    debug!(?cfg, "starting campaign");
    for i in 0..cfg.iterations {
        run_iteration(cfg, &enclosure, horizon, i)?;
    }
    Ok(())
}

fn run_iteration(
    cfg: &RunConfig,
    enclosure: &Enclosure,
    horizon: Horizon,
    i: usize,
) -> Result<()> {
    let input = io::input_path(&cfg.input_dir, cfg.particles, i);
    let particles = io::read_particles(&input, cfg.particles)?;

    let door = enclosure.door().unwrap_or(0.0);
    let output = io::output_path(&cfg.output_dir, cfg.particles, door, &cfg.horizon.tag(), i);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut sim = Simulation::new(particles, enclosure.clone())?;
    let mut writer = TrajectoryWriter::create(&output)?;
    let mut impacts = ImpactLog::default();
    let analysis = &cfg.analysis;
    let mut msd = MsdObserver::new(analysis.steady_state)?;
    let summary = sim.run(horizon, &mut (&mut writer, (&mut impacts, &mut msd)))?;
    writer.finish()?;

    match pressure_series(&impacts.impacts, enclosure, analysis.pressure_bin) {
        Ok(series) => {
            for bin in series {
                debug!(
                    iteration = i,
                    start = bin.start,
                    end = bin.end,
                    left = bin.left,
                    right = bin.right,
                    "pressure bin"
                );
            }
        }
        Err(err) => warn!(iteration = i, %err, "pressure series skipped"),
    }
    for chamber in [Chamber::Left, Chamber::Right] {
        let area = enclosure.chamber_area(chamber);
        if area > 0.0 {
            let count = sim
                .particles()
                .iter()
                .filter(|p| enclosure.chamber_of(p) == chamber)
                .count();
            let density = count as f64 / area;
            debug!(iteration = i, ?chamber, count, density, "final occupancy");
        }
    }
    match diffusion_coefficient(msd.samples(), analysis.fit_min_tau, analysis.fit_max_tau) {
        Ok(d) => info!(
            iteration = i,
            anchor = ?msd.anchor_time(),
            diffusion = d.coefficient,
            diffusion_err = d.error,
            points = d.points,
            "diffusion coefficient"
        ),
        Err(err) => debug!(iteration = i, %err, "no diffusion coefficient for this run"),
    }

    let since = analysis.steady_state;
    let left = mean_pressure(&impacts.impacts, enclosure, Chamber::Left, since)?;
    let right = mean_pressure(&impacts.impacts, enclosure, Chamber::Right, since)?;
    info!(
        iteration = i,
        steps = summary.steps,
        time = summary.time,
        stale = summary.stale_discarded,
        termination = ?summary.termination,
        pressure_left = left,
        pressure_right = right,
        path = %output.display(),
        "iteration finished"
    );
    Ok(())
}
