use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use nbody_accuracy::{
    generate_with, geometric_schedule, Benchmark, Bodies, Configuration, CsvRecorder,
    NullRenderer, Renderer, RunConfig, Simulation, Strategy, TimingLog,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML file with run settings. Flags override its values.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare Barnes-Hut against direct summation over a growing number of bodies.
    Accuracy {
        #[arg(long)]
        max_bodies: Option<usize>,
        #[arg(long)]
        iterations: Option<usize>,
    },
    /// Integrate the system forward in time.
    Simulate {
        #[arg(short = 'n', long)]
        bodies: Option<usize>,
        #[arg(long)]
        frames: Option<usize>,
        #[arg(long)]
        time_step: Option<f64>,
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
    },
}

#[derive(Args, Debug)]
struct Overrides {
    #[arg(long, value_enum, global = true)]
    configuration: Option<Configuration>,
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[arg(long, global = true)]
    theta: Option<f64>,
    #[arg(long, global = true)]
    threads: Option<usize>,
    #[arg(long, global = true)]
    timing_log: Option<PathBuf>,
    #[arg(long, global = true)]
    frames_csv: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut RunConfig) {
        if let Some(configuration) = self.configuration {
            config.configuration = configuration;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(theta) = self.theta {
            config.theta = theta;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.timing_log.is_some() {
            config.timing_log = self.timing_log;
        }
        if self.frames_csv.is_some() {
            config.frames_csv = self.frames_csv;
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)
            .wrap_err_with(|| format!("failed to load {}", path.display()))?,
        None => RunConfig::default(),
    };
    cli.overrides.apply(&mut config);

    match cli.command {
        Command::Accuracy {
            max_bodies,
            iterations,
        } => {
            if let Some(max_bodies) = max_bodies {
                config.max_bodies = max_bodies;
            }
            if let Some(iterations) = iterations {
                config.iterations = iterations;
            }
            config.validate()?;
            accuracy(&config)
        }
        Command::Simulate {
            bodies,
            frames,
            time_step,
            strategy,
        } => {
            if let Some(bodies) = bodies {
                config.bodies = bodies;
            }
            if let Some(frames) = frames {
                config.frames = frames;
            }
            if let Some(time_step) = time_step {
                config.time_step = time_step;
            }
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            config.validate()?;
            simulate(&config)
        }
    }
}

fn create_bodies(config: &RunConfig, count: usize) -> Result<Bodies> {
    let mut bodies = Bodies::with_capacity(count);
    generate_with(
        config.configuration,
        &mut bodies,
        count,
        config.seed,
        config.gravitational_constant,
    )?;
    info!(count, configuration = %config.configuration, "initial conditions generated");
    Ok(bodies)
}

fn renderer(config: &RunConfig) -> Result<Box<dyn Renderer>> {
    Ok(match &config.frames_csv {
        Some(path) => Box::new(
            CsvRecorder::create(path)
                .wrap_err_with(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(NullRenderer),
    })
}

fn accuracy(config: &RunConfig) -> Result<()> {
    let counts = geometric_schedule(config.iterations, config.max_bodies);
    if counts.is_empty() {
        warn!(
            max_bodies = config.max_bodies,
            "no scheduled body count fits, nothing to do"
        );
        return Ok(());
    }

    let algorithm = config.approximate_algorithm()?;
    let bodies = create_bodies(config, config.max_bodies)?;
    let mut bench = Benchmark::new(bodies, config.barnes_hut(), algorithm)
        .direct(config.direct_summation())
        .renderer(renderer(config)?);

    if let Some(path) = &config.timing_log {
        let log = TimingLog::append_to(path)
            .wrap_err_with(|| format!("failed to open {}", path.display()))?;
        bench = bench.timing_log(log.boxed());
    }

    for record in bench.run(&counts)? {
        println!(
            "{:>8} {:>12.6} {:>12.6} {:>12.4e}",
            record.num_bodies,
            record.approximate_time.as_secs_f64(),
            record.direct_time.as_secs_f64(),
            record.l2_error,
        );
    }
    Ok(())
}

fn simulate(config: &RunConfig) -> Result<()> {
    let bodies = create_bodies(config, config.bodies)?;
    let mut renderer = renderer(config)?;

    let mut simulation = Simulation::new(bodies, config.force_strategy(), config.time_step);
    simulation.run(config.frames, renderer.as_mut())?;
    Ok(())
}
