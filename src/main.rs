//! Polygon Evolver CLI - Approximate an image with evolving polygons.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, ValueEnum};

use polygon_evolver::{
    compute::evolution::{CheckpointStore, EvolveError, Evolver},
    compute::{FitnessEvaluator, SkiaRasterizer},
    imaging::{self, ImageError},
    preview::PreviewBoard,
    schema::{FitnessMetric, RunConfig},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reference image to approximate
    #[arg(long)]
    source: Option<PathBuf>,

    /// Where the best rendering is written
    #[arg(long)]
    dest: Option<PathBuf>,

    /// Checkpoint file (default: derived from the source name and polygon count)
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Generation budget
    #[arg(long)]
    max_generations: Option<u64>,

    /// Candidates per generation
    #[arg(long)]
    population: Option<usize>,

    /// Polygons per candidate
    #[arg(long)]
    polygons: Option<usize>,

    /// Pixel-difference metric
    #[arg(long, value_enum)]
    fitness: Option<MetricArg>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// JSON run configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the default configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MetricArg {
    Fast,
    Canonical,
}

impl From<MetricArg> for FitnessMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Fast => FitnessMetric::Fast,
            MetricArg::Canonical => FitnessMetric::Canonical,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Error reading config file {0}: {1}")]
    ReadConfig(PathBuf, #[source] std::io::Error),
    #[error("Error parsing config: {0}")]
    ParseConfig(#[from] serde_json::Error),
    #[error("No source image given (use --source or reference_path in the config)")]
    MissingSource,
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Evolve(#[from] EvolveError),
}

impl Args {
    /// Start from the config file when given, then apply explicit flags.
    fn into_config(self) -> Result<RunConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => {
                let text =
                    fs::read_to_string(path).map_err(|e| CliError::ReadConfig(path.clone(), e))?;
                serde_json::from_str(&text)?
            }
            None => RunConfig::default(),
        };

        if let Some(source) = self.source {
            config.reference_path = source;
        }
        if let Some(dest) = self.dest {
            config.output_path = dest;
        }
        if let Some(checkpoint) = self.checkpoint {
            config.checkpoint_path = Some(checkpoint);
        }
        if let Some(n) = self.max_generations {
            config.max_generations = n;
        }
        if let Some(n) = self.population {
            config.evolution.population_size = n;
        }
        if let Some(n) = self.polygons {
            config.evolution.polygon_count = n;
        }
        if let Some(metric) = self.fitness {
            config.fitness = metric.into();
        }
        if self.seed.is_some() {
            config.random_seed = self.seed;
        }

        if config.reference_path.as_os_str().is_empty() {
            return Err(CliError::MissingSource);
        }
        Ok(config)
    }
}

/// Ask the evolver to stop at the next generation boundary.
///
/// Returns `true` when a stop had already been requested.
fn request_stop(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::Relaxed)
}

/// First Ctrl-C finishes the current generation and writes output and a
/// checkpoint; a second one exits immediately.
fn install_stop_handler(cancel: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        if request_stop(&cancel) {
            log::warn!("Second interrupt, exiting without a final checkpoint");
            std::process::exit(130);
        }
        log::info!("Interrupt received, stopping after the current generation");
    });
    if let Err(e) = result {
        log::warn!("Cannot install Ctrl-C handler: {}", e);
    }
}

fn run(config: RunConfig) -> Result<(), CliError> {
    let reference = imaging::load_reference(&config.reference_path)?;
    log::info!(
        "Loaded {} ({}x{})",
        config.reference_path.display(),
        reference.width(),
        reference.height()
    );

    let evaluator = FitnessEvaluator::new(
        Arc::new(reference),
        Arc::new(SkiaRasterizer::default()),
        config.fitness,
    );
    let store = CheckpointStore::new(config.resolved_checkpoint_path());
    let board = Arc::new(PreviewBoard::new(config.evolution.population_size));

    let mut evolver = Evolver::new(&config, evaluator, store)?.with_previews(board);
    install_stop_handler(evolver.cancel_handle());
    let result = evolver.run()?;

    log::info!(
        "{} generations, best fitness {}, {} evaluations in {:.1}s ({:?})",
        result.generations,
        result.best_fitness,
        result.total_evaluations,
        result.elapsed_seconds,
        result.stop_reason
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.print_config {
        match serde_json::to_string_pretty(&RunConfig::default()) {
            Ok(json) => {
                println!("{}", json);
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                log::error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    match args.into_config().and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
