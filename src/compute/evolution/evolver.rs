//! The generation loop.
//!
//! One coordinator owns the incumbent ("most fit") candidate. Each generation
//! it spawns `population_size - 1` mutated copies of the incumbent, evaluates
//! them in parallel, waits for all of them, ranks the full population and
//! adopts the new best only when it is strictly fitter. Every
//! `checkpoint_interval` completed generations the best render and a
//! checkpoint are written; both writes are fatal on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use super::candidate::Candidate;
use super::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use super::genome::GenomeRng;
use super::stats::RunStats;
use crate::compute::{FitnessError, FitnessEvaluator};
use crate::imaging::{self, ImageError};
use crate::preview::PreviewBoard;
use crate::schema::{ConfigError, EvolutionParams, Genome, RunConfig};

/// Any condition that ends a run early.
#[derive(Debug, thiserror::Error)]
pub enum EvolveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Evaluation failed: {0}")]
    Fitness(#[from] FitnessError),
    #[error("Checkpoint failed: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("Output failed: {0}")]
    Image(#[from] ImageError),
}

/// Reason a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Generation budget exhausted.
    MaxGenerations,
    /// The cancel handle was set.
    Cancelled,
}

/// Snapshot passed to the progress callback after every generation.
#[derive(Debug, Clone)]
pub struct EvolutionProgress {
    /// Completed generations, including any restored from a checkpoint.
    pub generation: u64,
    pub max_generations: u64,
    /// Fitness of the incumbent.
    pub best_fitness: u64,
    /// Best fitness in this generation's ranked population.
    pub generation_best: u64,
    /// Worst fitness in this generation's ranked population.
    pub generation_worst: u64,
    pub generations_since_change: u64,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    /// Generation counter at the end of the run.
    pub generations: u64,
    pub best_fitness: u64,
    /// Evaluations performed by this process, restored incumbent included.
    pub total_evaluations: u64,
    pub elapsed_seconds: f64,
    pub stop_reason: StopReason,
}

/// Elitist, mutation-only optimizer with checkpoint/resume.
pub struct Evolver {
    params: EvolutionParams,
    max_generations: u64,
    output_path: PathBuf,
    evaluator: FitnessEvaluator,
    store: CheckpointStore,
    previews: Option<Arc<PreviewBoard>>,
    rng: GenomeRng,
    most_fit: Candidate,
    population: Vec<Candidate>,
    generation: u64,
    generations_since_change: u64,
    total_evaluations: u64,
    cancelled: Arc<AtomicBool>,
}

impl Evolver {
    /// Create an evolver, resuming from `store` when a checkpoint exists.
    ///
    /// A missing checkpoint starts a fresh run with a random incumbent. A
    /// corrupt checkpoint, or one whose polygon count or canvas size does not
    /// match this run, is an error.
    pub fn new(
        config: &RunConfig,
        evaluator: FitnessEvaluator,
        store: CheckpointStore,
    ) -> Result<Self, EvolveError> {
        config.validate()?;
        let params = config.evolution.clone();

        let (width, height) = evaluator.reference().dimensions();
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidDimensions { width, height }.into());
        }

        let mut rng = match config.random_seed {
            Some(seed) => GenomeRng::new(seed),
            None => GenomeRng::random(),
        };

        let (genome, generation, generations_since_change) = match store.load_optional()? {
            Some(cp) => {
                check_restored(&cp.most_fit, &params, (width, height))?;
                log::info!(
                    "Resuming from {} at generation {} ({} since last improvement)",
                    store.path().display(),
                    cp.generation,
                    cp.generations_since_change
                );
                (cp.most_fit, cp.generation, cp.generations_since_change)
            }
            None => {
                log::info!(
                    "No checkpoint at {}, starting fresh with {} polygons on {}x{}",
                    store.path().display(),
                    params.polygon_count,
                    width,
                    height
                );
                let genome = rng.random_genome(width, height, params.polygon_count)?;
                (genome, 0, 0)
            }
        };

        // The render is never persisted; rebuild it before first use.
        let mut most_fit = Candidate::new(genome);
        most_fit.evaluate(&evaluator)?;

        Ok(Self {
            params,
            max_generations: config.max_generations,
            output_path: config.output_path.clone(),
            evaluator,
            store,
            previews: None,
            rng,
            population: vec![most_fit.clone()],
            most_fit,
            generation,
            generations_since_change,
            total_evaluations: 1,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Publish ranked renders to `board` after every generation.
    pub fn with_previews(mut self, board: Arc<PreviewBoard>) -> Self {
        self.previews = Some(board);
        self
    }

    /// Get cancellation handle. Honored between generations.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn generations_since_change(&self) -> u64 {
        self.generations_since_change
    }

    pub fn most_fit(&self) -> &Candidate {
        &self.most_fit
    }

    /// The population as ranked by the last generation. Before the first
    /// generation this holds only the incumbent.
    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn best_fitness(&self) -> u64 {
        self.most_fit.fitness().unwrap_or(u64::MAX)
    }

    /// Run one generation: spawn, evaluate, rank, publish, select.
    pub fn step_generation(&mut self) -> Result<(), EvolveError> {
        let spawn = self.params.population_size.saturating_sub(1);
        let seeds: Vec<u64> = (0..spawn).map(|_| self.rng.next_seed()).collect();

        let incumbent = &self.most_fit;
        let evaluator = &self.evaluator;
        let events = self.params.mutations_per_candidate;
        let move_distance = self.params.point_move_distance;

        // Each task owns its copy and its RNG; collect is the barrier.
        let offspring = seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = GenomeRng::new(seed);
                let mut child = incumbent.deep_copy();
                child.mutate(&mut rng, events, move_distance);
                child.evaluate(evaluator)?;
                Ok(child)
            })
            .collect::<Result<Vec<_>, FitnessError>>()?;

        self.total_evaluations += offspring.len() as u64;

        let mut population = Vec::with_capacity(offspring.len() + 1);
        population.push(self.most_fit.clone());
        population.extend(offspring);
        // Stable, so the incumbent stays ahead of offspring that only tie it.
        population.sort_by(Candidate::cmp_fitness);

        self.publish_previews(&population);

        let prev_best = self.best_fitness();
        match population[0].fitness() {
            Some(f) if f < prev_best => {
                log::debug!(
                    "Generation {}: fitness {} -> {}",
                    self.generation + 1,
                    prev_best,
                    f
                );
                self.most_fit = population[0].clone();
                self.generations_since_change = 0;
            }
            _ => self.generations_since_change += 1,
        }

        self.population = population;
        self.generation += 1;
        Ok(())
    }

    fn publish_previews(&self, ranked: &[Candidate]) {
        let Some(board) = &self.previews else {
            return;
        };
        for (i, (slot, candidate)) in board.slots().zip(ranked).enumerate() {
            if let Some(image) = candidate.shared_image()
                && !slot.publish(image)
            {
                log::debug!("Preview slot {} busy, skipped", i);
            }
        }
    }

    /// Write the incumbent's render to the output path.
    pub fn write_output(&self) -> Result<(), EvolveError> {
        match self.most_fit.image() {
            Some(image) => imaging::save_image(&self.output_path, image)?,
            None => {
                let image = self.evaluator.render(&self.most_fit.genome)?;
                imaging::save_image(&self.output_path, &image)?;
            }
        }
        Ok(())
    }

    /// Snapshot the counters and incumbent genome to the checkpoint store.
    pub fn save_checkpoint(&self) -> Result<(), EvolveError> {
        log::info!("Checkpointing to {}", self.store.path().display());
        let checkpoint = Checkpoint::new(
            self.generation,
            self.generations_since_change,
            self.most_fit.genome.clone(),
        );
        self.store.save(&checkpoint)?;
        Ok(())
    }

    fn persist(&self) -> Result<(), EvolveError> {
        let started = Instant::now();
        self.write_output()?;
        self.save_checkpoint()?;
        log::info!("Checkpoint took {:.1?}", started.elapsed());
        Ok(())
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        let best_fitness = self.best_fitness();
        let fitness_at = |c: Option<&Candidate>| c.and_then(Candidate::fitness).unwrap_or(best_fitness);
        EvolutionProgress {
            generation: self.generation,
            max_generations: self.max_generations,
            best_fitness,
            generation_best: fitness_at(self.population.first()),
            generation_worst: fitness_at(self.population.last()),
            generations_since_change: self.generations_since_change,
        }
    }

    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }
        if self.generation >= self.max_generations {
            return Some(StopReason::MaxGenerations);
        }
        None
    }

    /// Run evolution with progress callback.
    ///
    /// On a normal stop or a cancel the final render and a checkpoint are
    /// written before returning.
    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<EvolutionResult, EvolveError>
    where
        F: Fn(&EvolutionProgress),
    {
        let start_time = Instant::now();
        let mut stats = RunStats::new();

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.step_generation()?;
            stats.increment(self.params.population_size.saturating_sub(1));

            let progress = self.progress();
            if self.params.stats_interval > 0 && self.generation % self.params.stats_interval == 0 {
                stats.report(
                    self.generation,
                    self.generations_since_change,
                    progress.generation_best,
                    progress.generation_worst,
                );
            }

            if self.generation % self.params.checkpoint_interval == 0 {
                self.persist()?;
            }

            callback(&progress);
        };

        self.persist()?;

        let best_fitness = self.best_fitness();
        log::info!(
            "After {} generations ({:?}), fitness is {}, saved to {}",
            self.generation,
            stop_reason,
            best_fitness,
            self.output_path.display()
        );

        Ok(EvolutionResult {
            generations: self.generation,
            best_fitness,
            total_evaluations: self.total_evaluations,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
            stop_reason,
        })
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EvolveError> {
        self.run_with_callback(|_| {})
    }
}

/// A restored genome must match the configured polygon count and the
/// reference canvas.
fn check_restored(
    genome: &Genome,
    params: &EvolutionParams,
    reference: (u32, u32),
) -> Result<(), ConfigError> {
    if genome.polygons.len() != params.polygon_count {
        return Err(ConfigError::PolygonCountMismatch {
            checkpoint: genome.polygons.len(),
            configured: params.polygon_count,
        });
    }
    if (genome.width, genome.height) != reference {
        return Err(ConfigError::CanvasMismatch {
            checkpoint: (genome.width, genome.height),
            reference,
        });
    }
    Ok(())
}
