//! Evolutionary search for polygon approximations of a reference image.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): random construction and the mutation catalog
//! - **Candidates** (`candidate`): a genome with its cached render and fitness
//! - **Evolver** (`evolver`): the elitist generation loop
//! - **Checkpoints** (`checkpoint`): atomic save and validated resume
//! - **Stats** (`stats`): periodic throughput lines
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use polygon_evolver::compute::evolution::{CheckpointStore, Evolver};
//! use polygon_evolver::compute::{FitnessEvaluator, SkiaRasterizer};
//! use polygon_evolver::imaging::load_reference;
//! use polygon_evolver::schema::RunConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig {
//!     reference_path: "mona_lisa.png".into(),
//!     ..Default::default()
//! };
//! let reference = Arc::new(load_reference(&config.reference_path)?);
//! let evaluator = FitnessEvaluator::new(reference, Arc::new(SkiaRasterizer::default()), config.fitness);
//! let store = CheckpointStore::new(config.resolved_checkpoint_path());
//!
//! let mut evolver = Evolver::new(&config, evaluator, store)?;
//! let result = evolver.run_with_callback(|progress| {
//!     println!("Generation {}: best fitness = {}", progress.generation, progress.best_fitness);
//! })?;
//! println!("Stopped after {} generations: {:?}", result.generations, result.stop_reason);
//! # Ok(())
//! # }
//! ```

mod candidate;
mod checkpoint;
mod evolver;
mod genome;
mod stats;

pub use candidate::Candidate;
pub use checkpoint::{
    CHECKPOINT_FORMAT_VERSION, Checkpoint, CheckpointCodec, CheckpointError, CheckpointStore,
    JsonCodec,
};
pub use evolver::{EvolutionProgress, EvolutionResult, EvolveError, Evolver, StopReason};
pub use genome::{GenomeRng, MutationKind};
pub use stats::{RunStats, Throughput};
