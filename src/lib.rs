//! Polygon Evolver - Approximate a raster image with semi-transparent polygons.
//!
//! A population of candidate polygon sets is evolved toward pixel-level
//! similarity with a reference image. The best candidate is only ever
//! replaced by a strictly better one, and progress is checkpointed so long
//! runs survive restarts.
//!
//! # Architecture
//!
//! - `schema`: Genome data types and run configuration
//! - `compute`: Rasterization, fitness scoring and the evolution loop
//! - `imaging`: Reading the reference image and writing results
//! - `preview`: Lock-guarded slots exposing the latest render of each population member
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use polygon_evolver::compute::{FitnessEvaluator, PixelBuffer, SkiaRasterizer};
//! use polygon_evolver::schema::{FitnessMetric, Genome, Rgba};
//!
//! let reference = Arc::new(PixelBuffer::filled(10, 10, Rgba::BLACK));
//! let evaluator = FitnessEvaluator::new(
//!     reference,
//!     Arc::new(SkiaRasterizer::default()),
//!     FitnessMetric::Canonical,
//! );
//!
//! // An empty genome renders solid black.
//! let (_, fitness) = evaluator.evaluate(&Genome::blank(10, 10)).unwrap();
//! assert_eq!(fitness, 0);
//! ```

pub mod compute;
pub mod imaging;
pub mod preview;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{Evolver, EvolutionResult, EvolveError};
pub use compute::{FitnessEvaluator, PixelBuffer, SkiaRasterizer};
pub use schema::{Genome, RunConfig};
