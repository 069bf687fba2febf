//! Schema module - Genome and configuration types for the polygon evolver.

mod config;
mod genome;

pub use config::*;
pub use genome::*;
