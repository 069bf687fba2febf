//! Run configuration for the polygon evolver.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Pixel-difference metric used to score candidates.
///
/// A run uses exactly one; scores from different metrics are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    /// Channels widened to 16 bits before differencing.
    Canonical,
    /// Squared differences over the raw RGBA bytes.
    #[default]
    Fast,
}

/// Parameters of the generation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionParams {
    /// Candidates per generation, including the incumbent.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Polygons per candidate. Fixed for a run and across resumes.
    #[serde(default = "default_polygon_count")]
    pub polygon_count: usize,
    /// Mutation events applied to each spawned copy.
    #[serde(default = "default_mutations_per_candidate")]
    pub mutations_per_candidate: usize,
    /// Largest per-axis vertex shift of a point move, in pixels.
    #[serde(default = "default_point_move_distance")]
    pub point_move_distance: u32,
    /// Generations between checkpoint and output writes.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,
    /// Generations between throughput log lines.
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            polygon_count: default_polygon_count(),
            mutations_per_candidate: default_mutations_per_candidate(),
            point_move_distance: default_point_move_distance(),
            checkpoint_interval: default_checkpoint_interval(),
            stats_interval: default_stats_interval(),
        }
    }
}

fn default_population_size() -> usize {
    10
}
fn default_polygon_count() -> usize {
    50
}
fn default_mutations_per_candidate() -> usize {
    1
}
fn default_point_move_distance() -> u32 {
    5
}
fn default_checkpoint_interval() -> u64 {
    250
}
fn default_stats_interval() -> u64 {
    10
}

/// Top-level configuration, supplied once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Image to approximate.
    pub reference_path: PathBuf,
    /// Where the best rendering is written.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Checkpoint file. Derived from the reference name when absent.
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
    /// Generation budget.
    #[serde(default = "default_max_generations")]
    pub max_generations: u64,
    #[serde(default)]
    pub evolution: EvolutionParams,
    #[serde(default)]
    pub fitness: FitnessMetric,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output.png")
}
fn default_max_generations() -> u64 {
    100_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            reference_path: PathBuf::new(),
            output_path: default_output_path(),
            checkpoint_path: None,
            max_generations: default_max_generations(),
            evolution: EvolutionParams::default(),
            fitness: FitnessMetric::default(),
            random_seed: None,
        }
    }
}

impl RunConfig {
    /// Checkpoint path to use for this run.
    ///
    /// An explicit path wins. Otherwise the name is built from the reference
    /// file stem and the polygon count, placed next to the output image, so
    /// runs with different polygon counts never share a checkpoint.
    pub fn resolved_checkpoint_path(&self) -> PathBuf {
        if let Some(path) = &self.checkpoint_path {
            return path.clone();
        }
        derive_checkpoint_path(
            &self.reference_path,
            &self.output_path,
            self.evolution.polygon_count,
        )
    }

    /// Validate the parameters that do not depend on the reference image.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolution.validate()
    }
}

impl EvolutionParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        if self.polygon_count == 0 {
            return Err(ConfigError::NoPolygons);
        }
        if self.mutations_per_candidate == 0 {
            return Err(ConfigError::NoMutations);
        }
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::InvalidCheckpointInterval);
        }
        Ok(())
    }
}

/// `<stem>-<polygons>.checkpoint.json` in the output's directory.
pub fn derive_checkpoint_path(reference: &Path, output: &Path, polygon_count: usize) -> PathBuf {
    let stem = reference
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "run".to_string());
    let name = format!("{stem}-{polygon_count}.checkpoint.json");

    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => PathBuf::from(name),
    }
}

/// Configuration errors. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Canvas dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("Polygon count must be non-zero")]
    NoPolygons,
    #[error("Mutations per candidate must be non-zero")]
    NoMutations,
    #[error("Checkpoint interval must be non-zero")]
    InvalidCheckpointInterval,
    #[error("Checkpoint polygon count mismatch: checkpoint has {checkpoint}, configured {configured}")]
    PolygonCountMismatch { checkpoint: usize, configured: usize },
    #[error("Checkpoint canvas {checkpoint:?} does not match reference image {reference:?}")]
    CanvasMismatch {
        checkpoint: (u32, u32),
        reference: (u32, u32),
    },
}
