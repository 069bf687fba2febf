//! Pixel-difference fitness.
//!
//! Lower is better; 0 means the two buffers are pixel-identical. Both metrics
//! accumulate squared channel differences into a `u64` and return its integer
//! square root. They rank candidates the same way but differ in magnitude, so
//! one run must stick to one metric.

use std::sync::Arc;

use super::raster::{Rasterizer, RenderError};
use super::PixelBuffer;
use crate::schema::{FitnessMetric, Genome};

/// Scoring failure.
#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    #[error("Image dimensions differ: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
}

fn check_dimensions(a: &PixelBuffer, b: &PixelBuffer) -> Result<(), FitnessError> {
    if a.dimensions() != b.dimensions() {
        return Err(FitnessError::DimensionMismatch {
            expected: a.dimensions(),
            actual: b.dimensions(),
        });
    }
    Ok(())
}

/// Squared difference of two 16-bit channel values, shifted right by 2 so
/// that four of them summed cannot overflow a `u32`.
#[inline]
fn sq_diff_16(x: u32, y: u32) -> u32 {
    let d = x.abs_diff(y);
    (d * d) >> 2
}

/// Widen an 8-bit channel to 16 bits (`0xff` becomes `0xffff`).
#[inline]
fn widen(c: u8) -> u32 {
    c as u32 * 0x101
}

/// Per-pixel score with channels widened to 16 bits.
pub fn score_canonical(a: &PixelBuffer, b: &PixelBuffer) -> Result<u64, FitnessError> {
    check_dimensions(a, b)?;

    let sum: u64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(p, q)| {
            let px = sq_diff_16(widen(p.r), widen(q.r))
                + sq_diff_16(widen(p.g), widen(q.g))
                + sq_diff_16(widen(p.b), widen(q.b))
                + sq_diff_16(widen(p.a), widen(q.a));
            px as u64
        })
        .sum();

    Ok(sum.isqrt())
}

/// Score over the raw channel bytes, no per-pixel conversion.
pub fn score_fast(a: &PixelBuffer, b: &PixelBuffer) -> Result<u64, FitnessError> {
    check_dimensions(a, b)?;

    let sum: u64 = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .map(|(&x, &y)| {
            let d = x.abs_diff(y) as u64;
            d * d
        })
        .sum();

    Ok(sum.isqrt())
}

/// Score two buffers with the chosen metric.
pub fn score(metric: FitnessMetric, a: &PixelBuffer, b: &PixelBuffer) -> Result<u64, FitnessError> {
    match metric {
        FitnessMetric::Canonical => score_canonical(a, b),
        FitnessMetric::Fast => score_fast(a, b),
    }
}

/// Renders genomes and scores them against a fixed reference image.
///
/// Cheap to share across evaluation tasks: the reference and rasterizer are
/// reference-counted and never mutated.
#[derive(Clone)]
pub struct FitnessEvaluator {
    reference: Arc<PixelBuffer>,
    rasterizer: Arc<dyn Rasterizer>,
    metric: FitnessMetric,
}

impl FitnessEvaluator {
    pub fn new(
        reference: Arc<PixelBuffer>,
        rasterizer: Arc<dyn Rasterizer>,
        metric: FitnessMetric,
    ) -> Self {
        Self {
            reference,
            rasterizer,
            metric,
        }
    }

    pub fn reference(&self) -> &PixelBuffer {
        &self.reference
    }

    pub fn metric(&self) -> FitnessMetric {
        self.metric
    }

    /// Render a genome with the configured rasterizer.
    pub fn render(&self, genome: &Genome) -> Result<PixelBuffer, FitnessError> {
        Ok(self.rasterizer.render_genome(genome)?)
    }

    /// Score an already-rendered buffer against the reference.
    pub fn score(&self, image: &PixelBuffer) -> Result<u64, FitnessError> {
        score(self.metric, &self.reference, image)
    }

    /// Render then score. Returns the image alongside its fitness.
    pub fn evaluate(&self, genome: &Genome) -> Result<(PixelBuffer, u64), FitnessError> {
        let image = self.render(genome)?;
        let fitness = self.score(&image)?;
        Ok((image, fitness))
    }
}
