//! The unit of selection: a genome with its cached render and fitness.

use std::cmp::Ordering;
use std::sync::Arc;

use super::genome::{GenomeRng, MutationKind};
use crate::compute::{FitnessError, FitnessEvaluator, PixelBuffer};
use crate::schema::Genome;

/// A genome plus the results of evaluating it.
///
/// `fitness` and `image` are only meaningful after [`Candidate::evaluate`];
/// mutation and [`Candidate::deep_copy`] clear both. `Clone` keeps them and
/// shares the immutable render.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub genome: Genome,
    fitness: Option<u64>,
    image: Option<Arc<PixelBuffer>>,
}

impl Candidate {
    /// Wrap a genome that has not been evaluated yet.
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: None,
            image: None,
        }
    }

    /// Fitness from the last evaluation, `None` if unknown.
    pub fn fitness(&self) -> Option<u64> {
        self.fitness
    }

    /// Render from the last evaluation.
    pub fn image(&self) -> Option<&PixelBuffer> {
        self.image.as_deref()
    }

    /// Shared handle to the render, for publishing without a pixel copy.
    pub fn shared_image(&self) -> Option<Arc<PixelBuffer>> {
        self.image.clone()
    }

    pub fn width(&self) -> u32 {
        self.genome.width
    }

    pub fn height(&self) -> u32 {
        self.genome.height
    }

    /// Independent copy of the genome with no image and unknown fitness.
    ///
    /// Every polygon and point is copied, so mutating the copy is never
    /// observable through `self`.
    pub fn deep_copy(&self) -> Self {
        Self::new(self.genome.clone())
    }

    /// Apply `events` random mutations in place and drop the cached results.
    pub fn mutate(
        &mut self,
        rng: &mut GenomeRng,
        events: usize,
        move_distance: u32,
    ) -> Vec<MutationKind> {
        self.invalidate();
        (0..events)
            .filter_map(|_| rng.mutate(&mut self.genome, move_distance))
            .collect()
    }

    /// Render and score, storing both on the candidate.
    pub fn evaluate(&mut self, evaluator: &FitnessEvaluator) -> Result<u64, FitnessError> {
        let (image, fitness) = evaluator.evaluate(&self.genome)?;
        self.image = Some(Arc::new(image));
        self.fitness = Some(fitness);
        Ok(fitness)
    }

    fn invalidate(&mut self) {
        self.fitness = None;
        self.image = None;
    }

    /// Ascending fitness order. Unevaluated candidates sort last.
    pub fn cmp_fitness(&self, other: &Self) -> Ordering {
        match (self.fitness, other.fitness) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
