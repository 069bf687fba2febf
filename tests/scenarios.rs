//! End-to-end runs of the evolver against small synthetic references.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use polygon_evolver::{
    compute::evolution::{Candidate, CheckpointError, CheckpointStore, EvolveError, Evolver},
    compute::{FitnessEvaluator, PixelBuffer, SkiaRasterizer, score_canonical, score_fast},
    imaging,
    preview::PreviewBoard,
    schema::{EvolutionParams, FitnessMetric, Genome, Rgba, RunConfig},
};

fn gradient(width: u32, height: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::filled(width, height, Rgba::BLACK);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            buf.set_pixel(x, y, Rgba::new(r, g, 128, 255));
        }
    }
    buf
}

fn evaluator(reference: PixelBuffer, metric: FitnessMetric) -> FitnessEvaluator {
    FitnessEvaluator::new(
        Arc::new(reference),
        Arc::new(SkiaRasterizer::default()),
        metric,
    )
}

fn run_config(dir: &Path, population: usize, polygons: usize, max_generations: u64) -> RunConfig {
    RunConfig {
        reference_path: dir.join("reference.png"),
        output_path: dir.join("output.png"),
        checkpoint_path: None,
        max_generations,
        evolution: EvolutionParams {
            population_size: population,
            polygon_count: polygons,
            ..Default::default()
        },
        fitness: FitnessMetric::Fast,
        random_seed: Some(2024),
    }
}

fn new_evolver(config: &RunConfig, reference: PixelBuffer) -> Result<Evolver, EvolveError> {
    Evolver::new(
        config,
        evaluator(reference, config.fitness),
        CheckpointStore::new(config.resolved_checkpoint_path()),
    )
}

#[test]
fn blank_genome_matches_black_reference() {
    let reference = PixelBuffer::filled(10, 10, Rgba::BLACK);
    let evaluator = evaluator(reference.clone(), FitnessMetric::Canonical);

    let mut candidate = Candidate::new(Genome::blank(10, 10));
    let fitness = candidate.evaluate(&evaluator).unwrap();

    assert_eq!(candidate.image(), Some(&reference));
    assert_eq!(fitness, 0);
    assert_eq!(score_fast(candidate.image().unwrap(), &reference).unwrap(), 0);
    assert_eq!(score_canonical(candidate.image().unwrap(), &reference).unwrap(), 0);
}

#[test]
fn single_generation_ranks_population() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_config(dir.path(), 10, 5, 1);
    let mut evolver = new_evolver(&config, gradient(32, 24)).unwrap();

    let result = evolver.run().unwrap();
    assert_eq!(result.generations, 1);

    let population = evolver.population();
    assert_eq!(population.len(), 10);
    let fitness: Vec<u64> = population.iter().map(|c| c.fitness().unwrap()).collect();
    assert!(fitness.windows(2).all(|w| w[0] <= w[1]), "{:?}", fitness);
    assert!(evolver.most_fit().fitness().unwrap() <= fitness[0]);
}

#[test]
fn incumbent_fitness_never_increases() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_config(dir.path(), 6, 8, 250);
    let mut evolver = new_evolver(&config, gradient(24, 24)).unwrap();

    let initial = evolver.most_fit().fitness().unwrap();
    let seen = Mutex::new(vec![initial]);
    let result = evolver
        .run_with_callback(|p| seen.lock().unwrap().push(p.best_fitness))
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert!(seen.windows(2).all(|w| w[1] <= w[0]));
    assert!(result.best_fitness <= initial);
    assert_eq!(result.generations, 250);

    // The output image holds the incumbent's render.
    let written = imaging::load_reference(&config.output_path).unwrap();
    assert_eq!(Some(&written), evolver.most_fit().image());
}

#[test]
fn resume_continues_from_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let reference = gradient(20, 20);
    let config = run_config(dir.path(), 5, 6, 30);

    let mut first = new_evolver(&config, reference.clone()).unwrap();
    first.run().unwrap();
    let genome = first.most_fit().genome.clone();
    let since = first.generations_since_change();
    drop(first);

    let extended = RunConfig {
        max_generations: 60,
        ..config.clone()
    };
    let mut resumed = new_evolver(&extended, reference).unwrap();

    assert_eq!(resumed.generation(), 30);
    assert_eq!(resumed.generations_since_change(), since);
    assert_eq!(resumed.most_fit().genome, genome);

    let before = resumed.most_fit().fitness().unwrap();
    let result = resumed.run().unwrap();
    assert_eq!(result.generations, 60);
    assert!(result.best_fitness <= before);
}

#[test]
fn corrupt_checkpoint_is_not_a_fresh_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_config(dir.path(), 4, 3, 10);
    let path = config.resolved_checkpoint_path();
    fs::write(&path, r#"{"format_version":1,"generation":5}"#).unwrap();

    let err = new_evolver(&config, gradient(8, 8)).err().unwrap();
    assert!(matches!(
        err,
        EvolveError::Checkpoint(CheckpointError::Corrupt { .. })
    ));
    // The damaged file is left for inspection.
    assert!(path.exists());
}

#[test]
fn previews_track_ranked_population() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_config(dir.path(), 4, 3, 3);
    let board = Arc::new(PreviewBoard::new(4));
    let mut evolver = new_evolver(&config, gradient(12, 12))
        .unwrap()
        .with_previews(Arc::clone(&board));

    evolver.run().unwrap();

    let snapshots = board.snapshot_all();
    assert_eq!(snapshots.len(), 4);
    for (snap, candidate) in snapshots.iter().zip(evolver.population()) {
        assert_eq!(snap.as_deref(), candidate.image());
    }
}
