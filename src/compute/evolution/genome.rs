//! Genome construction and the mutation operator catalog.

use rand::prelude::*;

use crate::schema::{ConfigError, Genome, MAX_POINTS, MIN_POINTS, Point, Polygon, Rgba};

/// One entry of the mutation catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Replace the fill color, alpha included.
    RecolorFull,
    /// Replace only the alpha channel.
    RecolorAlpha,
    /// Nudge one vertex by a bounded random offset.
    MovePoint,
    /// Randomly permute the whole polygon list.
    ShuffleZOrder,
    /// Add or delete a vertex, keeping the count within bounds.
    AddOrDeletePoint,
}

impl MutationKind {
    pub const ALL: [MutationKind; 5] = [
        MutationKind::RecolorFull,
        MutationKind::RecolorAlpha,
        MutationKind::MovePoint,
        MutationKind::ShuffleZOrder,
        MutationKind::AddOrDeletePoint,
    ];
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Uniform point in `[0, width) x [0, height)`.
    pub fn random_point(&mut self, width: u32, height: u32) -> Point {
        Point::new(self.rng.gen_range(0..width), self.rng.gen_range(0..height))
    }

    /// Uniform color, every channel independent.
    pub fn random_color(&mut self) -> Rgba {
        Rgba::new(
            self.rng.r#gen(),
            self.rng.r#gen(),
            self.rng.r#gen(),
            self.rng.r#gen(),
        )
    }

    /// Polygon with 3 to 6 uniform points and a uniform color.
    pub fn random_polygon(&mut self, width: u32, height: u32) -> Polygon {
        let count = self.rng.gen_range(MIN_POINTS..=MAX_POINTS);
        let points = (0..count)
            .map(|_| self.random_point(width, height))
            .collect();
        Polygon {
            points,
            color: self.random_color(),
        }
    }

    /// Genome of `polygon_count` random polygons.
    pub fn random_genome(
        &mut self,
        width: u32,
        height: u32,
        polygon_count: usize,
    ) -> Result<Genome, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidDimensions { width, height });
        }

        let polygons = (0..polygon_count)
            .map(|_| self.random_polygon(width, height))
            .collect();

        Ok(Genome {
            width,
            height,
            polygons,
        })
    }

    /// Uniform draw from the catalog.
    pub fn random_mutation(&mut self) -> MutationKind {
        MutationKind::ALL[self.rng.gen_range(0..MutationKind::ALL.len())]
    }

    /// Apply one mutation event: a random operator on a random polygon.
    ///
    /// Returns `None` when the genome has no polygons to mutate.
    pub fn mutate(&mut self, genome: &mut Genome, move_distance: u32) -> Option<MutationKind> {
        if genome.polygons.is_empty() {
            return None;
        }
        let kind = self.random_mutation();
        let locus = self.rng.gen_range(0..genome.polygons.len());
        self.apply(kind, genome, locus, move_distance);
        Some(kind)
    }

    /// Apply a specific operator to the polygon at `locus`.
    ///
    /// `ShuffleZOrder` ignores `locus` and permutes the whole list. A genome
    /// with an empty canvas has nowhere to place points and is left as is.
    pub fn apply(&mut self, kind: MutationKind, genome: &mut Genome, locus: usize, move_distance: u32) {
        let (width, height) = (genome.width, genome.height);
        if width == 0 || height == 0 {
            return;
        }

        if kind == MutationKind::ShuffleZOrder {
            genome.polygons.shuffle(&mut self.rng);
            return;
        }

        let Some(poly) = genome.polygons.get_mut(locus) else {
            return;
        };

        match kind {
            MutationKind::RecolorFull => {
                poly.color = self.random_color();
            }
            MutationKind::RecolorAlpha => {
                poly.color.a = self.rng.r#gen();
            }
            MutationKind::MovePoint => {
                if poly.points.is_empty() {
                    return;
                }
                let i = self.rng.gen_range(0..poly.points.len());
                let moved = self.nudge(poly.points[i], move_distance, width, height);
                poly.points[i] = moved;
            }
            MutationKind::AddOrDeletePoint => {
                let add = match poly.points.len() {
                    n if n <= MIN_POINTS => true,
                    n if n >= MAX_POINTS => false,
                    _ => self.rng.gen_bool(0.5),
                };
                if add {
                    let p = self.random_point(width, height);
                    poly.points.push(p);
                } else {
                    let i = self.rng.gen_range(0..poly.points.len());
                    poly.points.remove(i);
                }
            }
            MutationKind::ShuffleZOrder => {}
        }
    }

    /// Shift each coordinate by an independent offset in `[-distance, distance]`,
    /// clamped to the canvas.
    fn nudge(&mut self, p: Point, distance: u32, width: u32, height: u32) -> Point {
        let d = distance as i64;
        let dx = self.rng.gen_range(-d..=d);
        let dy = self.rng.gen_range(-d..=d);
        Point::new(
            clamp_axis(p.x as i64 + dx, width),
            clamp_axis(p.y as i64 + dy, height),
        )
    }
}

fn clamp_axis(v: i64, extent: u32) -> u32 {
    v.clamp(0, extent.saturating_sub(1) as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_random_genome() {
        let mut rng = GenomeRng::new(42);
        let genome = rng.random_genome(40, 30, 12).unwrap();

        assert_eq!(genome.polygons.len(), 12);
        assert_eq!((genome.width, genome.height), (40, 30));
        assert!(genome.check_structure().is_ok());
    }

    #[test]
    fn test_random_genome_rejects_empty_canvas() {
        let mut rng = GenomeRng::new(42);
        assert!(matches!(
            rng.random_genome(0, 10, 3),
            Err(ConfigError::InvalidDimensions { .. })
        ));
        assert!(rng.random_genome(10, 0, 3).is_err());
    }

    #[test]
    fn test_same_seed_same_genome() {
        let g1 = GenomeRng::new(7).random_genome(20, 20, 5).unwrap();
        let g2 = GenomeRng::new(7).random_genome(20, 20, 5).unwrap();
        assert_eq!(g1, g2);
    }

    #[test]
    fn test_recolor_alpha_keeps_rgb() {
        let mut rng = GenomeRng::new(1);
        let mut genome = rng.random_genome(10, 10, 3).unwrap();
        let before = genome.polygons[1].color;
        rng.apply(MutationKind::RecolorAlpha, &mut genome, 1, 5);
        let after = genome.polygons[1].color;
        assert_eq!((before.r, before.g, before.b), (after.r, after.g, after.b));
    }

    #[test]
    fn test_add_forced_at_min_delete_forced_at_max() {
        let mut rng = GenomeRng::new(5);
        let mut genome = Genome::blank(10, 10);
        genome.polygons.push(Polygon {
            points: vec![Point::new(0, 0); MIN_POINTS],
            color: Rgba::BLACK,
        });
        genome.polygons.push(Polygon {
            points: vec![Point::new(0, 0); MAX_POINTS],
            color: Rgba::BLACK,
        });

        rng.apply(MutationKind::AddOrDeletePoint, &mut genome, 0, 5);
        rng.apply(MutationKind::AddOrDeletePoint, &mut genome, 1, 5);

        assert_eq!(genome.polygons[0].points.len(), MIN_POINTS + 1);
        assert_eq!(genome.polygons[1].points.len(), MAX_POINTS - 1);
    }

    #[test]
    fn test_empty_canvas_is_left_alone() {
        let mut rng = GenomeRng::new(13);
        let mut genome = Genome::blank(0, 8);
        genome.polygons.push(Polygon {
            points: vec![Point::new(0, 0); MIN_POINTS],
            color: Rgba::BLACK,
        });
        let before = genome.clone();

        for kind in MutationKind::ALL {
            rng.apply(kind, &mut genome, 0, 5);
        }
        rng.mutate(&mut genome, 5);
        assert_eq!(genome, before);
    }

    #[test]
    fn test_shuffle_preserves_polygons() {
        let mut rng = GenomeRng::new(9);
        let mut genome = rng.random_genome(30, 30, 8).unwrap();
        let mut before = genome.polygons.clone();

        rng.apply(MutationKind::ShuffleZOrder, &mut genome, 0, 5);

        let mut after = genome.polygons.clone();
        let key = |p: &Polygon| (p.color.r, p.color.g, p.color.b, p.color.a, p.points.clone());
        before.sort_by_key(key);
        after.sort_by_key(key);
        assert_eq!(before, after);
    }

    #[test]
    fn test_mutate_empty_genome_is_noop() {
        let mut rng = GenomeRng::new(0);
        let mut genome = Genome::blank(5, 5);
        assert_eq!(rng.mutate(&mut genome, 5), None);
    }

    #[test]
    fn test_random_mutation_covers_catalog() {
        let mut rng = GenomeRng::new(21);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(rng.random_mutation());
        }
        assert_eq!(seen.len(), MutationKind::ALL.len());
    }

    proptest! {
        #[test]
        fn prop_add_or_delete_keeps_arity(
            seed in any::<u64>(),
            (width, height) in (1u32..64, 1u32..64),
            loci in proptest::collection::vec(0usize..4, 1..300),
        ) {
            let mut rng = GenomeRng::new(seed);
            let mut genome = rng.random_genome(width, height, 4).unwrap();

            for locus in loci {
                rng.apply(MutationKind::AddOrDeletePoint, &mut genome, locus, 5);
                prop_assert!(genome.polygons.iter().all(Polygon::has_valid_arity));
            }
            prop_assert!(genome.check_structure().is_ok());
        }

        #[test]
        fn prop_move_point_stays_on_canvas(
            seed in any::<u64>(),
            (width, height) in (1u32..32, 1u32..32),
            distance in 0u32..20,
            steps in 1usize..300,
        ) {
            let mut rng = GenomeRng::new(seed);
            let mut genome = rng.random_genome(width, height, 2).unwrap();

            for _ in 0..steps {
                rng.apply(MutationKind::MovePoint, &mut genome, 0, distance);
                prop_assert!(genome.polygons[0].points.iter().all(|p| p.within(width, height)));
            }
        }

        #[test]
        fn prop_any_mutation_sequence_keeps_structure(
            seed in any::<u64>(),
            (width, height) in (1u32..48, 1u32..48),
            polygons in 1usize..8,
            events in 1usize..200,
        ) {
            let mut rng = GenomeRng::new(seed);
            let mut genome = rng.random_genome(width, height, polygons).unwrap();

            for _ in 0..events {
                rng.mutate(&mut genome, 5);
            }
            prop_assert_eq!(genome.polygons.len(), polygons);
            prop_assert!(genome.check_structure().is_ok());
        }
    }
}
