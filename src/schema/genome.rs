//! Genome data types: points, colors, polygons and the serializable genome.
//!
//! These are plain values. Every container here owns its contents, so
//! `Clone` on a [`Genome`] is a full structural copy with no shared storage.

use serde::{Deserialize, Serialize};

/// Fewest vertices a polygon may have.
pub const MIN_POINTS: usize = 3;

/// Most vertices a polygon may have.
pub const MAX_POINTS: usize = 6;

/// Integer vertex position on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Whether the point lies in `[0, width) x [0, height)`.
    pub fn within(&self, width: u32, height: u32) -> bool {
        self.x < width && self.y < height
    }
}

/// Non-premultiplied 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Color channels scaled by alpha, rounded.
    pub fn to_premultiplied(self) -> [u8; 4] {
        let a = self.a as u16;
        let mul = |c: u8| ((c as u16 * a + 127) / 255) as u8;
        [mul(self.r), mul(self.g), mul(self.b), self.a]
    }

    /// Inverse of [`Rgba::to_premultiplied`]. Fully transparent input maps to
    /// transparent black.
    pub fn from_premultiplied(px: [u8; 4]) -> Self {
        let a = px[3] as u16;
        if a == 0 {
            return Self::new(0, 0, 0, 0);
        }
        let div = |c: u8| ((c as u16 * 255 + a / 2) / a).min(255) as u8;
        Self::new(div(px[0]), div(px[1]), div(px[2]), px[3])
    }
}

/// Closed polygon with a single fill color.
///
/// The first point implicitly connects to the last. Vertex order defines the
/// shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
    pub color: Rgba,
}

impl Polygon {
    /// Whether the vertex count is within `[MIN_POINTS, MAX_POINTS]`.
    pub fn has_valid_arity(&self) -> bool {
        (MIN_POINTS..=MAX_POINTS).contains(&self.points.len())
    }
}

/// The persisted part of a candidate: canvas size and the Z-ordered polygon
/// list. Later polygons are painted over earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    pub width: u32,
    pub height: u32,
    pub polygons: Vec<Polygon>,
}

impl Genome {
    /// Empty genome; renders as solid black.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            polygons: Vec::new(),
        }
    }

    /// Check the structural invariants a restored genome must satisfy.
    ///
    /// Returns a description of the first violation found.
    pub fn check_structure(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            ));
        }

        for (i, poly) in self.polygons.iter().enumerate() {
            if !poly.has_valid_arity() {
                return Err(format!(
                    "polygon {} has {} points, expected {}..={}",
                    i,
                    poly.points.len(),
                    MIN_POINTS,
                    MAX_POINTS
                ));
            }
            if let Some(p) = poly
                .points
                .iter()
                .find(|p| !p.within(self.width, self.height))
            {
                return Err(format!(
                    "polygon {} point ({}, {}) lies outside {}x{}",
                    i, p.x, p.y, self.width, self.height
                ));
            }
        }

        Ok(())
    }
}
