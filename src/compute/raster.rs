//! Polygon rasterization.
//!
//! The evolver only depends on the [`Rasterizer`] contract: an opaque black
//! background, polygons filled back-to-front in list order, alpha-aware
//! blending of non-premultiplied colors. [`SkiaRasterizer`] is the default
//! implementation.

use tiny_skia as sk;

use super::PixelBuffer;
use crate::schema::{Genome, Polygon};

/// Rendering failure.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Cannot allocate a {width}x{height} canvas")]
    InvalidCanvas { width: u32, height: u32 },
}

/// Paints an ordered polygon list onto a fresh buffer.
///
/// Implementations are shared by every evaluation task of a generation.
pub trait Rasterizer: Send + Sync {
    fn render(
        &self,
        polygons: &[Polygon],
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, RenderError>;

    /// Render a whole genome at its own canvas size.
    fn render_genome(&self, genome: &Genome) -> Result<PixelBuffer, RenderError> {
        self.render(&genome.polygons, genome.width, genome.height)
    }
}

/// CPU rasterizer backed by tiny-skia.
#[derive(Debug, Clone)]
pub struct SkiaRasterizer {
    anti_alias: bool,
}

impl Default for SkiaRasterizer {
    fn default() -> Self {
        Self { anti_alias: true }
    }
}

impl SkiaRasterizer {
    pub fn new(anti_alias: bool) -> Self {
        Self { anti_alias }
    }
}

impl Rasterizer for SkiaRasterizer {
    fn render(
        &self,
        polygons: &[Polygon],
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, RenderError> {
        let mut pix =
            sk::Pixmap::new(width, height).ok_or(RenderError::InvalidCanvas { width, height })?;
        pix.fill(sk::Color::BLACK);

        for poly in polygons {
            fill_polygon(&mut pix, poly, self.anti_alias);
        }

        // Opaque background keeps alpha at 255, but demultiply anyway so the
        // buffer is correct for any background.
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for px in pix.pixels() {
            let c = px.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }

        PixelBuffer::from_raw(width, height, data).ok_or(RenderError::InvalidCanvas { width, height })
    }
}

fn fill_polygon(pix: &mut sk::Pixmap, poly: &Polygon, anti_alias: bool) {
    let Some((first, rest)) = poly.points.split_first() else {
        return;
    };

    let mut pb = sk::PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    pb.close();

    // Degenerate (zero-area) outlines have no path and cover no pixels.
    let Some(path) = pb.finish() else {
        return;
    };

    let c = poly.color;
    let mut paint = sk::Paint::default();
    paint.set_color_rgba8(c.r, c.g, c.b, c.a);
    paint.anti_alias = anti_alias;

    pix.fill_path(
        &path,
        &paint,
        sk::FillRule::Winding,
        sk::Transform::identity(),
        None,
    );
}
