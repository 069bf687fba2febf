//! Fixed-size RGBA8 pixel buffer shared by the rasterizer, fitness metrics,
//! preview slots and image codec.

use crate::schema::Rgba;

/// Row-major RGBA8 pixels.
///
/// Renders are fully opaque, where straight and premultiplied alpha agree.
/// A reference loaded by [`crate::imaging::load_reference`] is premultiplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Buffer filled with a single color.
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let px = [color.r, color.g, color.b, color.a];
        let data = px
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw RGBA bytes. Returns `None` when the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Color at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.data[i..i + 4];
        Some(Rgba::new(p[0], p[1], p[2], p[3]))
    }

    /// Overwrite the color at `(x, y)`. Out-of-range writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    /// Iterate pixels as colors in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Rgba> + '_ {
        self.data
            .chunks_exact(4)
            .map(|p| Rgba::new(p[0], p[1], p[2], p[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled() {
        let buf = PixelBuffer::filled(3, 2, Rgba::new(1, 2, 3, 4));
        assert_eq!(buf.as_bytes().len(), 24);
        assert!(buf.pixels().all(|p| p == Rgba::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_from_raw_length_checked() {
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_pixel_access() {
        let mut buf = PixelBuffer::filled(4, 4, Rgba::BLACK);
        buf.set_pixel(2, 3, Rgba::new(9, 8, 7, 255));
        assert_eq!(buf.pixel(2, 3), Some(Rgba::new(9, 8, 7, 255)));
        assert_eq!(buf.pixel(0, 0), Some(Rgba::BLACK));
        assert_eq!(buf.pixel(4, 0), None);
    }
}
