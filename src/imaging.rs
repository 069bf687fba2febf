//! Image file codec: decode the reference, encode results.
//!
//! Any input the `image` crate understands is converted to RGBA8 here, so the
//! rest of the crate only ever sees [`PixelBuffer`]s. The reference is stored
//! premultiplied: colour under transparent pixels is not part of the target.

use std::path::{Path, PathBuf};

use crate::compute::PixelBuffer;
use crate::schema::Rgba;

/// Image codec failure.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Failed to load image {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to save image {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Image {path} is empty")]
    Empty { path: PathBuf },
}

/// Decode an image file into premultiplied RGBA8.
///
/// Opaque pixels are unchanged. Renders always have an opaque background, so
/// scoring them against this buffer compares what is actually visible.
pub fn load_reference<P: AsRef<Path>>(path: P) -> Result<PixelBuffer, ImageError> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|source| ImageError::Load {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::Empty {
            path: path.to_path_buf(),
        });
    }

    let mut data = img.into_raw();
    for px in data.chunks_exact_mut(4) {
        let premultiplied = Rgba::new(px[0], px[1], px[2], px[3]).to_premultiplied();
        px.copy_from_slice(&premultiplied);
    }

    PixelBuffer::from_raw(width, height, data).ok_or_else(|| ImageError::Empty {
        path: path.to_path_buf(),
    })
}

/// Encode a buffer; the format follows the file extension.
pub fn save_image<P: AsRef<Path>>(path: P, buffer: &PixelBuffer) -> Result<(), ImageError> {
    let path = path.as_ref();
    let (width, height) = buffer.dimensions();

    image::save_buffer(
        path,
        buffer.as_bytes(),
        width,
        height,
        image::ExtendedColorType::Rgba8,
    )
    .map_err(|source| ImageError::Save {
        path: path.to_path_buf(),
        source,
    })
}
