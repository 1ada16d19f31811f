//! Image decoding abstraction.
//!
//! The streaming controller never decodes pixels itself; it goes through
//! the [`Decoder`] trait so the expensive file I/O and decompression can be
//! swapped out (and mocked in tests). [`PngFileDecoder`] is the production
//! implementation, built on the `image` crate.

use crate::tile::PixelBuffer;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while decoding a tile image.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be read or its contents could not be decoded.
    #[error("failed to decode tile image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Decodes a tile image file into an owned pixel buffer.
///
/// Implementations run on arbitrary worker-pool threads and must be
/// `Send + Sync`. They report dimensions and channel count through the
/// returned [`PixelBuffer`]; a failure is an ordinary error, never a panic,
/// since missing or corrupt tiles are expected in real datasets.
pub trait Decoder: Send + Sync {
    /// Decode the image at `path`.
    fn decode(&self, path: &Path) -> Result<PixelBuffer, DecodeError>;
}

/// Production decoder reading PNG (or any `image`-supported) files.
///
/// Images are flipped vertically on load: tile images are stored top-row
/// first, while the texture atlas is addressed bottom-up in GL convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngFileDecoder;

impl PngFileDecoder {
    /// Create a new file decoder.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for PngFileDecoder {
    fn decode(&self, path: &Path) -> Result<PixelBuffer, DecodeError> {
        let image = image::open(path).map_err(|source| DecodeError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let image = image.flipv();
        let width = image.width();
        let height = image.height();
        let channels = image.color().channel_count();
        Ok(PixelBuffer::new(image.into_bytes(), width, height, channels))
    }
}
