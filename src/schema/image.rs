//! Grayscale image buffer consumed and produced by filters.

use std::path::{Path, PathBuf};

/// Image construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("Pixel buffer holds {found} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        found: usize,
    },
}

/// 8-bit grayscale image, row-major, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    source: Option<PathBuf>,
}

impl Image {
    /// Create an image from a pixel buffer.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, ImageError> {
        let expected = width * height;
        if pixels.len() != expected {
            return Err(ImageError::BufferSize {
                width,
                height,
                expected,
                found: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            source: None,
        })
    }

    /// Wrap a buffer whose size the caller already guarantees.
    pub(crate) fn from_raw(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels,
            source: None,
        }
    }

    /// Create an image filled with a single value.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
            source: None,
        }
    }

    /// Remember the file this image was loaded from.
    pub fn with_source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source = Some(path.as_ref().to_path_buf());
        self
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the image has no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// Path the image was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Human readable label for log messages.
    pub fn label(&self) -> String {
        match self.source() {
            Some(path) => path.display().to_string(),
            None => format!("<{}x{} image>", self.width, self.height),
        }
    }

    /// Check whether both images have identical dimensions.
    pub fn same_size(&self, other: &Image) -> bool {
        self.width == other.width && self.height == other.height
    }
}
