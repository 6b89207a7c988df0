//! Image file decoding and encoding via the `image` crate.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageReader};
use log::debug;

use crate::schema::Image;

/// Image file errors.
#[derive(Debug, thiserror::Error)]
pub enum ImageFileError {
    #[error("Failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to encode image {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Image {width}x{height} is too large to encode")]
    TooLarge { width: usize, height: usize },
}

/// Load an image file as 8-bit grayscale.
///
/// Color images are converted to luma; the returned image remembers `path`.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, ImageFileError> {
    let path = path.as_ref();
    let decoded = ImageReader::open(path)
        .map_err(|source| ImageFileError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| ImageFileError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| ImageFileError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let luma = decoded.into_luma8();
    let (width, height) = luma.dimensions();
    debug!("Loaded {} ({}x{})", path.display(), width, height);

    Ok(Image::from_raw(width as usize, height as usize, luma.into_raw()).with_source(path))
}

/// Load every image in `paths`, in order.
pub fn load_images<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Image>, ImageFileError> {
    paths.iter().map(load_image).collect()
}

/// Save a grayscale image. The format is inferred from the extension.
pub fn save_image<P: AsRef<Path>>(image: &Image, path: P) -> Result<(), ImageFileError> {
    let path = path.as_ref();
    let too_large = || ImageFileError::TooLarge {
        width: image.width(),
        height: image.height(),
    };
    let width = u32::try_from(image.width()).map_err(|_| too_large())?;
    let height = u32::try_from(image.height()).map_err(|_| too_large())?;

    let buffer =
        GrayImage::from_raw(width, height, image.pixels().to_vec()).ok_or_else(too_large)?;
    buffer.save(path).map_err(|source| ImageFileError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Saved {} ({}x{})", path.display(), width, height);
    Ok(())
}
