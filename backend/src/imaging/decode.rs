use std::io::Cursor;

use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use log::debug;

use super::Rotation;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Upload is not a recognizable image")]
    UnknownFormat,
    #[error("Unsupported image format {0:?}; upload a JPEG or PNG")]
    UnsupportedFormat(ImageFormat),
    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

pub const ACCEPTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

/// An upload decoded and turned upright.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
    pub rotation: Rotation,
}

/// Decodes an uploaded JPEG or PNG and applies the rotation its EXIF
/// orientation asks for. Missing or unreadable metadata leaves the pixels
/// as decoded.
pub fn fix_rotation(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader.format().ok_or(DecodeError::UnknownFormat)?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(DecodeError::UnsupportedFormat(format));
    }

    let mut decoder = reader.into_decoder()?;
    let rotation = match decoder.exif_metadata() {
        Ok(Some(exif)) => Rotation::from_exif_chunk(&exif),
        Ok(None) => Rotation::None,
        Err(e) => {
            debug!("Ignoring unreadable EXIF block: {}", e);
            Rotation::None
        }
    };

    let image = DynamicImage::from_decoder(decoder)?;
    if rotation != Rotation::None {
        debug!("Rotating image {} degrees", rotation.degrees());
    }

    Ok(DecodedImage {
        image: rotation.apply(image),
        format,
        rotation,
    })
}
