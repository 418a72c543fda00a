use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat};

pub const PREVIEW_SIZE: u32 = 200;

/// Encodes a bounded PNG thumbnail of `image` as a `data:` URI for inline display.
pub fn preview_data_uri(image: &DynamicImage) -> Result<String, image::ImageError> {
    let thumbnail = image.thumbnail(PREVIEW_SIZE, PREVIEW_SIZE);
    let mut png = Cursor::new(Vec::new());
    thumbnail.write_to(&mut png, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png.into_inner())
    ))
}
