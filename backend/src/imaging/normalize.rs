use image::DynamicImage;
use image::imageops::FilterType;
use ndarray::Array4;

use crate::inference::INPUT_SHAPE;

pub const TARGET_SIZE: u32 = 150;
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Resizes to the model's 150x150 input and lays the pixels out as a
/// one-image NHWC batch of raw 0-255 values. Alpha and any other channel
/// past red, green and blue is dropped.
pub fn normalize(image: &DynamicImage) -> Array4<f32> {
    let rgb = image
        .resize_exact(TARGET_SIZE, TARGET_SIZE, RESIZE_FILTER)
        .to_rgb8();

    Array4::from_shape_fn(
        (INPUT_SHAPE[0], INPUT_SHAPE[1], INPUT_SHAPE[2], INPUT_SHAPE[3]),
        |(_, y, x, c)| f32::from(rgb.get_pixel(x as u32, y as u32)[c]),
    )
}
