use std::io::Cursor;

use anyhow::*;
use image::{DynamicImage, GenericImageView, ImageFormat, imageops::FilterType};

use crate::{
    config::ResizeFit,
    data_structures::texture::{PNG_MIME_TYPE, TextureImage},
};

/// Decode `bytes` (any format the image crate knows), resize the result to
/// `size`×`size` and re-encode it as PNG.
///
/// # Arguments
///
/// * `bytes` represent raw image file data (PNG, JPEG, etc.)
/// * `name` is kept as the texture's name inside the model
/// * `size` is the side length of the square output in pixels
/// * `fit` decides whether the aspect ratio is ignored or cropped to
pub fn resize_encoded(bytes: &[u8], name: &str, size: u32, fit: ResizeFit) -> Result<TextureImage> {
    ensure!(size > 0, "texture size must be positive");
    let img = image::load_from_memory(bytes)?;
    log::debug!("decoded {name}: {:?}", img.dimensions());

    let resized = match fit {
        ResizeFit::Stretch => img.resize_exact(size, size, FilterType::Lanczos3),
        ResizeFit::Cover => img.resize_to_fill(size, size, FilterType::Lanczos3),
    };
    // PNG has no float channels
    let is_float = matches!(
        resized,
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)
    );
    let resized = if is_float {
        DynamicImage::ImageRgba8(resized.to_rgba8())
    } else {
        resized
    };

    let (width, height) = resized.dimensions();
    let mut encoded = Cursor::new(Vec::new());
    resized.write_to(&mut encoded, ImageFormat::Png)?;

    Ok(TextureImage {
        name: name.to_string(),
        bytes: encoded.into_inner(),
        mime_type: PNG_MIME_TYPE.to_string(),
        width,
        height,
    })
}
