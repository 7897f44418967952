//! Format-specific encoders

use crate::OptimizeError;
use image::codecs::bmp::BmpEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::DynamicImage;
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Compress to JPEG using mozjpeg
///
/// mozjpeg reports libjpeg errors by unwinding, so the whole encode runs
/// under `catch_unwind`.
pub fn compress_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    let encoded = catch_unwind(AssertUnwindSafe(|| -> std::io::Result<Vec<u8>> {
        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        comp.finish()
    }));

    match encoded {
        Ok(Ok(data)) => Ok(data),
        Ok(Err(e)) => Err(OptimizeError::Encode(format!("mozjpeg: {}", e))),
        Err(_) => Err(OptimizeError::Encode("mozjpeg aborted".to_string())),
    }
}

/// Compress to PNG with the slowest, smallest settings
pub fn compress_png(img: &DynamicImage) -> Result<Vec<u8>, OptimizeError> {
    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(buffer)
}

/// Re-encode as BMP. The encoder only takes 8-bit grey or RGB(A) input.
pub fn compress_bmp(img: &DynamicImage) -> Result<Vec<u8>, OptimizeError> {
    let normalized = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    let mut buffer = Vec::new();
    let encoder = BmpEncoder::new(&mut buffer);
    normalized.write_with_encoder(encoder)?;
    Ok(buffer)
}

/// Re-encode as TIFF. Tags beyond the image structure are not carried over.
pub fn compress_tiff(img: &DynamicImage) -> Result<Vec<u8>, OptimizeError> {
    let mut cursor = Cursor::new(Vec::new());
    let encoder = TiffEncoder::new(&mut cursor);
    img.write_with_encoder(encoder)?;
    Ok(cursor.into_inner())
}
