//! Default image optimizer

use crate::compression::{compress_bmp, compress_jpeg, compress_png, compress_tiff};
use crate::metadata::{read_jpeg, read_png, write_jpeg, write_png};
use crate::{ImageOptimizer, OptimizeError};
use image::{DynamicImage, ImageFormat};

/// Re-encodes JPEG, PNG, BMP and TIFF images in their own format.
///
/// The output is never larger than the input: when re-encoding does not help,
/// the original bytes are returned unchanged.
#[derive(Debug, Clone)]
pub struct Optimizer {
    jpeg_quality: u8,
}

impl Optimizer {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn decode(data: &[u8], format: ImageFormat) -> Result<DynamicImage, OptimizeError> {
        image::load_from_memory_with_format(data, format)
            .map_err(|e| OptimizeError::Decode(e.to_string()))
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(80)
    }
}

impl ImageOptimizer for Optimizer {
    fn optimize(&self, data: &[u8], preserve_metadata: bool) -> Result<Vec<u8>, OptimizeError> {
        let format = image::guess_format(data)
            .map_err(|e| OptimizeError::UnsupportedFormat(e.to_string()))?;

        let optimized = match format {
            ImageFormat::Jpeg => {
                let img = Self::decode(data, format)?;
                let encoded = compress_jpeg(&img, self.jpeg_quality)?;
                if preserve_metadata {
                    write_jpeg(encoded, &read_jpeg(data)?)?
                } else {
                    encoded
                }
            }
            ImageFormat::Png => {
                let img = Self::decode(data, format)?;
                let encoded = compress_png(&img)?;
                if preserve_metadata {
                    write_png(encoded, &read_png(data)?)?
                } else {
                    encoded
                }
            }
            ImageFormat::Bmp => compress_bmp(&Self::decode(data, format)?)?,
            ImageFormat::Tiff => {
                // Still decode so corrupt input is reported rather than published.
                let img = Self::decode(data, format)?;
                if preserve_metadata {
                    data.to_vec()
                } else {
                    compress_tiff(&img)?
                }
            }
            other => {
                return Err(OptimizeError::UnsupportedFormat(format!("{:?}", other)));
            }
        };

        let input_size = data.len();
        let output_size = optimized.len();

        if output_size >= input_size {
            tracing::debug!(
                format = ?format,
                input_bytes = input_size,
                output_bytes = output_size,
                "Re-encoded image is not smaller, keeping original bytes"
            );
            return Ok(data.to_vec());
        }

        tracing::debug!(
            format = ?format,
            input_bytes = input_size,
            output_bytes = output_size,
            "Image optimized"
        );

        Ok(optimized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{read_jpeg, read_png, write_jpeg, write_png, EmbeddedMetadata};
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};
    use image::{Rgb, RgbImage};
    use img_parts::Bytes;
    use std::io::Cursor;

    fn photo() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(128, 96, |x, y| {
            Rgb([(x * 2) as u8, (y * 2) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn fast_png(img: &DynamicImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Fast, FilterType::NoFilter);
        img.write_with_encoder(encoder).unwrap();
        buffer
    }

    #[test]
    fn test_png_is_not_larger_and_pixels_survive() {
        let img = photo();
        let input = fast_png(&img);

        let output = Optimizer::default().optimize(&input, true).unwrap();

        assert!(output.len() <= input.len());
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn test_png_exif_preserved() {
        let exif = Bytes::from_static(b"MM\x00\x2a\x00\x00\x00\x08\x00\x00");
        let input = write_png(
            fast_png(&photo()),
            &EmbeddedMetadata {
                exif: Some(exif.clone()),
                icc_profile: None,
                app_segments: Vec::new(),
            },
        )
        .unwrap();

        let output = Optimizer::default().optimize(&input, true).unwrap();

        assert_eq!(read_png(&output).unwrap().exif, Some(exif));
    }

    #[test]
    fn test_jpeg_output_is_jpeg() {
        let input = encode(&photo(), ImageFormat::Jpeg);
        let output = Optimizer::new(80).optimize(&input, true).unwrap();

        assert!(output.len() <= input.len());
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_jpeg_xmp_preserved() {
        let xmp = Bytes::from_static(b"http://ns.adobe.com/xap/1.0/\0<x:xmpmeta/>");
        let input = write_jpeg(
            encode(&photo(), ImageFormat::Jpeg),
            &EmbeddedMetadata {
                app_segments: vec![(img_parts::jpeg::markers::APP1, xmp.clone())],
                ..EmbeddedMetadata::default()
            },
        )
        .unwrap();

        let output = Optimizer::default().optimize(&input, true).unwrap();

        let carried = read_jpeg(&output).unwrap();
        assert_eq!(
            carried.app_segments,
            vec![(img_parts::jpeg::markers::APP1, xmp)]
        );
    }

    #[test]
    fn test_bmp_never_grows() {
        let input = encode(&photo(), ImageFormat::Bmp);
        let output = Optimizer::default().optimize(&input, true).unwrap();

        assert!(output.len() <= input.len());
        let decoded = image::load_from_memory_with_format(&output, ImageFormat::Bmp).unwrap();
        assert_eq!(decoded.to_rgb8(), photo().to_rgb8());
    }

    #[test]
    fn test_tiff_passed_through_when_preserving() {
        let input = encode(&photo(), ImageFormat::Tiff);
        let output = Optimizer::default().optimize(&input, true).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = Optimizer::default().optimize(b"definitely not an image", true);
        assert!(matches!(result, Err(OptimizeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_truncated_image_is_decode_error() {
        let mut input = encode(&photo(), ImageFormat::Png);
        input.truncate(input.len() / 2);

        let result = Optimizer::default().optimize(&input, true);
        assert!(matches!(result, Err(OptimizeError::Decode(_))));
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(Optimizer::new(0).jpeg_quality, 1);
        assert_eq!(Optimizer::new(200).jpeg_quality, 100);
    }
}
