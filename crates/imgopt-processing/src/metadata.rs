//! Carrying EXIF, ICC and other application segments (XMP, IPTC) from a source
//! image onto its re-encoded output

use crate::OptimizeError;
use img_parts::jpeg::{markers, Jpeg, JpegSegment};
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF, ImageICC};

/// Embedded metadata lifted from a source image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedMetadata {
    pub exif: Option<Bytes>,
    pub icc_profile: Option<Bytes>,
    /// JPEG APP1..APP15 segments other than EXIF and ICC, as `(marker, contents)`.
    pub app_segments: Vec<(u8, Bytes)>,
}

impl EmbeddedMetadata {
    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.icc_profile.is_none() && self.app_segments.is_empty()
    }
}

const EXIF_PREFIX: &[u8] = b"Exif\0\0";
const ICC_PREFIX: &[u8] = b"ICC_PROFILE\0";

fn is_app_marker(marker: u8) -> bool {
    (markers::APP0..=markers::APP15).contains(&marker)
}

/// APPn segments the `ImageEXIF`/`ImageICC` accessors do not cover. APP0
/// (JFIF) is left to the encoder.
fn extra_app_segments(jpeg: &Jpeg) -> Vec<(u8, Bytes)> {
    jpeg.segments()
        .iter()
        .filter(|segment| {
            let marker = segment.marker();
            let contents = segment.contents();
            is_app_marker(marker)
                && marker != markers::APP0
                && !(marker == markers::APP1 && contents.starts_with(EXIF_PREFIX))
                && !(marker == markers::APP2 && contents.starts_with(ICC_PREFIX))
        })
        .map(|segment| (segment.marker(), segment.contents().clone()))
        .collect()
}

pub fn read_jpeg(data: &[u8]) -> Result<EmbeddedMetadata, OptimizeError> {
    let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(data))
        .map_err(|e| OptimizeError::Metadata(e.to_string()))?;
    Ok(EmbeddedMetadata {
        exif: jpeg.exif(),
        icc_profile: jpeg.icc_profile(),
        app_segments: extra_app_segments(&jpeg),
    })
}

pub fn read_png(data: &[u8]) -> Result<EmbeddedMetadata, OptimizeError> {
    let png = Png::from_bytes(Bytes::copy_from_slice(data))
        .map_err(|e| OptimizeError::Metadata(e.to_string()))?;
    Ok(EmbeddedMetadata {
        exif: png.exif(),
        icc_profile: png.icc_profile(),
        app_segments: Vec::new(),
    })
}

pub fn write_jpeg(data: Vec<u8>, metadata: &EmbeddedMetadata) -> Result<Vec<u8>, OptimizeError> {
    if metadata.is_empty() {
        return Ok(data);
    }
    let mut jpeg =
        Jpeg::from_bytes(Bytes::from(data)).map_err(|e| OptimizeError::Metadata(e.to_string()))?;
    jpeg.set_exif(metadata.exif.clone());
    jpeg.set_icc_profile(metadata.icc_profile.clone());

    let segments = jpeg.segments_mut();
    let mut at = segments
        .iter()
        .rposition(|segment| is_app_marker(segment.marker()))
        .map(|i| i + 1)
        .unwrap_or(0);
    for (marker, contents) in &metadata.app_segments {
        segments.insert(at, JpegSegment::new_with_contents(*marker, contents.clone()));
        at += 1;
    }

    Ok(jpeg.encoder().bytes().to_vec())
}

pub fn write_png(data: Vec<u8>, metadata: &EmbeddedMetadata) -> Result<Vec<u8>, OptimizeError> {
    if metadata.is_empty() {
        return Ok(data);
    }
    let mut png =
        Png::from_bytes(Bytes::from(data)).map_err(|e| OptimizeError::Metadata(e.to_string()))?;
    png.set_exif(metadata.exif.clone());
    png.set_icc_profile(metadata.icc_profile.clone());
    Ok(png.encoder().bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    const XMP: &[u8] = b"http://ns.adobe.com/xap/1.0/\0<x:xmpmeta/>";
    const IPTC: &[u8] = b"Photoshop 3.0\08BIM\x04\x04\0\0\0\0\0\0";

    fn jpeg_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, Rgb([200, 120, 40]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        buffer
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_png_metadata_transfer() {
        let exif = Bytes::from_static(b"MM\x00\x2a\x00\x00\x00\x08\x00\x00");
        let source = write_png(
            png_bytes(),
            &EmbeddedMetadata {
                exif: Some(exif.clone()),
                icc_profile: None,
                app_segments: Vec::new(),
            },
        )
        .unwrap();

        let lifted = read_png(&source).unwrap();
        assert_eq!(lifted.exif, Some(exif.clone()));

        let target = write_png(png_bytes(), &lifted).unwrap();
        assert_eq!(read_png(&target).unwrap().exif, Some(exif));
    }

    #[test]
    fn test_jpeg_xmp_and_iptc_transfer() {
        let exif = Bytes::from_static(b"MM\x00\x2a\x00\x00\x00\x08\x00\x00");
        let source = write_jpeg(
            jpeg_bytes(),
            &EmbeddedMetadata {
                exif: Some(exif.clone()),
                icc_profile: None,
                app_segments: vec![
                    (markers::APP1, Bytes::from_static(XMP)),
                    (markers::APP13, Bytes::from_static(IPTC)),
                ],
            },
        )
        .unwrap();

        let lifted = read_jpeg(&source).unwrap();
        assert_eq!(lifted.exif, Some(exif.clone()));
        assert_eq!(
            lifted.app_segments,
            vec![
                (markers::APP1, Bytes::from_static(XMP)),
                (markers::APP13, Bytes::from_static(IPTC)),
            ]
        );

        let target = write_jpeg(jpeg_bytes(), &lifted).unwrap();
        let carried = read_jpeg(&target).unwrap();
        assert_eq!(carried, lifted);
        image::load_from_memory_with_format(&target, ImageFormat::Jpeg).unwrap();
    }

    #[test]
    fn test_empty_metadata_leaves_bytes_alone() {
        let data = png_bytes();
        let out = write_png(data.clone(), &EmbeddedMetadata::default()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_read_rejects_wrong_container() {
        assert!(matches!(
            read_jpeg(&png_bytes()),
            Err(OptimizeError::Metadata(_))
        ));
    }
}
