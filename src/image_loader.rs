//! # Image Sources
//!
//! Report images arrive inline: a `data:image/...;base64,` URL or bare
//! base64. Layout never touches the filesystem, so there are no path sources.
//!
//! JPEG bytes pass through untouched (PDF reads DCT natively); only the frame
//! header is inspected for size and component count. PNG is decoded to RGB
//! plus an optional alpha plane for the soft mask.

use std::io::Cursor;

use base64::Engine;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("malformed data URL: {0}")]
    DataUrl(&'static str),
    #[error("base64: {0}")]
    Base64(String),
    #[error("unsupported image format (expected JPEG or PNG)")]
    UnsupportedFormat,
    #[error("decode: {0}")]
    Decode(String),
}

/// Decoded image, ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

impl LoadedImage {
    /// Height over width. 1.0 for degenerate images.
    pub fn aspect(&self) -> f64 {
        if self.width_px == 0 {
            1.0
        } else {
            self.height_px as f64 / self.width_px as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixelData {
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    Decoded {
        /// `width * height * 3` bytes.
        rgb: Vec<u8>,
        /// `width * height` bytes, `None` when fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

impl JpegColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            JpegColorSpace::DeviceRGB => "DeviceRGB",
            JpegColorSpace::DeviceGray => "DeviceGray",
        }
    }
}

/// Whether `src` looks like inline image data rather than a data-store key.
pub fn is_inline_source(src: &str) -> bool {
    src.starts_with("data:") || src.len() > 64
}

/// Load an image from a data URL or raw base64.
pub fn load_image(src: &str) -> Result<LoadedImage, ImageError> {
    let bytes = source_bytes(src.trim())?;
    decode_image_bytes(&bytes)
}

fn source_bytes(src: &str) -> Result<Vec<u8>, ImageError> {
    let payload = match src.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or(ImageError::DataUrl("missing `,`"))?;
            if !header.ends_with(";base64") {
                return Err(ImageError::DataUrl("only base64 payloads are supported"));
            }
            data
        }
        None => src,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| ImageError::Base64(e.to_string()))
}

fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, ImageError> {
    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) {
        decode_png(data)
    } else {
        Err(ImageError::UnsupportedFormat)
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 8 && data[..8] == [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
}

fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, ImageError> {
    let (width, height) = image::io::Reader::with_format(Cursor::new(data), image::ImageFormat::Jpeg)
        .into_dimensions()
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Component count from the first SOF segment.
fn jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2;
    while i + 3 < data.len() && data[i] == 0xFF {
        let marker = data[i + 1];
        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            return match data.get(i + 9) {
                Some(1) => JpegColorSpace::DeviceGray,
                _ => JpegColorSpace::DeviceRGB,
            };
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + len;
    }
    JpegColorSpace::DeviceRGB
}

fn decode_png(data: &[u8]) -> Result<LoadedImage, ImageError> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixels = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for px in rgba.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }
    let opaque = alpha.iter().all(|&a| a == 255);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: (!opaque).then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A `w × h` PNG as a data URL.
    pub(crate) fn png_data_url(w: u32, h: u32, alpha: u8) -> String {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 0, 0, alpha]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), w, h, image::ColorType::Rgba8)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&buf)
        )
    }

    #[test]
    fn test_png_data_url() {
        let loaded = load_image(&png_data_url(4, 2, 255)).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (4, 2));
        assert_eq!(loaded.aspect(), 0.5);
        match loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(&rgb[..3], &[255, 0, 0]);
                assert!(alpha.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_png_alpha_kept() {
        let loaded = load_image(&png_data_url(1, 1, 128)).unwrap();
        match loaded.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => assert_eq!(alpha, Some(vec![128])),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_raw_base64_jpeg_passes_through() {
        let img = image::RgbImage::from_fn(2, 3, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 3, image::ColorType::Rgb8)
            .unwrap();
        let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);

        let loaded = load_image(&b64).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 3));
        match loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert_eq!(data, buf);
                assert_eq!(color_space, JpegColorSpace::DeviceRGB);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bad_sources() {
        assert_eq!(
            load_image("data:image/png;base64"),
            Err(ImageError::DataUrl("missing `,`"))
        );
        assert!(matches!(load_image("!!!"), Err(ImageError::Base64(_))));
        assert_eq!(load_image("AAAAAAAA"), Err(ImageError::UnsupportedFormat));
    }
}
