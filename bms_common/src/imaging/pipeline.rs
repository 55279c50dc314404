//! # Image Normalization Pipeline
//!
//! Turns a possibly malformed, oversized or mis-oriented embedded image into a
//! bounded, upright, opaque JPEG data URL:
//!
//! 1.  shape check (`data:image...,<payload>`)
//! 2.  base64 decode
//! 3.  image decode, refused above [`DEFAULT_MAX_PIXELS`] before any pixel
//!     buffer is allocated
//! 4.  orientation correction (see [`super::orientation`])
//! 5.  alpha flattened onto white, everything else converted to RGB8
//! 6.  downscale into the bounding box, never upscale
//! 7.  JPEG re-encode at the requested quality, no metadata
//! 8.  re-embed as `data:image/jpeg;base64,...`
//!
//! `normalize` is fail-open: any failure returns the input untouched. Callers that
//! need to know why use `try_normalize`, whose error separates inputs that were
//! never valid images from failures of the pipeline itself.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::metadata::Orientation;
use image::error::{LimitError, LimitErrorKind};
use image::{DynamicImage, ImageDecoder, ImageError, ImageReader, ImageResult, Limits, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use thiserror::Error;

use super::data_url::{self, DataUrl};
use super::orientation::{self, Probe};

/// Largest source image accepted for decoding, in pixels (about 89 Mpx).
pub const DEFAULT_MAX_PIXELS: u64 = 89_478_485;

/// Bounding box, JPEG quality and decode cap for [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Maximum output width in pixels.
    pub max_width: u32,
    /// Maximum output height in pixels.
    pub max_height: u32,
    /// JPEG quality, 1-100. Out-of-range values are clamped.
    pub quality: u8,
    /// Sources with more pixels than this are rejected undecoded.
    pub max_pixels: u64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_width: 1200,
            max_height: 1200,
            quality: 85,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl NormalizeOptions {
    pub fn new(max_width: u32, max_height: u32, quality: u8) -> Self {
        Self {
            max_width,
            max_height,
            quality,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }

    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }
}

/// Why an input could not be normalized.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("input is not an image data URL")]
    NotDataUrl,
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is empty")]
    EmptyPayload,
    #[error("payload is not a decodable image: {0}")]
    Decode(#[source] ImageError),
    #[error("failed to encode normalized image: {0}")]
    Encode(#[source] ImageError),
}

impl NormalizeError {
    /// `true` when the input itself was unusable, `false` when the pipeline
    /// failed on an input it had already decoded.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, NormalizeError::Encode(_))
    }
}

/// # Normalize
///
/// Fail-open entry point: returns the normalized data URL, or `input` unchanged
/// if any step fails.
pub fn normalize(input: &str, options: &NormalizeOptions) -> String {
    match try_normalize(input, options) {
        Ok(output) => output,
        Err(e) if e.is_rejection() => {
            log::debug!("Image left as submitted: {}", e);
            input.to_string()
        }
        Err(e) => {
            log::warn!("Image normalization failed, storing original: {}", e);
            input.to_string()
        }
    }
}

/// [`normalize`] for a JSON field. Anything but a string passes through.
pub fn normalize_value(value: &Value, options: &NormalizeOptions) -> Value {
    match value {
        Value::String(s) => Value::String(normalize(s, options)),
        other => other.clone(),
    }
}

/// Runs the full pipeline and reports the first failure.
pub fn try_normalize(input: &str, options: &NormalizeOptions) -> Result<String, NormalizeError> {
    let url = DataUrl::parse(input).ok_or(NormalizeError::NotDataUrl)?;
    let bytes = url.decode()?;
    if bytes.is_empty() {
        return Err(NormalizeError::EmptyPayload);
    }

    let (mut img, reported) = decode(&bytes, options.max_pixels).map_err(NormalizeError::Decode)?;
    orientation::correct(
        &mut img,
        &Probe {
            bytes: &bytes,
            reported,
        },
    );

    let rgb = flatten(img);
    let rgb = downscale(rgb, options.max_width.max(1), options.max_height.max(1));

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(
        &mut jpeg,
        options.quality.clamp(1, 100),
    ))
    .map_err(NormalizeError::Encode)?;

    Ok(data_url::embed_jpeg(&jpeg))
}

fn decode(bytes: &[u8], max_pixels: u64) -> ImageResult<(DynamicImage, Option<Orientation>)> {
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    // One 8-bit RGBA buffer at the pixel cap.
    let mut limits = Limits::default();
    limits.max_alloc = Some(max_pixels.saturating_mul(4));
    reader.limits(limits);

    let mut decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();
    if u64::from(width) * u64::from(height) > max_pixels {
        return Err(ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError)));
    }
    let reported = decoder.orientation().ok();
    let img = DynamicImage::from_decoder(decoder)?;
    Ok((img, reported))
}

/// Composites alpha onto opaque white; other modes are converted to RGB8.
fn flatten(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }
    let rgba = img.into_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        let a = u16::from(a);
        let over_white = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        *dst = Rgb([over_white(r), over_white(g), over_white(b)]);
    }
    out
}

/// Largest size with the same aspect ratio that fits the box. Never grows.
pub(crate) fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let scale = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    );
    let w = ((f64::from(width) * scale).round() as u32).clamp(1, max_width);
    let h = ((f64::from(height) * scale).round() as u32).clamp(1, max_height);
    (w, h)
}

fn downscale(rgb: RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (w, h) = fit_within(rgb.width(), rgb.height(), max_width, max_height);
    if (w, h) == rgb.dimensions() {
        return rgb;
    }
    imageops::resize(&rgb, w, h, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::orientation::tests::jpeg_with_orientation;
    use base64::{engine::general_purpose, Engine as _};
    use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};

    fn png_url(img: &DynamicImage) -> String {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(buf.into_inner()))
    }

    fn output_bytes(output: &str) -> Vec<u8> {
        let payload = output
            .strip_prefix("data:image/jpeg;base64,")
            .expect("canonical header");
        general_purpose::STANDARD.decode(payload).unwrap()
    }

    fn output_image(output: &str) -> DynamicImage {
        image::load_from_memory_with_format(&output_bytes(output), ImageFormat::Jpeg).unwrap()
    }

    fn opts(w: u32, h: u32) -> NormalizeOptions {
        NormalizeOptions::new(w, h, 80)
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(normalize("not-a-data-url", &opts(100, 100)), "not-a-data-url");
    }

    #[test]
    fn malformed_inputs_pass_through_unchanged() {
        let corrupt = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(b"definitely not pixels")
        );
        for input in [
            "",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png;base64",
            "data:image/png;base64,@@not base64@@",
            "data:image/png;base64,",
            corrupt.as_str(),
        ] {
            assert_eq!(normalize(input, &opts(100, 100)), input);
        }
    }

    #[test]
    fn errors_are_classified() {
        let o = opts(10, 10);
        assert!(matches!(try_normalize("x", &o), Err(NormalizeError::NotDataUrl)));
        assert!(matches!(
            try_normalize("data:image/png;base64,!!!", &o),
            Err(NormalizeError::Base64(_))
        ));
        assert!(matches!(
            try_normalize("data:image/png;base64,", &o),
            Err(NormalizeError::EmptyPayload)
        ));
        let err = try_normalize("data:image/png;base64,AAAAAAAA", &o).unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(_)));
        assert!(err.is_rejection());
    }

    #[test]
    fn non_string_json_passes_through() {
        let o = opts(10, 10);
        for v in [Value::Null, serde_json::json!(12), serde_json::json!({"a": 1})] {
            assert_eq!(normalize_value(&v, &o), v);
        }
        let s = Value::String("plain".into());
        assert_eq!(normalize_value(&s, &o), s);
    }

    #[test]
    fn downscales_preserving_aspect_ratio() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2000, 1000, Rgb([10, 200, 30])));
        let out = normalize(&png_url(&img), &opts(100, 100));
        assert!(out.starts_with("data:image/jpeg;base64,"));
        assert_eq!(output_image(&out).dimensions(), (100, 50));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([0, 0, 0])));
        let out = normalize(&png_url(&img), &NormalizeOptions::default());
        assert_eq!(output_image(&out).dimensions(), (40, 30));
    }

    #[test]
    fn normalizing_twice_keeps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 120, Rgb([90, 90, 90])));
        let once = normalize(&png_url(&img), &opts(150, 150));
        let twice = normalize(&once, &opts(150, 150));
        assert_eq!(output_image(&once).dimensions(), (150, 60));
        assert_eq!(output_image(&twice).dimensions(), (150, 60));
    }

    #[test]
    fn transparency_is_flattened_onto_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 0])));
        let out = output_image(&normalize(&png_url(&img), &opts(100, 100)));
        assert!(!out.color().has_alpha());
        let px = out.to_rgb8().get_pixel(8, 8).0;
        assert!(px.iter().all(|c| *c > 235), "expected white, got {:?}", px);
    }

    #[test]
    fn opaque_pixels_survive_flattening() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255])));
        let out = output_image(&normalize(&png_url(&img), &opts(100, 100)));
        let px = out.to_rgb8().get_pixel(8, 8).0;
        assert!(px.iter().all(|c| *c < 20), "expected black, got {:?}", px);
    }

    #[test]
    fn grayscale_is_converted() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(20, 10, image::Luma([128])));
        let out = normalize(&png_url(&img), &opts(100, 100));
        assert_eq!(output_image(&out).dimensions(), (20, 10));
    }

    #[test]
    fn exif_rotation_is_applied_and_stripped() {
        let jpeg = jpeg_with_orientation(40, 20, 6);
        let input = format!("data:image/jpeg;base64,{}", general_purpose::STANDARD.encode(&jpeg));

        let out = normalize(&input, &NormalizeOptions::default());
        assert_eq!(output_image(&out).dimensions(), (20, 40));
        assert_eq!(orientation::exif_orientation_tag(&output_bytes(&out)), None);

        let again = normalize(&out, &NormalizeOptions::default());
        assert_eq!(output_image(&again).dimensions(), (20, 40));
    }

    #[test]
    fn quality_is_clamped() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])));
        let out = try_normalize(&png_url(&img), &NormalizeOptions::new(100, 100, 0)).unwrap();
        assert_eq!(output_image(&out).dimensions(), (8, 8));
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in data {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        let start = out.len();
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        let crc = crc32(&out[start..]);
        out.extend_from_slice(&crc.to_be_bytes());
    }

    /// A few hundred bytes claiming a `width` x `height` grayscale image.
    fn png_claiming(width: u32, height: u32) -> String {
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.extend_from_slice(&[8, 0, 0, 0, 0]);
        png_chunk(&mut png, b"IHDR", &ihdr);
        png_chunk(&mut png, b"IDAT", &[0x78, 0x9c, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
        png_chunk(&mut png, b"IEND", &[]);
        format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png))
    }

    #[test]
    fn oversized_sources_are_refused_before_decoding() {
        let bomb = png_claiming(20_000, 20_000);
        let err = try_normalize(&bomb, &NormalizeOptions::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(ImageError::Limits(_))), "{err:?}");
        assert!(err.is_rejection());
        assert_eq!(normalize(&bomb, &NormalizeOptions::default()), bomb);
    }

    #[test]
    fn pixel_cap_counts_area() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(2000, 1));
        let options = opts(100, 100).with_max_pixels(1000);
        let err = try_normalize(&png_url(&img), &options).unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(ImageError::Limits(_))), "{err:?}");
    }

    #[test]
    fn fit_within_box() {
        assert_eq!(fit_within(2000, 1000, 100, 100), (100, 50));
        assert_eq!(fit_within(1000, 2000, 100, 100), (50, 100));
        assert_eq!(fit_within(50, 50, 100, 100), (50, 50));
        assert_eq!(fit_within(10_000, 1, 100, 100), (100, 1));
    }
}
