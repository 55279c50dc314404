//! Fixtures shared by the workspace integration tests.

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)
        .unwrap_or_else(|e| panic!("fixture encode failed: {e}"));
    buf.into_inner()
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

/// A solid-color PNG of the given size, as a data URL.
pub fn png_data_url(width: u32, height: u32) -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40])));
    data_url("image/png", &encode(&img, ImageFormat::Png))
}

/// A fully transparent PNG, as a data URL.
pub fn transparent_png_data_url(width: u32, height: u32) -> String {
    let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
    data_url("image/png", &encode(&img, ImageFormat::Png))
}

/// Decodes the payload of a data URL back into raw bytes.
pub fn payload_bytes(url: &str) -> Vec<u8> {
    let (_, payload) = url
        .split_once(',')
        .unwrap_or_else(|| panic!("not a data URL: {url}"));
    general_purpose::STANDARD
        .decode(payload)
        .unwrap_or_else(|e| panic!("bad base64: {e}"))
}

pub fn decode(url: &str) -> DynamicImage {
    image::load_from_memory(&payload_bytes(url)).unwrap_or_else(|e| panic!("bad image: {e}"))
}
