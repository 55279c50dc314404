//! # Orientation Correction
//!
//! Cameras record how the sensor was held in an EXIF orientation tag instead of
//! rotating the pixels. The pipeline strips all metadata on re-encode, so the tag
//! has to be baked into the pixel buffer first.
//!
//! Strategies are tried in order until one yields an answer:
//!
//! 1.  **decoder**: the orientation reported by the image decoder itself. Covers
//!     all eight EXIF values, mirrors included.
//! 2.  **exif tag**: read tag `0x0112` straight from the container and map the
//!     pure rotations (3, 6, 8) to 180, 90 and 270 degrees.
//!
//! If none applies the image is used as-is. Orientation problems never fail the
//! pipeline.

use exif::{In, Reader, Tag};
use image::metadata::Orientation;
use image::DynamicImage;
use std::io::Cursor;

/// What the strategies get to look at.
pub struct Probe<'a> {
    /// The undecoded file bytes.
    pub bytes: &'a [u8],
    /// Orientation reported by the decoder, when it could read one.
    pub reported: Option<Orientation>,
}

type Strategy = fn(&Probe<'_>) -> Option<Orientation>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("decoder", from_decoder as Strategy),
    ("exif tag", from_exif_tag as Strategy),
];

fn from_decoder(probe: &Probe<'_>) -> Option<Orientation> {
    // Decoders without metadata support report NoTransforms too.
    probe.reported.filter(|o| *o != Orientation::NoTransforms)
}

fn from_exif_tag(probe: &Probe<'_>) -> Option<Orientation> {
    match exif_orientation_tag(probe.bytes)? {
        3 => Some(Orientation::Rotate180),
        6 => Some(Orientation::Rotate90),
        8 => Some(Orientation::Rotate270),
        _ => None,
    }
}

/// Reads the raw EXIF orientation value (1-8) from an encoded image, if any.
pub fn exif_orientation_tag(bytes: &[u8]) -> Option<u32> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    exif.get_field(Tag::Orientation, In::PRIMARY)?
        .value
        .get_uint(0)
}

/// Runs the strategies in order and returns the first transform found.
pub fn resolve(probe: &Probe<'_>) -> Option<Orientation> {
    for (name, strategy) in STRATEGIES {
        if let Some(orientation) = strategy(probe) {
            log::debug!("Orientation {:?} resolved by {} strategy", orientation, name);
            return Some(orientation);
        }
    }
    None
}

/// Rotates/flips `img` in place so that it displays upright without metadata.
pub fn correct(img: &mut DynamicImage, probe: &Probe<'_>) {
    if let Some(orientation) = resolve(probe) {
        img.apply_orientation(orientation);
    }
}
