use base64::{engine::general_purpose, Engine as _};

/// Every accepted input starts with this.
pub const DATA_URL_PREFIX: &str = "data:image";
/// Header of every normalized output.
pub const CANONICAL_HEADER: &str = "data:image/jpeg;base64";

/// # Data URL
///
/// A borrowed view of an embedded image split at the first comma into its
/// media-type header and base64 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    header: &'a str,
    payload: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Returns `None` unless `input` starts with `data:image` and contains a comma.
    pub fn parse(input: &'a str) -> Option<Self> {
        if !input.starts_with(DATA_URL_PREFIX) {
            return None;
        }
        let (header, payload) = input.split_once(',')?;
        Some(Self { header, payload })
    }

    /// Everything before the first comma, e.g. `data:image/png;base64`.
    pub fn header(&self) -> &'a str {
        self.header
    }

    /// The raw base64 text after the first comma.
    pub fn payload(&self) -> &'a str {
        self.payload
    }

    /// Decodes the payload. Surrounding whitespace is ignored.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(self.payload.trim())
    }
}

/// Embeds JPEG bytes under the canonical header.
pub fn embed_jpeg(jpeg: &[u8]) -> String {
    format!("{},{}", CANONICAL_HEADER, general_purpose::STANDARD.encode(jpeg))
}
