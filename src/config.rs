//! Runtime settings shared by the library facade and the binary.

use crate::error::ImageError;
use crate::format::BlobFormat;

/// Default pixel ceiling (about 4 megapixels).
pub const DEFAULT_MAX_PIXELS: u64 = 4_000_000;

/// Upper bound on the images accepted for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    max_pixels: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl Limits {
    pub fn new(max_pixels: u64) -> Self {
        Self { max_pixels }
    }

    /// No ceiling beyond the arithmetic capacity check.
    pub fn unbounded() -> Self {
        Self {
            max_pixels: u64::MAX,
        }
    }

    pub fn max_pixels(&self) -> u64 {
        self.max_pixels
    }

    /// # Errors
    ///
    /// [`ImageError::TooLarge`] if `width * height` exceeds the ceiling.
    pub fn check(&self, width: u32, height: u32) -> Result<(), ImageError> {
        if u64::from(width) * u64::from(height) > self.max_pixels {
            return Err(ImageError::TooLarge {
                width,
                height,
                max_pixels: self.max_pixels,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub limits: Limits,
    /// Layout of encrypted payloads produced by `hide`.
    pub format: BlobFormat,
}
