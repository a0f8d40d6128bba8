//! Conversion between image containers and [`PixelBuffer`]s.
//!
//! Any format the `image` crate reads can serve as a cover; output is always
//! PNG because lossy recompression would destroy the embedded bits.

use std::io::Cursor;

use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat, ImageOutputFormat, RgbaImage};

use crate::codec::PixelBuffer;
use crate::config::Limits;
use crate::error::ImageError;

/// Reads the dimensions from the image header without decoding pixels.
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Load(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ImageError::Load(e.to_string()))
}

/// Decodes any supported container into RGBA8 pixels.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, ImageError> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| ImageError::Load(e.to_string()))?
        .to_rgba8();

    let (width, height) = rgba.dimensions();
    PixelBuffer::new(width, height, rgba.into_raw()).map_err(|e| ImageError::Load(e.to_string()))
}

/// Checks the pixel ceiling from the header, then decodes.
pub fn load(bytes: &[u8], limits: &Limits) -> Result<PixelBuffer, ImageError> {
    let (width, height) = read_dimensions(bytes)?;
    limits.check(width, height)?;
    decode_image(bytes)
}

/// Encodes pixels as a PNG byte stream.
pub fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>, ImageError> {
    let img = RgbaImage::from_raw(pixels.width(), pixels.height(), pixels.as_bytes().to_vec())
        .ok_or_else(|| ImageError::Encode("pixel buffer does not match its dimensions".into()))?;

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageOutputFormat::Png)
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    Ok(out.into_inner())
}

/// Whether the container is known to be lossy (JPEG).
pub fn is_lossy(bytes: &[u8]) -> bool {
    matches!(image::guess_format(bytes), Ok(ImageFormat::Jpeg))
}
