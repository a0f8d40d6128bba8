//! LSB embedding of a length-prefixed payload into RGBA pixel data.
//!
//! Wire format:
//! ```text
//! LEN (u32, big-endian) | PAYLOAD (LEN bytes)
//! ```
//! Every byte is written most-significant bit first into the least significant
//! bit of the R, G and B channels of consecutive pixels. Alpha is never touched,
//! so each pixel carries three bits.

use crate::error::CodecError;

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;
/// Channels per pixel that carry payload bits (R, G, B).
pub const SLOTS_PER_PIXEL: usize = 3;
/// Length of the big-endian length prefix.
pub const LEN_PREFIX: usize = 4;

const HEADER_BITS: usize = LEN_PREFIX * 8;

/// Row-major RGBA8 pixels together with the image dimensions.
///
/// The byte length is always `width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw RGBA bytes, rejecting buffers that do not match the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CodecError> {
        if expected_len(width, height) != Some(data.len()) {
            return Err(CodecError::MalformedBuffer {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A `width` x `height` image where every pixel is `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; CHANNELS]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            data: rgba.repeat(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Largest payload, in bytes, this image can carry.
    pub fn capacity(&self) -> i64 {
        max_payload_len(self.width, self.height)
    }
}

fn expected_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS)
}

/// `floor(width * height * 3 / 8) - 4`.
///
/// Negative when the image cannot even hold the length prefix.
pub fn max_payload_len(width: u32, height: u32) -> i64 {
    let slots = u128::from(width) * u128::from(height) * SLOTS_PER_PIXEL as u128;
    (slots / 8) as i64 - LEN_PREFIX as i64
}

/// Byte offset of the `k`-th embedding slot: R, G, B of pixel 0, then pixel 1, ...
fn slot_offset(k: usize) -> usize {
    (k / SLOTS_PER_PIXEL) * CHANNELS + k % SLOTS_PER_PIXEL
}

fn bits_msb_first<'a>(bytes: impl Iterator<Item = &'a u8> + 'a) -> impl Iterator<Item = u8> + 'a {
    bytes.flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & 1))
}

/// Reads eight slots starting at `first_slot` as one byte, MSB first.
fn read_byte(data: &[u8], first_slot: usize) -> u8 {
    (first_slot..first_slot + 8).fold(0u8, |acc, k| (acc << 1) | (data[slot_offset(k)] & 1))
}

/// Embeds `payload` into a copy of `cover`.
///
/// Only bit 0 of the consumed R/G/B channels changes; every other byte of the
/// returned buffer equals the input.
///
/// # Errors
///
/// [`CodecError::CapacityExceeded`] if `payload` is longer than [`max_payload_len`].
pub fn encode(cover: &PixelBuffer, payload: &[u8]) -> Result<PixelBuffer, CodecError> {
    let max = cover.capacity();
    let exceeded = CodecError::CapacityExceeded {
        max,
        actual: payload.len(),
    };

    if i64::try_from(payload.len()).map_or(true, |len| len > max) {
        return Err(exceeded);
    }
    let length = u32::try_from(payload.len()).map_err(|_| exceeded)?;

    let header = length.to_be_bytes();
    let mut data = cover.data.clone();
    for (k, bit) in bits_msb_first(header.iter().chain(payload)).enumerate() {
        let i = slot_offset(k);
        data[i] = (data[i] & 0xFE) | bit;
    }

    Ok(PixelBuffer {
        width: cover.width,
        height: cover.height,
        data,
    })
}

/// Header plus payload bits for a `length`-byte message, in `u64` so a
/// hostile header cannot overflow `usize` on 32-bit targets.
fn bits_needed(length: u32) -> u64 {
    HEADER_BITS as u64 + u64::from(length) * 8
}

/// Recovers the payload hidden in `data`, an RGBA buffer of a `width` x `height` image.
///
/// # Errors
///
/// - [`CodecError::MalformedBuffer`] if `data` is not a whole number of pixels
/// - [`CodecError::NoHiddenMessage`] if the length header is zero or exceeds the capacity of the image
/// - [`CodecError::TruncatedData`] if `data` ends before the announced payload does
pub fn decode(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CodecError> {
    if data.len() % CHANNELS != 0 {
        return Err(CodecError::MalformedBuffer {
            len: data.len(),
            width,
            height,
        });
    }

    let max = max_payload_len(width, height);
    let available_bits = data.len() / CHANNELS * SLOTS_PER_PIXEL;

    if available_bits < HEADER_BITS {
        return Err(if max < 1 {
            CodecError::NoHiddenMessage { length: 0, max }
        } else {
            CodecError::TruncatedData {
                needed_bits: HEADER_BITS as u64,
                available_bits: available_bits as u64,
            }
        });
    }

    let mut header = [0u8; LEN_PREFIX];
    for (i, byte) in header.iter_mut().enumerate() {
        *byte = read_byte(data, i * 8);
    }
    let length = u32::from_be_bytes(header);

    if length == 0 || i64::from(length) > max {
        return Err(CodecError::NoHiddenMessage { length, max });
    }

    let needed_bits = bits_needed(length);
    if needed_bits > available_bits as u64 {
        return Err(CodecError::TruncatedData {
            needed_bits,
            available_bits: available_bits as u64,
        });
    }

    Ok((0..length as usize)
        .map(|i| read_byte(data, HEADER_BITS + i * 8))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic noisy cover so LSBs start out mixed.
    fn noisy(width: u32, height: u32) -> PixelBuffer {
        let mut state = 0x2545_f491_u32;
        let data = (0..width as usize * height as usize * CHANNELS)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        PixelBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn hello_in_ten_by_ten() {
        let cover = PixelBuffer::filled(10, 10, [200, 100, 50, 255]);
        assert_eq!(cover.as_bytes().len(), 400);
        assert_eq!(cover.capacity(), 33);

        let stego = encode(&cover, b"Hello").unwrap();
        let out = decode(stego.as_bytes(), 10, 10).unwrap();

        assert_eq!(out, vec![72, 101, 108, 108, 111]);
    }

    #[test]
    fn tiny_image_is_rejected() {
        let cover = PixelBuffer::filled(2, 2, [0, 0, 0, 255]);
        match encode(&cover, &[7u8; 100]) {
            Err(CodecError::CapacityExceeded { max, actual }) => {
                assert_eq!(max, -3);
                assert_eq!(actual, 100);
            }
            other => panic!("expected CapacityExceeded, got: {other:?}"),
        }
    }

    #[test]
    fn capacity_boundary() {
        let cover = noisy(16, 9);
        let max = cover.capacity() as usize;

        let fits: Vec<u8> = (0..max).map(|i| i as u8).collect();
        let stego = encode(&cover, &fits).unwrap();
        assert_eq!(decode(stego.as_bytes(), 16, 9).unwrap(), fits);

        let too_big = vec![1u8; max + 1];
        assert!(matches!(
            encode(&cover, &too_big),
            Err(CodecError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn capacity_uses_every_pixel() {
        // 16 pixels = 48 slots = exactly the header plus two bytes.
        let cover = noisy(4, 4);
        assert_eq!(cover.capacity(), 2);

        let stego = encode(&cover, &[0xA5, 0x3C]).unwrap();
        assert_eq!(decode(stego.as_bytes(), 4, 4).unwrap(), vec![0xA5, 0x3C]);
    }

    #[test]
    fn roundtrip_various_shapes() {
        for (w, h) in [(1, 40), (7, 3), (33, 17), (64, 64)] {
            let cover = noisy(w, h);
            let len = (cover.capacity() as usize).min(97);
            let msg: Vec<u8> = (0..len).map(|i| (i * 31 + 7) as u8).collect();

            let stego = encode(&cover, &msg).unwrap();
            assert_eq!(decode(stego.as_bytes(), w, h).unwrap(), msg, "{w}x{h}");
        }
    }

    #[test]
    fn only_rgb_lsbs_change() {
        let cover = noisy(20, 20);
        let stego = encode(&cover, b"attack at dawn").unwrap();

        assert_eq!(stego.width(), cover.width());
        assert_eq!(stego.height(), cover.height());
        assert_eq!(stego.as_bytes().len(), cover.as_bytes().len());

        for (i, (before, after)) in cover.as_bytes().iter().zip(stego.as_bytes()).enumerate() {
            if i % CHANNELS == 3 {
                assert_eq!(before, after, "alpha changed at byte {i}");
            } else {
                assert_eq!(before & 0xFE, after & 0xFE, "high bits changed at byte {i}");
            }
        }
    }

    #[test]
    fn trailing_pixels_untouched() {
        let cover = noisy(30, 30);
        let stego = encode(&cover, b"hi").unwrap();

        // (4 + 2) * 8 = 48 slots = 16 pixels
        let used = 16 * CHANNELS;
        assert_eq!(&cover.as_bytes()[used..], &stego.as_bytes()[used..]);
    }

    #[test]
    fn cover_is_not_mutated() {
        let cover = noisy(10, 10);
        let snapshot = cover.clone();
        let _ = encode(&cover, b"payload").unwrap();
        assert_eq!(cover, snapshot);
    }

    #[test]
    fn zero_length_header_means_no_message() {
        let cover = PixelBuffer::filled(10, 10, [0, 0, 0, 255]);
        match decode(cover.as_bytes(), 10, 10) {
            Err(CodecError::NoHiddenMessage { length, max }) => {
                assert_eq!(length, 0);
                assert_eq!(max, 33);
            }
            other => panic!("expected NoHiddenMessage, got: {other:?}"),
        }
    }

    #[test]
    fn oversized_header_means_no_message() {
        // all LSBs set: header reads 0xFFFFFFFF
        let cover = PixelBuffer::filled(10, 10, [1, 1, 1, 255]);
        assert!(matches!(
            decode(cover.as_bytes(), 10, 10),
            Err(CodecError::NoHiddenMessage {
                length: u32::MAX,
                ..
            })
        ));
    }

    #[test]
    fn empty_payload_reads_back_as_no_message() {
        let cover = noisy(10, 10);
        let stego = encode(&cover, &[]).unwrap();
        assert!(matches!(
            decode(stego.as_bytes(), 10, 10),
            Err(CodecError::NoHiddenMessage { length: 0, .. })
        ));
    }

    #[test]
    fn short_buffer_is_truncation_not_zero_fill() {
        let cover = noisy(10, 10);
        let stego = encode(&cover, &[9u8; 30]).unwrap();

        // keep header plus a few pixels only
        let cut = &stego.as_bytes()[..20 * CHANNELS];
        match decode(cut, 10, 10) {
            Err(CodecError::TruncatedData {
                needed_bits,
                available_bits,
            }) => {
                assert_eq!(needed_bits, (4 + 30) * 8);
                assert_eq!(available_bits, 60);
            }
            other => panic!("expected TruncatedData, got: {other:?}"),
        }
    }

    #[test]
    fn buffer_shorter_than_header_is_truncated() {
        let data = vec![0u8; 5 * CHANNELS];
        assert!(matches!(
            decode(&data, 10, 10),
            Err(CodecError::TruncatedData { needed_bits: 32, .. })
        ));
    }

    #[test]
    fn largest_header_needs_more_bits_than_usize32() {
        assert_eq!(bits_needed(30), (4 + 30) * 8);
        assert_eq!(bits_needed(u32::MAX), 34_359_738_392);
        assert!(bits_needed(u32::MAX) > u64::from(u32::MAX));
    }

    #[test]
    fn partial_pixel_is_malformed() {
        assert!(matches!(
            decode(&[0u8; 7], 1, 2),
            Err(CodecError::MalformedBuffer { len: 7, .. })
        ));
        assert!(PixelBuffer::new(3, 3, vec![0u8; 35]).is_err());
    }
}
