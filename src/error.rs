use std::fmt;

/// Failures of the LSB embedding layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Payload does not fit the cover image. `max` can be negative for tiny images.
    CapacityExceeded { max: i64, actual: usize },
    /// The length header is zero or larger than the image could ever hold.
    NoHiddenMessage { length: u32, max: i64 },
    /// The pixel data ends before the bits announced by the header.
    TruncatedData {
        needed_bits: u64,
        available_bits: u64,
    },
    /// Buffer length is not a whole number of RGBA pixels or disagrees with the dimensions.
    MalformedBuffer { len: usize, width: u32, height: u32 },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::CapacityExceeded { max, actual } => write!(
                f,
                "message too large: maximum size is {max} bytes, but the message is {actual} bytes"
            ),
            CodecError::NoHiddenMessage { length, max } => write!(
                f,
                "no valid hidden message found in this image (header claims {length} bytes, image holds at most {max})"
            ),
            CodecError::TruncatedData {
                needed_bits,
                available_bits,
            } => write!(
                f,
                "pixel data truncated: message needs {needed_bits} bits but only {available_bits} are present"
            ),
            CodecError::MalformedBuffer { len, width, height } => write!(
                f,
                "pixel buffer of {len} bytes does not match a {width}x{height} RGBA image"
            ),
        }
    }
}

impl std::error::Error for CodecError {}

/// Failures of password-based encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Tag verification failed: wrong password, tampered data, or data that was never encrypted.
    AuthenticationFailure,
    BlobTooShort { len: usize },
    RandomUnavailable,
    InvalidKdfParams(String),
    KeyDerivation(String),
    EncryptionFailed,
    /// The background task running the operation panicked or was cancelled.
    TaskFailed(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::AuthenticationFailure => write!(f, "Invalid password or corrupted data"),
            CryptoError::BlobTooShort { len } => {
                write!(f, "encrypted data too short ({len} bytes)")
            }
            CryptoError::RandomUnavailable => write!(f, "OS random generator unavailable"),
            CryptoError::InvalidKdfParams(msg) => write!(f, "invalid key derivation parameters: {msg}"),
            CryptoError::KeyDerivation(msg) => write!(f, "key derivation failed: {msg}"),
            CryptoError::EncryptionFailed => write!(f, "encryption failed"),
            CryptoError::TaskFailed(msg) => write!(f, "background crypto task failed: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Failures at the image container boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    Load(String),
    Encode(String),
    TooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Load(msg) => write!(f, "failed to load image: {msg}"),
            ImageError::Encode(msg) => write!(f, "failed to encode image: {msg}"),
            ImageError::TooLarge {
                width,
                height,
                max_pixels,
            } => write!(
                f,
                "image is too large ({width}x{height}); use an image with at most {max_pixels} pixels"
            ),
        }
    }
}

impl std::error::Error for ImageError {}

/// Any failure of the hide/reveal pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Codec(CodecError),
    Crypto(CryptoError),
    Image(ImageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Codec(e) => e.fmt(f),
            Error::Crypto(e) => e.fmt(f),
            Error::Image(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Codec(e) => Some(e),
            Error::Crypto(e) => Some(e),
            Error::Image(e) => Some(e),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        Error::Crypto(e)
    }
}

impl From<ImageError> for Error {
    fn from(e: ImageError) -> Self {
        Error::Image(e)
    }
}
