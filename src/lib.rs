pub mod codec;
pub mod config;
pub mod crypto;
mod error;
pub mod format;
pub mod fsio;
pub mod image_io;
pub mod telemetry;
pub mod worker;

pub use crate::codec::PixelBuffer;
pub use crate::config::{Config, Limits};
pub use crate::error::{CodecError, CryptoError, Error, ImageError};
pub use crate::format::BlobFormat;

use std::sync::Arc;

use crate::telemetry::{Event, EventSink, NullSink};

/// A message recovered from a stego image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revealed {
    pub text: String,
    /// Whether the payload was decrypted with the supplied password.
    pub encrypted: bool,
}

/// Hide/reveal pipeline: optional encryption on top of LSB embedding.
pub struct Pixvault {
    config: Config,
    sink: Arc<dyn EventSink>,
}

impl Default for Pixvault {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Pixvault {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Largest payload in bytes `pixels` can hold.
    pub fn capacity(&self, pixels: &PixelBuffer) -> i64 {
        pixels.capacity()
    }

    /// Embeds `message` into a copy of `cover`, encrypting it first when a
    /// password is given.
    pub fn hide(
        &self,
        cover: &PixelBuffer,
        message: &str,
        password: Option<&str>,
    ) -> Result<PixelBuffer, Error> {
        self.config.limits.check(cover.width(), cover.height())?;

        let payload = match password {
            Some(password) => {
                self.sink.emit(Event::info("encrypting message before encoding"));
                crypto::encrypt_with(message, password, &self.config.format)?
            }
            None => message.as_bytes().to_vec(),
        };

        self.sink.emit(
            Event::info("starting LSB encoding")
                .field("width", cover.width())
                .field("height", cover.height())
                .field("payload_len", payload.len()),
        );
        let stego = codec::encode(cover, &payload).inspect_err(|e| {
            if let CodecError::CapacityExceeded { max, actual } = e {
                self.sink.emit(
                    Event::warn("message too large for cover image")
                        .field("max_size", *max)
                        .field("actual_size", *actual),
                );
            }
        })?;
        self.sink.emit(Event::info("encoding completed"));

        Ok(stego)
    }

    /// Extracts the hidden message from `stego`.
    ///
    /// With a password and a payload long enough to carry salt and nonce, the
    /// payload is decrypted; authentication failures are returned, not masked.
    /// Otherwise the bytes are read as UTF-8, replacing invalid sequences.
    pub fn reveal(&self, stego: &PixelBuffer, password: Option<&str>) -> Result<Revealed, Error> {
        self.config.limits.check(stego.width(), stego.height())?;

        self.sink.emit(Event::info("starting LSB decoding"));
        let payload = codec::decode(stego.as_bytes(), stego.width(), stego.height())
            .inspect_err(|e| self.sink.emit(Event::error("decoding failed").field("error", e)))?;
        self.sink
            .emit(Event::info("extracted hidden payload").field("payload_len", payload.len()));

        match password {
            Some(password) if crypto::has_encryption_metadata(&payload) => {
                self.sink.emit(Event::info("attempting to decrypt extracted data"));
                let plaintext = crypto::decrypt(&payload, password).inspect_err(|e| {
                    self.sink.emit(Event::error("decryption failed").field("error", e))
                })?;
                Ok(Revealed {
                    text: String::from_utf8_lossy(&plaintext).into_owned(),
                    encrypted: true,
                })
            }
            Some(_) => {
                self.sink.emit(
                    Event::warn("payload too short to be encrypted; reading as text")
                        .field("payload_len", payload.len()),
                );
                Ok(Revealed {
                    text: String::from_utf8_lossy(&payload).into_owned(),
                    encrypted: false,
                })
            }
            None => Ok(Revealed {
                text: String::from_utf8_lossy(&payload).into_owned(),
                encrypted: false,
            }),
        }
    }

    /// [`Pixvault::hide`] over encoded image bytes; returns a PNG.
    pub fn hide_image(
        &self,
        cover: &[u8],
        message: &str,
        password: Option<&str>,
    ) -> Result<Vec<u8>, Error> {
        let pixels = self.load(cover)?;
        let stego = self.hide(&pixels, message, password)?;
        Ok(image_io::encode_png(&stego)?)
    }

    /// [`Pixvault::reveal`] over encoded image bytes.
    pub fn reveal_image(&self, stego: &[u8], password: Option<&str>) -> Result<Revealed, Error> {
        if image_io::is_lossy(stego) {
            self.sink
                .emit(Event::warn("image uses a lossy format; hidden data is likely destroyed"));
        }
        let pixels = self.load(stego)?;
        self.reveal(&pixels, password)
    }

    /// Decodes an image container, enforcing the pixel ceiling first.
    pub fn load(&self, bytes: &[u8]) -> Result<PixelBuffer, Error> {
        let pixels = image_io::load(bytes, &self.config.limits)
            .inspect_err(|e| self.sink.emit(Event::error("image load failed").field("error", e)))?;
        self.sink.emit(
            Event::info("image loaded")
                .field("width", pixels.width())
                .field("height", pixels.height()),
        );
        Ok(pixels)
    }
}
