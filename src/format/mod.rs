//! Wire formats of encrypted payloads.
//!
//! Two layouts exist. The untagged legacy blob is `SALT | NONCE | CIPHERTEXT`
//! with fixed PBKDF2 parameters; nothing in it marks it as encrypted. The
//! tagged v1 blob starts with a magic and version and records its key
//! derivation parameters. Parsing prefers a well-formed tagged header and falls
//! back to the legacy reading.

use crate::crypto::{Kdf, NONCE_LEN, SALT_LEN};
use crate::error::CryptoError;

pub mod legacy;
pub mod v1;

/// Magic bytes identifying a tagged blob ("PXVT").
pub const MAGIC: &[u8; 4] = b"PXVT";
/// Length of magic bytes.
pub const MAGIC_LEN: usize = 4;
/// Length of version field.
pub const VER_LEN: usize = 1;
/// Latest tagged format version
pub const CURRENT_VERSION: u8 = v1::VERSION_V1;

/// Layout used when sealing a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobFormat {
    /// `SALT | NONCE | CIPHERTEXT`, PBKDF2-HMAC-SHA256 with 100,000 rounds.
    #[default]
    Legacy,
    /// Magic, version and KDF parameters ahead of salt, nonce and ciphertext.
    Tagged(Kdf),
}

impl BlobFormat {
    /// Key derivation this layout implies.
    pub fn kdf(&self) -> Kdf {
        match self {
            BlobFormat::Legacy => Kdf::default(),
            BlobFormat::Tagged(kdf) => *kdf,
        }
    }
}

/// A parsed encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    format: BlobFormat,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    pub fn new(
        format: BlobFormat,
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            format,
            salt,
            nonce,
            ciphertext,
        }
    }

    pub fn format(&self) -> &BlobFormat {
        &self.format
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Ciphertext with the authentication tag appended.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// Whether `data` starts with a tagged header of a known version.
pub fn is_tagged(data: &[u8]) -> bool {
    data.len() > MAGIC_LEN && &data[..MAGIC_LEN] == MAGIC && data[MAGIC_LEN] == CURRENT_VERSION
}

/// Every plausible reading of `data`, most specific first.
///
/// A tagged reading comes first when the header parses. The legacy reading is
/// always included for blobs of at least 28 bytes since a random legacy salt
/// can begin with the magic.
pub fn candidates(data: &[u8]) -> Vec<EncryptedBlob> {
    let mut out = Vec::with_capacity(2);

    if is_tagged(data) {
        if let Ok(blob) = v1::parse(data) {
            out.push(blob);
        }
    }
    if let Ok(blob) = legacy::parse(data) {
        out.push(blob);
    }

    out
}

/// Parses `data` using its most specific reading.
///
/// # Errors
///
/// Returns an error if the data is too short to be any kind of blob.
pub fn parse(data: &[u8]) -> Result<EncryptedBlob, CryptoError> {
    candidates(data)
        .into_iter()
        .next()
        .ok_or(CryptoError::BlobTooShort { len: data.len() })
}

/// Serializes a blob in its own layout.
pub fn serialize(blob: &EncryptedBlob) -> Vec<u8> {
    match blob.format() {
        BlobFormat::Legacy => legacy::serialize(blob),
        BlobFormat::Tagged(_) => v1::serialize(blob),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_blob_yields_both_readings() {
        let blob = EncryptedBlob::new(
            BlobFormat::Tagged(Kdf::Pbkdf2 { iterations: 5_000 }),
            [1u8; SALT_LEN],
            [2u8; NONCE_LEN],
            vec![3u8; 20],
        );
        let bytes = serialize(&blob);

        let readings = candidates(&bytes);
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0], blob);
        assert_eq!(*readings[1].format(), BlobFormat::Legacy);
        assert_eq!(parse(&bytes).unwrap(), blob);
    }

    #[test]
    fn legacy_blob_yields_one_reading() {
        let blob = EncryptedBlob::new(BlobFormat::Legacy, [9u8; 16], [8u8; 12], vec![7u8; 17]);
        let bytes = serialize(&blob);

        assert!(!is_tagged(&bytes));
        assert_eq!(candidates(&bytes), vec![blob]);
    }

    #[test]
    fn short_data_has_no_reading() {
        assert!(candidates(&[0u8; 27]).is_empty());
        assert_eq!(
            parse(b"PXVT").unwrap_err(),
            CryptoError::BlobTooShort { len: 4 }
        );
    }

    #[test]
    fn unknown_version_is_not_tagged() {
        let mut data = vec![0u8; 64];
        data[..4].copy_from_slice(MAGIC);
        data[4] = 99;

        assert!(!is_tagged(&data));
        assert_eq!(*parse(&data).unwrap().format(), BlobFormat::Legacy);
    }
}
