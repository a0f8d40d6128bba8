//! Untagged blob layout.
//!
//! ```text
//! SALT (16) | NONCE (12) | CIPHERTEXT + TAG
//! ```

use super::{BlobFormat, EncryptedBlob};
use crate::crypto::{NONCE_LEN, SALT_LEN};
use crate::error::CryptoError;

const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

/// Splits `data` into salt, nonce and ciphertext.
///
/// # Errors
///
/// Returns an error if `data` is shorter than salt and nonce together.
pub fn parse(data: &[u8]) -> Result<EncryptedBlob, CryptoError> {
    if data.len() < HEADER_LEN {
        return Err(CryptoError::BlobTooShort { len: data.len() });
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let salt: [u8; SALT_LEN] = salt
        .try_into()
        .map_err(|_| CryptoError::BlobTooShort { len: data.len() })?;
    let nonce: [u8; NONCE_LEN] = nonce
        .try_into()
        .map_err(|_| CryptoError::BlobTooShort { len: data.len() })?;

    Ok(EncryptedBlob::new(
        BlobFormat::Legacy,
        salt,
        nonce,
        ciphertext.to_vec(),
    ))
}

pub fn serialize(blob: &EncryptedBlob) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + blob.ciphertext().len());

    buf.extend_from_slice(blob.salt());
    buf.extend_from_slice(blob.nonce());
    buf.extend_from_slice(blob.ciphertext());

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_at_fixed_offsets() {
        let mut data: Vec<u8> = (0u8..40).collect();
        let blob = parse(&data).unwrap();

        assert_eq!(blob.salt()[0], 0);
        assert_eq!(blob.nonce()[0], 16);
        assert_eq!(blob.ciphertext(), &data[28..]);

        data.truncate(28);
        assert!(parse(&data).unwrap().ciphertext().is_empty());
    }

    #[test]
    fn serialize_concatenates() {
        let blob = EncryptedBlob::new(BlobFormat::Legacy, [1u8; 16], [2u8; 12], vec![3, 4]);
        let bytes = serialize(&blob);

        assert_eq!(bytes.len(), 30);
        assert_eq!(&bytes[..16], &[1u8; 16]);
        assert_eq!(&bytes[16..28], &[2u8; 12]);
        assert_eq!(&bytes[28..], &[3, 4]);
    }
}
