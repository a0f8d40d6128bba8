//! Password-based authenticated encryption of payloads.
//!
//! A password and a random salt go through a key derivation function; the
//! derived 256-bit key seals the plaintext with AES-256-GCM. The result is a
//! self-contained blob that carries everything except the password.

pub mod aead;
pub mod kdf;

pub use aead::{generate_nonce, generate_salt, open, seal};
pub use kdf::{Argon2Params, Kdf, derive_key};

use crate::error::CryptoError;
use crate::format::{self, BlobFormat, EncryptedBlob};
use zeroize::Zeroizing;

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the AES-GCM nonce (12 bytes).
pub const NONCE_LEN: usize = 12;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;
/// PBKDF2 rounds used by the untagged blob format.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Encrypts `plaintext` into an untagged `salt || nonce || ciphertext+tag` blob.
pub fn encrypt(plaintext: &str, password: &str) -> Result<Vec<u8>, CryptoError> {
    encrypt_with(plaintext, password, &BlobFormat::Legacy)
}

/// Encrypts `plaintext` into a blob of the requested format.
pub fn encrypt_with(
    plaintext: &str,
    password: &str,
    blob_format: &BlobFormat,
) -> Result<Vec<u8>, CryptoError> {
    let kdf = blob_format.kdf();
    let salt = generate_salt()?;
    let nonce = generate_nonce()?;
    let key = derive_key(password, &salt, kdf)?;

    let ciphertext = seal(&key, &nonce, plaintext.as_bytes())?;

    let blob = EncryptedBlob::new(*blob_format, salt, nonce, ciphertext);
    Ok(format::serialize(&blob))
}

/// Decrypts a blob produced by [`encrypt`] or [`encrypt_with`].
///
/// # Errors
///
/// [`CryptoError::AuthenticationFailure`] for a wrong password, a tampered blob
/// or data that was never encrypted; the cipher cannot tell these apart.
pub fn decrypt(blob: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let mut last_err = CryptoError::BlobTooShort { len: blob.len() };

    for candidate in format::candidates(blob) {
        let key = derive_key(password, candidate.salt(), candidate.format().kdf())?;
        match open(&key, candidate.nonce(), candidate.ciphertext()) {
            Ok(plaintext) => return Ok(plaintext),
            Err(e) => last_err = e,
        }
    }

    Err(last_err)
}

/// Whether `blob` is long enough to hold a salt and nonce.
///
/// A length heuristic only: any 28-byte buffer passes. Only a decrypt attempt
/// tells real ciphertext apart.
pub fn has_encryption_metadata(blob: &[u8]) -> bool {
    blob.len() >= SALT_LEN + NONCE_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_tagged() -> BlobFormat {
        BlobFormat::Tagged(Kdf::Pbkdf2 { iterations: 1_000 })
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let blob = encrypt("Hello, world! ünïcødé 🦀", "pw").unwrap();
        let plaintext = decrypt(&blob, "pw").unwrap();
        assert_eq!(
            String::from_utf8(plaintext.to_vec()).unwrap(),
            "Hello, world! ünïcødé 🦀"
        );
    }

    #[test]
    fn legacy_blob_layout() {
        let blob = encrypt("abc", "pw").unwrap();
        assert_eq!(blob.len(), SALT_LEN + NONCE_LEN + 3 + TAG_LEN);
        assert!(has_encryption_metadata(&blob));
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let blob = encrypt("", "pw").unwrap();
        assert_eq!(blob.len(), SALT_LEN + NONCE_LEN + TAG_LEN);
        assert!(decrypt(&blob, "pw").unwrap().is_empty());
    }

    #[test]
    fn wrong_password_fails() {
        let blob = encrypt("secret", "correct").unwrap();
        assert_eq!(
            decrypt(&blob, "wrong").unwrap_err(),
            CryptoError::AuthenticationFailure
        );
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let blob = encrypt("secret", "pw").unwrap();
        let body = SALT_LEN + NONCE_LEN;
        for i in [body, body + 5, blob.len() - TAG_LEN, blob.len() - 1] {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                decrypt(&tampered, "pw").unwrap_err(),
                CryptoError::AuthenticationFailure,
                "flip at byte {i}"
            );
        }
    }

    #[test]
    fn same_input_encrypts_differently() {
        let a = encrypt("same", "pw").unwrap();
        let b = encrypt("same", "pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tagged_roundtrip() {
        let blob = encrypt_with("tagged message", "pw", &fast_tagged()).unwrap();
        assert!(format::is_tagged(&blob));
        assert_eq!(&*decrypt(&blob, "pw").unwrap(), b"tagged message");
        assert_eq!(
            decrypt(&blob, "nope").unwrap_err(),
            CryptoError::AuthenticationFailure
        );
    }

    #[test]
    fn tagged_argon2_roundtrip() {
        let kdf = Kdf::Argon2id(Argon2Params::new(1024, 1, 1).unwrap());
        let blob = encrypt_with("argon", "pw", &BlobFormat::Tagged(kdf)).unwrap();
        assert_eq!(&*decrypt(&blob, "pw").unwrap(), b"argon");
    }

    #[test]
    fn short_blob_is_rejected() {
        assert_eq!(
            decrypt(&[0u8; 27], "pw").unwrap_err(),
            CryptoError::BlobTooShort { len: 27 }
        );
    }

    #[test]
    fn plaintext_bytes_fail_authentication() {
        let not_encrypted = b"just an ordinary message that is long enough";
        assert!(has_encryption_metadata(not_encrypted));
        assert_eq!(
            decrypt(not_encrypted, "pw").unwrap_err(),
            CryptoError::AuthenticationFailure
        );
    }

    #[test]
    fn metadata_heuristic_threshold() {
        assert!(!has_encryption_metadata(&[]));
        assert!(!has_encryption_metadata(&[0u8; 27]));
        assert!(has_encryption_metadata(&[0u8; 28]));
    }

    #[test]
    fn legacy_salt_that_looks_tagged_still_decrypts() {
        let mut salt = [0x5a; SALT_LEN];
        salt[..6].copy_from_slice(b"PXVT\x01\x01");
        salt[6..10].copy_from_slice(&1_000u32.to_le_bytes());
        let nonce = generate_nonce().unwrap();
        let plaintext = "a message long enough to pass";

        let key = derive_key("pw", &salt, Kdf::default()).unwrap();
        let ciphertext = seal(&key, &nonce, plaintext.as_bytes()).unwrap();
        let blob = format::serialize(&EncryptedBlob::new(
            BlobFormat::Legacy,
            salt,
            nonce,
            ciphertext,
        ));

        assert!(format::is_tagged(&blob));
        assert_eq!(format::candidates(&blob).len(), 2);
        assert_eq!(&*decrypt(&blob, "pw").unwrap(), plaintext.as_bytes());
    }
}
