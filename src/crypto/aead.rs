use super::{KEY_LEN, NONCE_LEN, SALT_LEN};
use crate::error::CryptoError;
use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use getrandom::fill;
use zeroize::Zeroizing;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    fill(buf).map_err(|_| CryptoError::RandomUnavailable)
}

/// Generate salt
pub fn generate_salt() -> Result<[u8; SALT_LEN], CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate a fresh AES-GCM nonce
pub fn generate_nonce() -> Result<[u8; NONCE_LEN], CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;
    Ok(nonce)
}

/// Encrypt plaintext, returning ciphertext with the 16-byte tag appended
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt ciphertext and verify its tag
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailure)?;
    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::TAG_LEN;

    #[test]
    fn seal_appends_tag() {
        let key = [3u8; KEY_LEN];
        let nonce = [4u8; NONCE_LEN];

        let ct = seal(&key, &nonce, b"twelve bytes").unwrap();
        assert_eq!(ct.len(), 12 + TAG_LEN);
        assert_eq!(&*open(&key, &nonce, &ct).unwrap(), b"twelve bytes");
    }

    #[test]
    fn wrong_nonce_fails() {
        let key = [3u8; KEY_LEN];
        let ct = seal(&key, &[4u8; NONCE_LEN], b"data").unwrap();

        assert_eq!(
            open(&key, &[5u8; NONCE_LEN], &ct).unwrap_err(),
            CryptoError::AuthenticationFailure
        );
    }

    #[test]
    fn ciphertext_shorter_than_tag_fails() {
        assert_eq!(
            open(&[0u8; KEY_LEN], &[0u8; NONCE_LEN], &[0u8; 5]).unwrap_err(),
            CryptoError::AuthenticationFailure
        );
    }

    #[test]
    fn random_values_differ() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
        assert_ne!(generate_nonce().unwrap(), generate_nonce().unwrap());
    }
}
