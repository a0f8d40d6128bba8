//! Tagged blob format v1.
//!
//! ```text
//! MAGIC (4) | VERSION (1) | KDF_ID (1) | P1 (4) | P2 (4) | P3 (4) | SALT (16) | NONCE (12) | CIPHERTEXT + TAG
//! ```
//!
//! Parameters are little-endian. For PBKDF2 (`KDF_ID` 1) `P1` is the iteration
//! count and `P2`/`P3` are zero. For Argon2id (`KDF_ID` 2) they are memory cost
//! in KiB, time cost and parallelism.

use super::{BlobFormat, EncryptedBlob, MAGIC, MAGIC_LEN, VER_LEN};
use crate::crypto::{Argon2Params, Kdf, NONCE_LEN, SALT_LEN};
use crate::error::CryptoError;

/// Current tagged format version.
pub const VERSION_V1: u8 = 1;

const KDF_PBKDF2_SHA256: u8 = 1;
const KDF_ARGON2ID: u8 = 2;

const KDF_ID_LEN: usize = 1;
const PARAM_LEN: usize = 4;

pub const HEADER_LEN: usize =
    MAGIC_LEN + VER_LEN + KDF_ID_LEN + 3 * PARAM_LEN + SALT_LEN + NONCE_LEN;

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; PARAM_LEN];
    buf.copy_from_slice(&data[offset..offset + PARAM_LEN]);
    u32::from_le_bytes(buf)
}

/// Parses a v1 blob.
///
/// # Errors
///
/// Returns an error if the blob is too short, has the wrong magic or version,
/// names an unknown KDF or carries out-of-range KDF parameters.
pub fn parse(data: &[u8]) -> Result<EncryptedBlob, CryptoError> {
    if data.len() < HEADER_LEN {
        return Err(CryptoError::BlobTooShort { len: data.len() });
    }

    if &data[..MAGIC_LEN] != MAGIC || data[MAGIC_LEN] != VERSION_V1 {
        return Err(CryptoError::InvalidKdfParams(
            "not a v1 tagged blob".to_string(),
        ));
    }

    let mut offset = MAGIC_LEN + VER_LEN;

    let kdf_id = data[offset];
    offset += KDF_ID_LEN;

    let p1 = read_u32(data, offset);
    offset += PARAM_LEN;
    let p2 = read_u32(data, offset);
    offset += PARAM_LEN;
    let p3 = read_u32(data, offset);
    offset += PARAM_LEN;

    let kdf = match kdf_id {
        KDF_PBKDF2_SHA256 => Kdf::Pbkdf2 { iterations: p1 },
        KDF_ARGON2ID => Kdf::Argon2id(Argon2Params::new(p1, p2, p3)?),
        other => {
            return Err(CryptoError::InvalidKdfParams(format!(
                "unknown kdf id {other}"
            )));
        }
    };
    kdf.validate()?;

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[offset..offset + SALT_LEN]);
    offset += SALT_LEN;

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[offset..offset + NONCE_LEN]);
    offset += NONCE_LEN;

    Ok(EncryptedBlob::new(
        BlobFormat::Tagged(kdf),
        salt,
        nonce,
        data[offset..].to_vec(),
    ))
}

/// Serializes a blob to v1 bytes, whatever format it was read from.
pub fn serialize(blob: &EncryptedBlob) -> Vec<u8> {
    let (kdf_id, params) = match blob.format().kdf() {
        Kdf::Pbkdf2 { iterations } => (KDF_PBKDF2_SHA256, [iterations, 0, 0]),
        Kdf::Argon2id(p) => (
            KDF_ARGON2ID,
            [p.mem_cost_kib(), p.time_cost(), p.parallelism()],
        ),
    };

    let mut buf = Vec::with_capacity(HEADER_LEN + blob.ciphertext().len());

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION_V1);
    buf.push(kdf_id);
    for param in params {
        buf.extend_from_slice(&param.to_le_bytes());
    }

    buf.extend_from_slice(blob.salt());
    buf.extend_from_slice(blob.nonce());
    buf.extend_from_slice(blob.ciphertext());

    buf
}
