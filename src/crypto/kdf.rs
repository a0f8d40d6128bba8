use argon2::{Algorithm, Argon2, Params, Version};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{KEY_LEN, PBKDF2_ITERATIONS};
use crate::error::CryptoError;

const PBKDF2_MIN_ITERATIONS: u32 = 1_000;
// bounds the work an untrusted blob header can ask for
const PBKDF2_MAX_ITERATIONS: u32 = 10_000_000;
const ARGON2_MAX_MEM_KIB: u32 = 1024 * 1024; // 1 GiB
const ARGON2_MAX_TIME_COST: u32 = 64;
const ARGON2_MAX_PARALLELISM: u32 = 16;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            mem_cost_kib: 64 * 1024, // 64 MiB
            time_cost: 3,
            parallelism: 1,
        }
    }
}

impl Argon2Params {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self, CryptoError> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<(), CryptoError> {
        let invalid = |msg: &str| Err(CryptoError::InvalidKdfParams(msg.to_string()));

        if self.time_cost < 1 || self.time_cost > ARGON2_MAX_TIME_COST {
            return invalid("argon2 time cost must be between 1 and 64");
        }
        if self.parallelism < 1 || self.parallelism > ARGON2_MAX_PARALLELISM {
            return invalid("argon2 parallelism must be between 1 and 16");
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return invalid("argon2 memory cost must be at least 8 * parallelism");
        }
        if self.mem_cost_kib > ARGON2_MAX_MEM_KIB {
            return invalid("argon2 memory cost above 1 GiB");
        }
        Ok(())
    }
}

/// Password stretching function and its cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kdf {
    /// PBKDF2-HMAC-SHA256.
    Pbkdf2 { iterations: u32 },
    Argon2id(Argon2Params),
}

impl Default for Kdf {
    fn default() -> Self {
        Kdf::Pbkdf2 {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl Kdf {
    pub fn validate(&self) -> Result<(), CryptoError> {
        match self {
            Kdf::Pbkdf2 { iterations } => {
                if !(PBKDF2_MIN_ITERATIONS..=PBKDF2_MAX_ITERATIONS).contains(iterations) {
                    return Err(CryptoError::InvalidKdfParams(format!(
                        "pbkdf2 iterations must be between {PBKDF2_MIN_ITERATIONS} and {PBKDF2_MAX_ITERATIONS}, got {iterations}"
                    )));
                }
                Ok(())
            }
            Kdf::Argon2id(params) => params.validate(),
        }
    }
}

/// Derives a 256-bit key from `password` and `salt`.
///
/// Deterministic for identical inputs.
pub fn derive_key(
    password: &str,
    salt: &[u8],
    kdf: Kdf,
) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    kdf.validate()?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);

    match kdf {
        Kdf::Pbkdf2 { iterations } => {
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut *key);
        }
        Kdf::Argon2id(p) => {
            let params = Params::new(p.mem_cost_kib, p.time_cost, p.parallelism, Some(KEY_LEN))
                .map_err(|e| CryptoError::InvalidKdfParams(e.to_string()))?;

            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password_into(password.as_bytes(), salt, &mut *key)
                .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        }
    }

    Ok(key)
}
