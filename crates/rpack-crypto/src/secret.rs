//! Per-package secret generation
//!
//! A secret is an opaque random byte string whose length falls within the
//! configured bounds. It is never derived from task or node identity, so it
//! cannot be guessed from public metadata.

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use rpack_core::config::SecretConfig;
use rpack_core::{RpackError, RpackResult};

/// Symmetric key material for one package. Zeroized on drop.
#[derive(Clone)]
pub struct Secret {
    bytes: Vec<u8>,
}

impl Secret {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encode for out-of-band transport (the manager never transmits it).
    pub fn to_base64(&self) -> String {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        STANDARD.encode(&self.bytes)
    }

    pub fn from_base64(s: &str) -> RpackResult<Self> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| RpackError::InvalidInput(format!("secret is not valid base64: {e}")))?;
        Ok(Self::from_bytes(bytes))
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generates secrets with lengths chosen uniformly within `[min_len, max_len]`.
///
/// Stateless apart from the bounds; every byte comes from the OS entropy
/// source. A broken entropy source surfaces as `EntropyUnavailable` rather
/// than falling back to anything weaker.
#[derive(Debug, Clone)]
pub struct SecretGenerator {
    min_len: usize,
    max_len: usize,
}

impl SecretGenerator {
    pub fn new(min_len: usize, max_len: usize) -> RpackResult<Self> {
        if min_len == 0 {
            return Err(RpackError::InvalidInput(
                "secret min_len must be at least 1".into(),
            ));
        }
        if min_len > max_len {
            return Err(RpackError::InvalidInput(format!(
                "secret min_len {min_len} exceeds max_len {max_len}"
            )));
        }
        Ok(Self { min_len, max_len })
    }

    pub fn from_config(config: &SecretConfig) -> RpackResult<Self> {
        Self::new(config.min_len, config.max_len)
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Produce one fresh secret.
    pub fn generate(&self) -> RpackResult<Secret> {
        let len = self.pick_len()?;

        let mut bytes = vec![0u8; len];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            RpackError::EntropyUnavailable(format!("OS random source failed: {e}"))
        })?;

        Ok(Secret::from_bytes(bytes))
    }

    fn pick_len(&self) -> RpackResult<usize> {
        if self.min_len == self.max_len {
            return Ok(self.min_len);
        }

        let mut draw = [0u8; 8];
        OsRng.try_fill_bytes(&mut draw).map_err(|e| {
            RpackError::EntropyUnavailable(format!("OS random source failed: {e}"))
        })?;

        let span = (self.max_len - self.min_len + 1) as u64;
        Ok(self.min_len + (u64::from_le_bytes(draw) % span) as usize)
    }
}
