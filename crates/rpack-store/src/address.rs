//! Self-describing content addresses
//!
//! Binary form is multihash-style: one byte naming the hash function
//! (BLAKE3-256), one byte of digest length, then the 32 digest bytes.
//! Canonical text form is lowercase hex of those 34 bytes, which doubles
//! as the object filename in the store.

use std::fmt;
use std::str::FromStr;

use rpack_core::{RpackError, RpackResult};

/// Multihash code for BLAKE3-256
pub const BLAKE3_CODE: u8 = 0x1e;

/// Digest length in bytes
pub const DIGEST_SIZE: usize = 32;

/// Length of the binary (and half the hex) encoding
pub const ENCODED_SIZE: usize = 2 + DIGEST_SIZE;

/// Deterministic digest of stored bytes; the lookup key in the store.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentAddress {
    digest: [u8; DIGEST_SIZE],
}

impl ContentAddress {
    /// Compute the address of a byte string.
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self {
            digest: *blake3::hash(bytes).as_bytes(),
        }
    }

    pub fn digest(&self) -> &[u8; DIGEST_SIZE] {
        &self.digest
    }

    /// Binary encoding: `[code][digest length][digest]`
    pub fn to_bytes(&self) -> [u8; ENCODED_SIZE] {
        let mut out = [0u8; ENCODED_SIZE];
        out[0] = BLAKE3_CODE;
        out[1] = DIGEST_SIZE as u8;
        out[2..].copy_from_slice(&self.digest);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> RpackResult<Self> {
        if bytes.len() != ENCODED_SIZE {
            return Err(RpackError::InvalidInput(format!(
                "content address must be {ENCODED_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != BLAKE3_CODE {
            return Err(RpackError::InvalidInput(format!(
                "unknown hash function code {:#04x}",
                bytes[0]
            )));
        }
        if bytes[1] as usize != DIGEST_SIZE {
            return Err(RpackError::InvalidInput(format!(
                "unexpected digest length {}",
                bytes[1]
            )));
        }

        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&bytes[2..]);
        Ok(Self { digest })
    }

    /// Canonical lowercase hex form (68 chars)
    pub fn to_hex(&self) -> String {
        self.to_bytes().iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn from_hex(hex: &str) -> RpackResult<Self> {
        if hex.len() != ENCODED_SIZE * 2 {
            return Err(RpackError::InvalidInput(format!(
                "content address hex must be {} chars, got {}",
                ENCODED_SIZE * 2,
                hex.len()
            )));
        }
        let mut bytes = [0u8; ENCODED_SIZE];
        for (i, chunk) in hex.as_bytes().chunks_exact(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| {
                    RpackError::InvalidInput(format!("invalid hex in content address: {hex}"))
                })?;
            bytes[i] = pair;
        }
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({})", self.to_hex())
    }
}

impl FromStr for ContentAddress {
    type Err = RpackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
