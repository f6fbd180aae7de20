//! Authenticated package sealing/opening with XChaCha20-Poly1305
//!
//! Sealed package format (binary):
//! ```text
//! [4 bytes: magic "RPKG"][1 byte: format version][8 bytes: plaintext length, big-endian]
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! AAD = magic || version || plaintext length (the 13 header bytes before the nonce)
//! ```
//!
//! The header is cleartext so corrupted or foreign blobs can be rejected
//! before any decryption is attempted; binding it as AAD means a tampered
//! header fails authentication like any other tamper.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use rpack_core::{RpackError, RpackResult};

use crate::secret::Secret;
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// First bytes of every sealed package.
pub const PACKAGE_MAGIC: [u8; 4] = *b"RPKG";

/// Current sealed-package format version.
pub const FORMAT_VERSION: u8 = 1;

/// Total cleartext header length: magic + version + length + nonce.
pub const HEADER_LEN: usize = 4 + 1 + 8 + NONCE_SIZE;

const AAD_LEN: usize = 4 + 1 + 8;

/// Cleartext header of a sealed package, parseable without the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageHeader {
    pub version: u8,
    pub plaintext_len: u64,
    pub nonce: [u8; NONCE_SIZE],
}

impl PackageHeader {
    /// Parse the header from the front of a sealed package.
    pub fn parse(package: &[u8]) -> RpackResult<Self> {
        if package.len() < HEADER_LEN + TAG_SIZE {
            return Err(RpackError::CorruptArchive(format!(
                "sealed package too short: {} bytes (minimum {})",
                package.len(),
                HEADER_LEN + TAG_SIZE
            )));
        }
        if package[..4] != PACKAGE_MAGIC {
            return Err(RpackError::CorruptArchive(
                "bad magic: not an rpack package".into(),
            ));
        }
        let version = package[4];
        if version != FORMAT_VERSION {
            return Err(RpackError::CorruptArchive(format!(
                "unsupported package format version {version}"
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&package[5..13]);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&package[13..HEADER_LEN]);

        Ok(Self {
            version,
            plaintext_len: u64::from_be_bytes(len_bytes),
            nonce,
        })
    }
}

/// Seal an archive with the package secret.
///
/// Returns the full sealed package: header followed by ciphertext and tag.
pub fn seal(secret: &Secret, plaintext: &[u8]) -> RpackResult<Vec<u8>> {
    let key = derive_key(secret)?;
    let cipher = XChaCha20Poly1305::new((&key).into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|e| RpackError::EntropyUnavailable(format!("OS random source failed: {e}")))?;
    let nonce = XNonce::from_slice(&nonce_bytes);

    let aad = build_aad(plaintext.len() as u64);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|e| anyhow::anyhow!("package encryption failed: {e}"))?;

    let mut package = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    package.extend_from_slice(&aad);
    package.extend_from_slice(&nonce_bytes);
    package.extend_from_slice(&ciphertext);
    Ok(package)
}

/// Open a sealed package with the package secret.
///
/// Authentication failure is reported as `DecryptionFailed` whether the
/// secret is wrong or the data was tampered with; callers cannot tell the
/// two apart.
pub fn open(secret: &Secret, package: &[u8]) -> RpackResult<Vec<u8>> {
    let header = PackageHeader::parse(package)?;

    let key = derive_key(secret)?;
    let cipher = XChaCha20Poly1305::new((&key).into());
    let nonce = XNonce::from_slice(&header.nonce);
    let aad = build_aad(header.plaintext_len);

    let plaintext = cipher
        .decrypt(
            nonce,
            Payload {
                msg: &package[HEADER_LEN..],
                aad: &aad,
            },
        )
        .map_err(|_| RpackError::DecryptionFailed)?;

    if plaintext.len() as u64 != header.plaintext_len {
        return Err(RpackError::CorruptArchive(format!(
            "declared plaintext length {} does not match decrypted length {}",
            header.plaintext_len,
            plaintext.len()
        )));
    }

    Ok(plaintext)
}

/// Derive the AEAD key from the variable-length secret via HKDF-SHA256.
fn derive_key(secret: &Secret) -> RpackResult<[u8; KEY_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(None, secret.as_bytes());
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(b"rpack/package-key/v1", &mut okm)
        .map_err(|e| anyhow::anyhow!("HKDF expand failed: {e}"))?;
    Ok(okm)
}

fn build_aad(plaintext_len: u64) -> [u8; AAD_LEN] {
    let mut aad = [0u8; AAD_LEN];
    aad[..4].copy_from_slice(&PACKAGE_MAGIC);
    aad[4] = FORMAT_VERSION;
    aad[5..].copy_from_slice(&plaintext_len.to_be_bytes());
    aad
}
