//! rpack-crypto: per-package secrets and authenticated package sealing
//!
//! Pipeline: archive bytes → XChaCha20-Poly1305 seal → content-addressed store
//!
//! One random secret is generated per package and transported out-of-band;
//! the AEAD key is derived from it via HKDF-SHA256 with a fixed domain label,
//! so secrets may be any length within the configured bounds.

pub mod package;
pub mod secret;

pub use package::{open, seal, PackageHeader, FORMAT_VERSION, HEADER_LEN, PACKAGE_MAGIC};
pub use secret::{Secret, SecretGenerator};

/// Size of the derived AEAD key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
