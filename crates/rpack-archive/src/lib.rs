//! rpack-archive: the package codec
//!
//! # Overview
//! - `codec`: packs a set of files/directories into one tar stream,
//!   zstd-compressed; unpacks it back into a target directory
//! - `manifest`: the JSON provenance record embedded in every archive
//!
//! The codec is oblivious to encryption; sealing happens downstream in
//! rpack-crypto on the bytes this crate produces.

pub mod codec;
pub mod manifest;

pub use codec::{pack, pack_data, unpack, INLINE_PAYLOAD_NAME};
pub use manifest::{ResultManifest, MANIFEST_NAME};
