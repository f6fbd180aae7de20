//! rpack-store: content-addressed blob storage for sealed packages
//!
//! # Overview
//! - `address`: self-describing BLAKE3-256 content addresses
//! - `store`: filesystem-backed content-addressed store (put/get, dedup,
//!   integrity verification on retrieval)
//! - `workspace`: node-scoped directory namespace for task resources,
//!   stored packages, and extraction targets

pub mod address;
pub mod store;
pub mod workspace;

pub use address::ContentAddress;
pub use store::{ContentStore, StoredBlob};
pub use workspace::TaskWorkspace;
