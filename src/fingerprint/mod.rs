// src/fingerprint/mod.rs

//! Build fingerprints: content hashes of a project's inputs plus its
//! configuration hash, persisted after every successful build and compared
//! before the next one.
//!
//! - [`hash`] computes version tokens and config hashes.
//! - [`cache`] memoizes version tokens for one session.
//! - [`inputs`] enumerates a project's input files.
//! - [`model`] holds the in-memory and on-disk types.
//! - [`serialize`] converts between them.
//! - [`store`] loads, persists and compares fingerprints.

pub mod cache;
pub mod hash;
pub mod inputs;
pub mod model;
pub mod serialize;
pub mod store;

pub use cache::VersionTokenCache;
pub use hash::{compute_config_hash, compute_file_hash};
pub use inputs::{InputEnumerator, InputSpec, ProjectInputs};
pub use model::{BuildFingerprint, FileDependencyRef, FingerprintDiff, SerializedBuildFingerprint};
pub use serialize::{deserialize, serialize, PathConverter, PathStyle};
pub use store::{FingerprintStore, FreshnessCheck};
