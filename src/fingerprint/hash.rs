// src/fingerprint/hash.rs

//! Content hashing for version tokens and config hashes.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Compute the version token of a single file: the blake3 hash of its bytes.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Digest of every configuration value that affects a project's output.
///
/// Fields are length-prefixed so that `("ab", "c")` and `("a", "bc")` never
/// collide.
pub fn compute_config_hash(cmd: &str, path: &str, exclude: &[String]) -> String {
    let mut hasher = Hasher::new();
    for field in [cmd, path].into_iter().chain(exclude.iter().map(String::as_str)) {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
