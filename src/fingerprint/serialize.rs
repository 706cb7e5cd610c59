// src/fingerprint/serialize.rs

//! Conversion between [`BuildFingerprint`] and its on-disk form.
//!
//! Serialization relativizes every path against the fingerprint file's
//! folder (using `..` when needed) and replaces `fileDependencies` inputs by
//! indices into `inputFileVersions`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::errors::{MonowatchError, Result};
use crate::fingerprint::model::{BuildFingerprint, FileDependencyRef, SerializedBuildFingerprint};

/// Separator convention of absolute paths on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// `/`-separated, rooted at `/`.
    Posix,
    /// `\`-separated, rooted at a drive (`C:`).
    Windows,
}

impl PathStyle {
    pub fn native() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }

    pub fn separator(self) -> char {
        match self {
            PathStyle::Posix => '/',
            PathStyle::Windows => '\\',
        }
    }
}

/// Converts absolute paths to `/`-separated paths relative to a base folder
/// and back.
///
/// For normalized absolute paths (no empty, `.` or `..` components)
/// `to_absolute(to_relative(p)) == p`.
#[derive(Debug, Clone)]
pub struct PathConverter {
    base: Vec<String>,
    style: PathStyle,
}

impl PathConverter {
    pub fn new(base_folder: &str, style: PathStyle) -> Self {
        Self {
            base: components(base_folder, style)
                .into_iter()
                .map(str::to_string)
                .collect(),
            style,
        }
    }

    /// Converter relative to the folder containing `file`, in host style.
    pub fn for_file(file: &Path) -> Self {
        let folder = file
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(&folder, PathStyle::native())
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    pub fn to_relative(&self, absolute: &str) -> String {
        let target = components(absolute, self.style);
        let common = self
            .base
            .iter()
            .zip(target.iter())
            .take_while(|(a, b)| a.as_str() == **b)
            .count();

        let mut parts: Vec<&str> = Vec::with_capacity(self.base.len() - common + target.len() - common);
        parts.extend(std::iter::repeat_n("..", self.base.len() - common));
        parts.extend(target[common..].iter().copied());

        if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join("/")
        }
    }

    pub fn to_absolute(&self, relative: &str) -> String {
        let mut parts: Vec<&str> = self.base.iter().map(String::as_str).collect();
        for segment in relative.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }

        let sep = self.style.separator();
        if parts.len() == 1 && parts[0].is_empty() {
            return sep.to_string();
        }
        parts.join(&sep.to_string())
    }
}

/// Split an absolute path into components, keeping the root marker (empty
/// string on POSIX, drive on Windows) and dropping empty components after it.
fn components(path: &str, style: PathStyle) -> Vec<&str> {
    let mut parts = path.split(style.separator());
    let mut out = Vec::new();
    if let Some(first) = parts.next() {
        out.push(first);
    }
    out.extend(parts.filter(|p| !p.is_empty()));
    out
}

/// Convert to the on-disk form.
///
/// Fails if a file dependency names an input missing from
/// `input_file_versions`.
pub fn serialize(
    fingerprint: &BuildFingerprint,
    converter: &PathConverter,
) -> Result<SerializedBuildFingerprint> {
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(fingerprint.input_file_versions.len());
    let mut input_file_versions = Vec::with_capacity(fingerprint.input_file_versions.len());

    for (i, (path, token)) in fingerprint.input_file_versions.iter().enumerate() {
        index_of.insert(path.as_str(), i);
        input_file_versions.push((converter.to_relative(path), token.clone()));
    }

    let file_dependencies = match &fingerprint.file_dependencies {
        None => None,
        Some(deps) => {
            let mut out = Vec::with_capacity(deps.len());
            for (output, inputs) in deps {
                let indices = inputs
                    .iter()
                    .map(|input| {
                        index_of.get(input.as_str()).copied().ok_or_else(|| {
                            MonowatchError::CacheCorruption {
                                path: output.clone(),
                                reason: format!("file dependency on unknown input '{input}'"),
                            }
                        })
                    })
                    .collect::<Result<Vec<usize>>>()?;
                out.push((converter.to_relative(output), FileDependencyRef::from_indices(indices)));
            }
            Some(out)
        }
    };

    Ok(SerializedBuildFingerprint {
        config_hash: fingerprint.config_hash.clone(),
        input_file_versions,
        file_dependencies,
    })
}

/// Convert from the on-disk form.
///
/// `source` is only used in error messages. An index outside
/// `inputFileVersions` is reported as cache corruption.
pub fn deserialize(
    serialized: SerializedBuildFingerprint,
    converter: &PathConverter,
    source: &str,
) -> Result<BuildFingerprint> {
    let absolute_inputs: Vec<String> = serialized
        .input_file_versions
        .iter()
        .map(|(path, _)| converter.to_absolute(path))
        .collect();

    let file_dependencies = match serialized.file_dependencies {
        None => None,
        Some(deps) => {
            let mut out = BTreeMap::new();
            for (output, reference) in deps {
                let inputs = reference
                    .indices()
                    .iter()
                    .map(|&i| {
                        absolute_inputs.get(i).cloned().ok_or_else(|| {
                            MonowatchError::CacheCorruption {
                                path: source.to_string(),
                                reason: format!(
                                    "fileDependencies entry '{output}' references input #{i}, but only {} inputs exist",
                                    absolute_inputs.len()
                                ),
                            }
                        })
                    })
                    .collect::<Result<Vec<String>>>()?;
                out.insert(converter.to_absolute(&output), inputs);
            }
            Some(out)
        }
    };

    let input_file_versions = absolute_inputs
        .into_iter()
        .zip(serialized.input_file_versions.into_iter().map(|(_, token)| token))
        .collect();

    Ok(BuildFingerprint {
        config_hash: serialized.config_hash,
        input_file_versions,
        file_dependencies,
    })
}
