// src/fingerprint/model.rs

//! In-memory and on-disk fingerprint types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Fingerprint of one project's last successful build.
///
/// Paths are absolute. A fingerprint is never edited in place: a changed
/// `config_hash` or any changed input produces a new value that replaces the
/// old one on disk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildFingerprint {
    pub config_hash: String,
    /// `{absolute path: version token}` for every input.
    pub input_file_versions: BTreeMap<String, String>,
    /// Optional fine-grained `{output path: [input paths]}` edges.
    ///
    /// Every referenced input must be a key of `input_file_versions`.
    pub file_dependencies: Option<BTreeMap<String, Vec<String>>>,
}

impl BuildFingerprint {
    pub fn new(config_hash: impl Into<String>, input_file_versions: BTreeMap<String, String>) -> Self {
        Self {
            config_hash: config_hash.into(),
            input_file_versions,
            file_dependencies: None,
        }
    }

    pub fn with_file_dependencies(mut self, deps: BTreeMap<String, Vec<String>>) -> Self {
        self.file_dependencies = Some(deps);
        self
    }

    /// Inputs added, removed or modified between `self` (older) and `current`.
    pub fn diff(&self, current: &BTreeMap<String, String>) -> FingerprintDiff {
        let mut diff = FingerprintDiff::default();

        for (path, token) in current {
            match self.input_file_versions.get(path) {
                None => {
                    diff.added.insert(path.clone());
                }
                Some(previous) if previous != token => {
                    diff.modified.insert(path.clone());
                }
                Some(_) => {}
            }
        }
        for path in self.input_file_versions.keys() {
            if !current.contains_key(path) {
                diff.removed.insert(path.clone());
            }
        }

        diff
    }
}

/// Per-file differences between two input sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintDiff {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub modified: BTreeSet<String>,
}

impl FingerprintDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// On-disk JSON form of a [`BuildFingerprint`].
///
/// Paths are relative to the fingerprint file's folder with `/` separators;
/// `fileDependencies` refers to inputs by their position in
/// `inputFileVersions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedBuildFingerprint {
    pub config_hash: String,
    pub input_file_versions: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_dependencies: Option<Vec<(String, FileDependencyRef)>>,
}

/// Index reference(s) into `inputFileVersions`.
///
/// A single dependency is written as a bare index; readers accept both
/// shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileDependencyRef {
    Single(usize),
    Many(Vec<usize>),
}

impl FileDependencyRef {
    pub fn from_indices(mut indices: Vec<usize>) -> Self {
        if indices.len() == 1 {
            FileDependencyRef::Single(indices.remove(0))
        } else {
            FileDependencyRef::Many(indices)
        }
    }

    pub fn indices(&self) -> &[usize] {
        match self {
            FileDependencyRef::Single(index) => std::slice::from_ref(index),
            FileDependencyRef::Many(indices) => indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn diff_classifies_changes() {
        let previous = BuildFingerprint::new("cfg", versions(&[("/a", "1"), ("/b", "2"), ("/c", "3")]));
        let diff = previous.diff(&versions(&[("/a", "1"), ("/b", "9"), ("/d", "4")]));

        assert_eq!(diff.modified.iter().collect::<Vec<_>>(), vec!["/b"]);
        assert_eq!(diff.added.iter().collect::<Vec<_>>(), vec!["/d"]);
        assert_eq!(diff.removed.iter().collect::<Vec<_>>(), vec!["/c"]);
        assert!(previous.diff(&previous.input_file_versions).is_empty());
    }

    #[test]
    fn dependency_ref_accepts_both_json_shapes() {
        let single: FileDependencyRef = serde_json::from_str("3").unwrap();
        let many: FileDependencyRef = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(single.indices(), &[3]);
        assert_eq!(many.indices(), &[1, 2]);
        assert_eq!(serde_json::to_string(&FileDependencyRef::from_indices(vec![5])).unwrap(), "5");
    }
}
