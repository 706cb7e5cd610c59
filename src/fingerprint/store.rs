// src/fingerprint/store.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{MonowatchError, Result};
use crate::fingerprint::inputs::InputEnumerator;
use crate::fingerprint::model::{BuildFingerprint, SerializedBuildFingerprint};
use crate::fingerprint::serialize::{deserialize, serialize, PathConverter, PathStyle};
use crate::fs::FileSystem;

/// Result of comparing a project's inputs against its last fingerprint.
#[derive(Debug, Clone)]
pub struct FreshnessCheck {
    /// Fingerprint of the inputs as they are now; persisted after a
    /// successful build.
    pub current: BuildFingerprint,
    pub up_to_date: bool,
}

/// Computes, persists and compares per-project fingerprints.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    fs: Arc<dyn FileSystem>,
    style: PathStyle,
}

impl FingerprintStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_style(fs, PathStyle::native())
    }

    pub fn with_style(fs: Arc<dyn FileSystem>, style: PathStyle) -> Self {
        Self { fs, style }
    }

    /// Fingerprint of `project`'s current inputs. Nothing is written.
    pub fn compute_fingerprint(
        &self,
        project: &str,
        config_hash: &str,
        inputs: &dyn InputEnumerator,
    ) -> Result<BuildFingerprint> {
        let versions = inputs.input_versions()?;
        debug!(project = %project, inputs = versions.len(), "computed fingerprint");
        Ok(BuildFingerprint::new(config_hash, versions))
    }

    /// Serialize `fingerprint` next to `file_path` and atomically replace it.
    pub fn persist(&self, fingerprint: &BuildFingerprint, file_path: &Path) -> Result<()> {
        let serialized = serialize(fingerprint, &self.converter_for(file_path))?;
        let json = serde_json::to_vec_pretty(&serialized)?;
        self.fs.write_atomic(file_path, &json)?;
        debug!(path = ?file_path, "persisted fingerprint");
        Ok(())
    }

    /// `Ok(None)` when there is no fingerprint file; an error when its content
    /// cannot be trusted.
    pub fn try_load(&self, file_path: &Path) -> Result<Option<BuildFingerprint>> {
        if !self.fs.exists(file_path) {
            return Ok(None);
        }

        let source = file_path.to_string_lossy();
        let text = self.fs.read_to_string(file_path)?;
        let serialized: SerializedBuildFingerprint =
            serde_json::from_str(&text).map_err(|e| MonowatchError::CacheCorruption {
                path: source.to_string(),
                reason: e.to_string(),
            })?;
        deserialize(serialized, &self.converter_for(file_path), &source).map(Some)
    }

    /// Like [`try_load`](Self::try_load), but corruption degrades to "no
    /// previous fingerprint" with a warning.
    pub fn load_previous(&self, project: &str, file_path: &Path) -> Option<BuildFingerprint> {
        match self.try_load(file_path) {
            Ok(previous) => previous,
            Err(err) => {
                warn!(
                    project = %project,
                    path = ?file_path,
                    error = %err,
                    "ignoring unreadable fingerprint; project will be rebuilt"
                );
                None
            }
        }
    }

    /// Whether a build described by `previous` is still valid.
    ///
    /// A different `config_hash` short-circuits to `false`. Otherwise the
    /// input sets must be equal, token for token.
    pub fn is_up_to_date(
        previous: &BuildFingerprint,
        config_hash: &str,
        current: &BTreeMap<String, String>,
    ) -> bool {
        if previous.config_hash != config_hash {
            return false;
        }
        previous.input_file_versions == *current
    }

    /// Compute the current fingerprint and compare it with the one stored at
    /// `file_path`.
    pub fn check(
        &self,
        project: &str,
        config_hash: &str,
        inputs: &dyn InputEnumerator,
        file_path: &Path,
    ) -> Result<FreshnessCheck> {
        let current = self.compute_fingerprint(project, config_hash, inputs)?;
        let up_to_date = match self.load_previous(project, file_path) {
            None => {
                debug!(project = %project, "no previous fingerprint");
                false
            }
            Some(previous) => {
                let fresh =
                    Self::is_up_to_date(&previous, config_hash, &current.input_file_versions);
                if !fresh {
                    if previous.config_hash != config_hash {
                        debug!(project = %project, "configuration changed");
                    } else {
                        let diff = previous.diff(&current.input_file_versions);
                        debug!(
                            project = %project,
                            added = ?diff.added,
                            removed = ?diff.removed,
                            modified = ?diff.modified,
                            "inputs changed"
                        );
                    }
                }
                fresh
            }
        };
        Ok(FreshnessCheck { current, up_to_date })
    }

    fn converter_for(&self, file_path: &Path) -> PathConverter {
        let folder = file_path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        PathConverter::new(&folder, self.style)
    }
}
