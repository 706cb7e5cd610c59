// src/fingerprint/inputs.rs

//! Input enumeration for fingerprint computation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, trace};

use crate::errors::Result;
use crate::fingerprint::cache::VersionTokenCache;
use crate::fs::FileSystem;

/// Source of `{absolute path: version token}` pairs for one project.
pub trait InputEnumerator {
    fn input_versions(&self) -> Result<BTreeMap<String, String>>;
}

/// A fixed input set, mostly useful in tests.
impl InputEnumerator for BTreeMap<String, String> {
    fn input_versions(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.clone())
    }
}

/// What to enumerate for a project.
#[derive(Debug, Clone, Default)]
pub struct InputSpec {
    /// Absolute project folder.
    pub folder: PathBuf,
    /// Globs relative to `folder` whose matches are not inputs.
    pub exclude: Vec<String>,
    /// Name of the per-project cache folder, skipped during the walk.
    pub cache_folder: String,
    /// Folders of nested projects; their files belong to them.
    pub skip_folders: Vec<PathBuf>,
    /// Extra files that are inputs when they exist (dependency fingerprints).
    pub extra_files: Vec<PathBuf>,
}

/// Walks a project folder through the [`FileSystem`] abstraction.
#[derive(Debug, Clone)]
pub struct ProjectInputs {
    spec: InputSpec,
    exclude: GlobSet,
    fs: Arc<dyn FileSystem>,
    tokens: Arc<VersionTokenCache>,
}

impl ProjectInputs {
    pub fn new(
        spec: InputSpec,
        fs: Arc<dyn FileSystem>,
        tokens: Arc<VersionTokenCache>,
    ) -> Result<Self> {
        let exclude = build_globset(&spec.exclude)?;
        Ok(Self {
            spec,
            exclude,
            fs,
            tokens,
        })
    }

    pub fn spec(&self) -> &InputSpec {
        &self.spec
    }

    /// Every file under the project folder that counts as an input.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let root = &self.spec.folder;
        let mut files = Vec::new();
        if !self.fs.is_dir(root) {
            debug!(folder = ?root, "project folder does not exist; no source inputs");
            return Ok(files);
        }

        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            for path in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&path) {
                    if self.skip_dir(&path) {
                        trace!(dir = ?path, "skipping folder");
                    } else {
                        stack.push(path);
                    }
                } else if self.fs.is_file(&path) {
                    let rel = relative_slash(root, &path);
                    if !self.exclude.is_match(&rel) {
                        files.push(path);
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn skip_dir(&self, dir: &Path) -> bool {
        let is_cache = dir.parent() == Some(self.spec.folder.as_path())
            && dir.file_name().is_some_and(|n| n == self.spec.cache_folder.as_str());
        if is_cache || self.spec.skip_folders.iter().any(|f| f == dir) {
            return true;
        }
        let rel = relative_slash(&self.spec.folder, dir);
        self.exclude.is_match(&rel)
    }
}

impl InputEnumerator for ProjectInputs {
    fn input_versions(&self) -> Result<BTreeMap<String, String>> {
        let mut versions = BTreeMap::new();

        let extras = self.spec.extra_files.iter().filter(|p| self.fs.is_file(p));
        for path in self.collect_files()?.iter().chain(extras) {
            let token = self.tokens.get_or_compute(self.fs.as_ref(), path)?;
            versions.insert(path.to_string_lossy().into_owned(), token);
        }

        debug!(
            folder = ?self.spec.folder,
            inputs = versions.len(),
            "enumerated project inputs"
        );
        Ok(versions)
    }
}

fn relative_slash(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build().context("building exclude glob set")?)
}
