// src/exec/context.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dag::{ProjectGraph, ProjectId};
use crate::fingerprint::{FingerprintStore, InputSpec, ProjectInputs, VersionTokenCache};
use crate::errors::Result;
use crate::fs::FileSystem;

/// Everything a build worker needs besides the build itself.
///
/// Owned by one session and shared by its workers.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub graph: Arc<ProjectGraph>,
    pub repo_root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub tokens: Arc<VersionTokenCache>,
    pub store: FingerprintStore,
}

impl BuildContext {
    pub fn new(
        graph: Arc<ProjectGraph>,
        repo_root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        tokens: Arc<VersionTokenCache>,
    ) -> Self {
        let store = FingerprintStore::new(fs.clone());
        Self {
            graph,
            repo_root: repo_root.into(),
            fs,
            tokens,
            store,
        }
    }

    pub fn project_folder(&self, id: ProjectId) -> PathBuf {
        self.graph.project_folder(&self.repo_root, id)
    }

    pub fn fingerprint_path(&self, id: ProjectId) -> PathBuf {
        self.graph.fingerprint_path(&self.repo_root, id)
    }

    /// Inputs of `id`: its own files plus the fingerprint files of its
    /// direct dependencies.
    pub fn input_spec(&self, id: ProjectId) -> InputSpec {
        InputSpec {
            folder: self.project_folder(id),
            exclude: self.graph.project(id).exclude.clone(),
            cache_folder: self.graph.cache_folder().to_string(),
            skip_folders: self.graph.nested_project_folders(&self.repo_root, id),
            extra_files: self
                .graph
                .dependencies_of(id)
                .into_iter()
                .map(|dep| self.fingerprint_path(dep))
                .collect(),
        }
    }

    pub fn inputs(&self, id: ProjectId) -> Result<ProjectInputs> {
        ProjectInputs::new(self.input_spec(id), self.fs.clone(), self.tokens.clone())
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}
