// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{MonowatchError, Result};
use crate::fingerprint::hash::compute_config_hash;
use crate::lookup::{dirty_projects_where, PathTrie};

/// Stable handle of a project inside its [`ProjectGraph`].
pub type ProjectId = NodeIndex;

/// File name of the per-project fingerprint inside the cache folder.
pub const FINGERPRINT_FILE_NAME: &str = "fingerprint.json";

/// A buildable unit of the monorepo.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    /// Repository-relative folder, delimiter-separated, no trailing delimiter.
    pub path: String,
    pub cmd: String,
    /// Effective exclude globs, relative to the project folder.
    pub exclude: Vec<String>,
    /// Digest of everything in the config that affects the build output.
    pub config_hash: String,
}

/// Memo state for the critical path walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Uncomputed,
    InProgress,
    Done(usize),
}

/// Project dependency graph.
///
/// Nodes own the [`Project`]s; edges point from a dependency to its
/// consumer, so `consumers_of` is simply the outgoing neighbourhood. Critical
/// path lengths are computed once at construction, which is also where a
/// dependency cycle is rejected.
#[derive(Debug, Clone)]
pub struct ProjectGraph {
    graph: DiGraph<Project, ()>,
    by_name: HashMap<String, ProjectId>,
    critical_path: Vec<usize>,
    /// Compiled `Project::exclude`, indexed by node.
    excludes: Vec<GlobSet>,
    delimiter: char,
    cache_folder: String,
}

impl ProjectGraph {
    /// Build the graph from a validated [`ConfigFile`].
    ///
    /// Fails with [`MonowatchError::DependencyCycle`] if the dependencies are
    /// cyclic.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let defaults = cfg.default_section();
        let mut graph: DiGraph<Project, ()> = DiGraph::new();
        let mut by_name = HashMap::new();
        let mut excludes = Vec::new();

        for (name, pc) in cfg.projects() {
            let path = pc.normalized_path();
            let exclude = pc.effective_exclude(defaults);
            excludes.push(compile_excludes(name, &exclude)?);
            let config_hash = compute_config_hash(&pc.cmd, &path, &exclude);
            let id = graph.add_node(Project {
                name: name.clone(),
                path,
                cmd: pc.cmd.clone(),
                exclude,
                config_hash,
            });
            by_name.insert(name.clone(), id);
        }

        for (name, pc) in cfg.projects() {
            let consumer = by_name[name];
            for dep in &pc.dependencies {
                let dependency = by_name
                    .get(dep)
                    .copied()
                    .ok_or_else(|| MonowatchError::ProjectNotFound(dep.clone()))?;
                graph.update_edge(dependency, consumer, ());
            }
        }

        let critical_path = compute_critical_path_lengths(&graph)?;

        Ok(Self {
            graph,
            by_name,
            critical_path,
            excludes,
            delimiter: cfg.config_section().path_delimiter,
            cache_folder: cfg.config_section().cache_folder.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All project ids in insertion (name) order.
    pub fn ids(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.graph.node_indices()
    }

    pub fn project(&self, id: ProjectId) -> &Project {
        &self.graph[id]
    }

    pub fn name(&self, id: ProjectId) -> &str {
        &self.graph[id].name
    }

    pub fn id_of(&self, name: &str) -> Option<ProjectId> {
        self.by_name.get(name).copied()
    }

    /// Direct dependencies, sorted by id.
    pub fn dependencies_of(&self, id: ProjectId) -> Vec<ProjectId> {
        self.sorted_neighbors(id, Direction::Incoming)
    }

    /// Direct consumers (projects depending on `id`), sorted by id.
    pub fn consumers_of(&self, id: ProjectId) -> Vec<ProjectId> {
        self.sorted_neighbors(id, Direction::Outgoing)
    }

    /// Projects without dependencies.
    pub fn roots(&self) -> Vec<ProjectId> {
        self.ids()
            .filter(|id| {
                self.graph
                    .neighbors_directed(*id, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Every project reachable through consumer edges, excluding `id`.
    pub fn transitive_consumers(&self, id: ProjectId) -> BTreeSet<ProjectId> {
        let mut seen = BTreeSet::new();
        let mut stack = self.consumers_of(id);
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.consumers_of(next));
            }
        }
        seen
    }

    /// Length of the longest consumer chain downstream of `id`.
    ///
    /// `0` for a project nothing depends on.
    pub fn critical_path_length(&self, id: ProjectId) -> usize {
        self.critical_path[id.index()]
    }

    /// Whether `relative` (a `/`-separated path inside the project folder)
    /// or one of its ancestor folders matches the project's exclude globs.
    pub fn is_excluded(&self, id: ProjectId, relative: &str) -> bool {
        let globs = &self.excludes[id.index()];
        if relative.is_empty() || globs.is_empty() {
            return false;
        }
        relative
            .match_indices('/')
            .map(|(end, _)| &relative[..end])
            .chain(std::iter::once(relative))
            .any(|candidate| globs.is_match(candidate))
    }

    /// Projects dirtied by `changed` repository-relative paths, ignoring
    /// paths excluded by their owner.
    pub fn dirty_projects<I, P>(&self, index: &PathTrie<ProjectId>, changed: I) -> BTreeSet<ProjectId>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        dirty_projects_where(index, changed, |id, relative| !self.is_excluded(*id, relative))
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn cache_folder(&self) -> &str {
        &self.cache_folder
    }

    /// Path ownership index over every project folder.
    pub fn path_index(&self) -> PathTrie<ProjectId> {
        PathTrie::from_entries(
            self.ids().map(|id| (self.graph[id].path.as_str(), id)),
            self.delimiter,
        )
    }

    /// Absolute folder of a project under `repo_root`.
    pub fn project_folder(&self, repo_root: &Path, id: ProjectId) -> PathBuf {
        let mut folder = repo_root.to_path_buf();
        for segment in crate::lookup::iterate_segments(&self.graph[id].path, self.delimiter) {
            folder.push(segment);
        }
        folder
    }

    /// Absolute path of a project's fingerprint file under `repo_root`.
    pub fn fingerprint_path(&self, repo_root: &Path, id: ProjectId) -> PathBuf {
        self.project_folder(repo_root, id)
            .join(&self.cache_folder)
            .join(FINGERPRINT_FILE_NAME)
    }

    /// Folders of other projects nested inside `id`'s folder.
    pub fn nested_project_folders(&self, repo_root: &Path, id: ProjectId) -> Vec<PathBuf> {
        let own = &self.graph[id].path;
        let prefix = format!("{}{}", own, self.delimiter);
        self.ids()
            .filter(|other| {
                *other != id && (own.is_empty() || self.graph[*other].path.starts_with(&prefix))
            })
            .map(|other| self.project_folder(repo_root, other))
            .collect()
    }

    fn sorted_neighbors(&self, id: ProjectId, direction: Direction) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self.graph.neighbors_directed(id, direction).collect();
        ids.sort();
        ids
    }
}

fn compile_excludes(project: &str, patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| {
            MonowatchError::ConfigError(format!(
                "project '{project}': invalid exclude glob '{pattern}': {err}"
            ))
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| {
        MonowatchError::ConfigError(format!("project '{project}': exclude globs: {err}"))
    })
}

/// Memoized depth-first walk over consumer edges.
///
/// A project seen again while still `InProgress` closes a cycle; the error
/// names every project on it.
fn compute_critical_path_lengths(graph: &DiGraph<Project, ()>) -> Result<Vec<usize>> {
    let mut marks = vec![Visit::Uncomputed; graph.node_count()];
    let mut trail = Vec::new();

    for id in graph.node_indices() {
        visit(graph, id, &mut marks, &mut trail)?;
    }

    Ok(marks
        .into_iter()
        .map(|mark| match mark {
            Visit::Done(len) => len,
            Visit::Uncomputed | Visit::InProgress => 0,
        })
        .collect())
}

fn visit(
    graph: &DiGraph<Project, ()>,
    id: ProjectId,
    marks: &mut [Visit],
    trail: &mut Vec<ProjectId>,
) -> Result<usize> {
    match marks[id.index()] {
        Visit::Done(len) => return Ok(len),
        Visit::InProgress => {
            let start = trail.iter().position(|t| *t == id).unwrap_or(0);
            let mut names: Vec<&str> = trail[start..]
                .iter()
                .map(|t| graph[*t].name.as_str())
                .collect();
            names.push(graph[id].name.as_str());
            return Err(MonowatchError::DependencyCycle(format!(
                "project '{}' depends on itself through: {}",
                graph[id].name,
                names.join(" -> ")
            )));
        }
        Visit::Uncomputed => {}
    }

    marks[id.index()] = Visit::InProgress;
    trail.push(id);

    let mut longest: Option<usize> = None;
    for consumer in graph.neighbors_directed(id, Direction::Outgoing) {
        let len = visit(graph, consumer, marks, trail)?;
        longest = Some(longest.map_or(len, |l| l.max(len)));
    }

    trail.pop();
    let len = longest.map_or(0, |l| l + 1);
    marks[id.index()] = Visit::Done(len);
    debug!(project = %graph[id].name, critical_path_length = len, "computed critical path length");
    Ok(len)
}
