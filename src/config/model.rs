// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// cache_folder = ".monowatch"
/// parallelism = 4
///
/// [default]
/// exclude = ["node_modules/**", "dist/**"]
///
/// [project.app]
/// path = "apps/app"
/// cmd = "npm run build"
/// dependencies = ["core"]
/// ```
///
/// All sections except `[project.<name>]` are optional and have defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Defaults applied to every project from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All projects from `[project.<name>]`, keyed by project name.
    #[serde(default)]
    pub project: BTreeMap<String, ProjectConfig>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so every dependency name refers to a known project.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    default: DefaultSection,
    project: BTreeMap<String, ProjectConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        project: BTreeMap<String, ProjectConfig>,
    ) -> Self {
        Self {
            config,
            default,
            project,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn default_section(&self) -> &DefaultSection {
        &self.default
    }

    pub fn projects(&self) -> &BTreeMap<String, ProjectConfig> {
        &self.project
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Folder (relative to each project folder) that holds the project's
    /// fingerprint file.
    #[serde(default = "default_cache_folder")]
    pub cache_folder: String,

    /// Delimiter used to split repository-relative paths into segments.
    #[serde(default = "default_path_delimiter")]
    pub path_delimiter: char,

    /// Maximum number of builds running at the same time.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

fn default_cache_folder() -> String {
    ".monowatch".to_string()
}

fn default_path_delimiter() -> char {
    '/'
}

fn default_parallelism() -> usize {
    4
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            cache_folder: default_cache_folder(),
            path_delimiter: default_path_delimiter(),
            parallelism: default_parallelism(),
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    /// Glob patterns (relative to a project folder) that are never inputs.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[project.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Repository-relative folder owned by this project.
    pub path: String,

    /// Shell command that builds the project.
    pub cmd: String,

    /// Names of projects this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Optional project-local exclude patterns.
    ///
    /// If `None`, the project uses `default.exclude`.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,

    /// If true, `default.exclude` is appended to `exclude`; otherwise
    /// `exclude` replaces it.
    #[serde(default)]
    pub append_default_exclude: bool,
}

impl ProjectConfig {
    /// Effective exclude patterns given the `[default]` section.
    pub fn effective_exclude(&self, defaults: &DefaultSection) -> Vec<String> {
        match (&self.exclude, self.append_default_exclude) {
            (Some(list), true) => {
                let mut combined = list.clone();
                combined.extend(defaults.exclude.iter().cloned());
                combined
            }
            (Some(list), false) => list.clone(),
            (None, _) => defaults.exclude.clone(),
        }
    }

    /// Repository-relative folder with leading `./` and trailing delimiters
    /// removed.
    pub fn normalized_path(&self) -> String {
        let trimmed = self.path.trim();
        let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
        trimmed.trim_end_matches(['/', '\\']).to_string()
    }
}
