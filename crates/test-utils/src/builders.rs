#![allow(dead_code)]

use std::collections::BTreeMap;
use monowatch::config::{ConfigFile, ConfigSection, DefaultSection, ProjectConfig, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                project: BTreeMap::new(),
            },
        }
    }

    pub fn with_project(mut self, name: &str, project: ProjectConfig) -> Self {
        self.config.project.insert(name.to_string(), project);
        self
    }

    pub fn with_default_exclude(mut self, pattern: &str) -> Self {
        self.config.default.exclude.push(pattern.to_string());
        self
    }

    pub fn with_cache_folder(mut self, folder: &str) -> Self {
        self.config.config.cache_folder = folder.to_string();
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.config.config.parallelism = parallelism;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProjectConfig`.
pub struct ProjectConfigBuilder {
    project: ProjectConfig,
}

impl ProjectConfigBuilder {
    pub fn new(path: &str, cmd: &str) -> Self {
        Self {
            project: ProjectConfig {
                path: path.to_string(),
                cmd: cmd.to_string(),
                dependencies: vec![],
                exclude: None,
                append_default_exclude: false,
            },
        }
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.project.dependencies.push(dep.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        let excludes = self.project.exclude.get_or_insert(vec![]);
        excludes.push(pattern.to_string());
        self
    }

    pub fn append_default_exclude(mut self, val: bool) -> Self {
        self.project.append_default_exclude = val;
        self
    }

    pub fn build(self) -> ProjectConfig {
        self.project
    }
}
