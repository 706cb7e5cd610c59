// src/config/validate.rs

use std::collections::HashMap;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MonowatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::MonowatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.default, raw.project))
    }
}

/// Validate a raw config without consuming it.
///
/// Cycles are not checked here; they surface as a fatal
/// `DependencyCycle` when the project graph computes critical path lengths.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_projects(cfg)?;
    validate_global_config(cfg)?;
    validate_project_dependencies(cfg)?;
    validate_project_paths(cfg)?;
    validate_exclude_patterns(cfg)?;
    Ok(())
}

fn ensure_has_projects(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.is_empty() {
        return Err(MonowatchError::ConfigError(
            "config must contain at least one [project.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.parallelism == 0 {
        return Err(MonowatchError::ConfigError(
            "[config].parallelism must be >= 1 (got 0)".to_string(),
        ));
    }

    let cache_folder = cfg.config.cache_folder.trim();
    if cache_folder.is_empty() || cache_folder.contains("..") {
        return Err(MonowatchError::ConfigError(format!(
            "[config].cache_folder must be a folder inside the project (got {:?})",
            cfg.config.cache_folder
        )));
    }

    Ok(())
}

fn validate_project_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, project) in cfg.project.iter() {
        for dep in project.dependencies.iter() {
            if !cfg.project.contains_key(dep) {
                return Err(MonowatchError::ConfigError(format!(
                    "project '{}' has unknown dependency '{}'",
                    name, dep
                )));
            }
            if dep == name {
                return Err(MonowatchError::ConfigError(format!(
                    "project '{}' cannot depend on itself",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_project_paths(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (name, project) in cfg.project.iter() {
        let path = project.normalized_path();
        if path.is_empty() {
            return Err(MonowatchError::ConfigError(format!(
                "project '{}' must declare a non-empty `path`",
                name
            )));
        }
        if let Some(other) = seen.insert(path.clone(), name) {
            return Err(MonowatchError::ConfigError(format!(
                "projects '{}' and '{}' both claim path '{}'",
                other, name, path
            )));
        }
    }

    Ok(())
}

fn validate_exclude_patterns(cfg: &RawConfigFile) -> Result<()> {
    for (name, project) in cfg.project.iter() {
        for pattern in project.effective_exclude(&cfg.default) {
            if let Err(err) = Glob::new(&pattern) {
                return Err(MonowatchError::ConfigError(format!(
                    "project '{}' has invalid exclude pattern '{}': {}",
                    name, pattern, err
                )));
            }
        }
    }
    Ok(())
}
