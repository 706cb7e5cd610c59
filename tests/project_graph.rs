// tests/project_graph.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, ProjectConfigBuilder};
use crate::common::{graph_of, id};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use monowatch::lookup::dirty_projects;

/// core <- ui <- web, core <- web, tools (standalone), web/plugins/p nested in web.
fn repo() -> monowatch::config::ConfigFile {
    ConfigFileBuilder::new()
        .with_default_exclude("node_modules/**")
        .with_project("core", ProjectConfigBuilder::new("libs/core", "make").build())
        .with_project("ui", ProjectConfigBuilder::new("libs/ui", "make").depends_on("core").build())
        .with_project(
            "web",
            ProjectConfigBuilder::new("apps/web", "npm run build")
                .depends_on("ui")
                .depends_on("core")
                .exclude("dist/**")
                .append_default_exclude(true)
                .build(),
        )
        .with_project("plugin", ProjectConfigBuilder::new("apps/web/plugins/p", "make").build())
        .with_project("tools", ProjectConfigBuilder::new("tools", "make").build())
        .build()
}

#[test]
fn critical_path_counts_longest_consumer_chain() {
    let g = graph_of(&repo());
    assert_eq!(g.critical_path_length(id(&g, "core")), 2);
    assert_eq!(g.critical_path_length(id(&g, "ui")), 1);
    assert_eq!(g.critical_path_length(id(&g, "web")), 0);
    assert_eq!(g.critical_path_length(id(&g, "tools")), 0);
}

#[test]
fn roots_and_transitive_consumers() {
    let g = graph_of(&repo());
    let roots: BTreeSet<&str> = g.roots().into_iter().map(|r| g.name(r)).collect();
    assert_eq!(roots, BTreeSet::from(["core", "plugin", "tools"]));

    let downstream: BTreeSet<&str> = g
        .transitive_consumers(id(&g, "core"))
        .into_iter()
        .map(|c| g.name(c))
        .collect();
    assert_eq!(downstream, BTreeSet::from(["ui", "web"]));
    assert_eq!(g.dependencies_of(id(&g, "web")), vec![id(&g, "core"), id(&g, "ui")]);
}

#[test]
fn effective_excludes_and_config_hash() {
    let g = graph_of(&repo());
    assert_eq!(g.project(id(&g, "web")).exclude, vec!["dist/**", "node_modules/**"]);
    assert_eq!(g.project(id(&g, "core")).exclude, vec!["node_modules/**"]);
    assert_ne!(
        g.project(id(&g, "core")).config_hash,
        g.project(id(&g, "ui")).config_hash
    );
}

#[test]
fn changed_files_map_to_nearest_owner() {
    let g = graph_of(&repo());
    let index = g.path_index();

    let dirty = dirty_projects(
        &index,
        [
            "apps/web/src/index.ts",
            "apps/web/plugins/p/main.ts",
            "libs/core",
            "docs/readme.md",
        ],
    );
    let names: BTreeSet<&str> = dirty.into_iter().map(|d| g.name(d)).collect();
    assert_eq!(names, BTreeSet::from(["core", "plugin", "web"]));
}

#[test]
fn folders_and_fingerprint_locations() {
    let g = graph_of(&repo());
    let root = Path::new("/repo");
    let web = id(&g, "web");

    assert_eq!(g.project_folder(root, web), PathBuf::from("/repo/apps/web"));
    assert_eq!(
        g.fingerprint_path(root, web),
        PathBuf::from("/repo/apps/web/.monowatch/fingerprint.json")
    );
    assert_eq!(
        g.nested_project_folders(root, web),
        vec![PathBuf::from("/repo/apps/web/plugins/p")]
    );
    assert!(g.nested_project_folders(root, id(&g, "core")).is_empty());
}

#[test]
fn excluded_changes_dirty_nothing() {
    let g = graph_of(&repo());
    let web = id(&g, "web");

    assert!(g.is_excluded(web, "dist/main.js"));
    assert!(g.is_excluded(web, "node_modules/react/index.js"));
    assert!(!g.is_excluded(web, "src/dist.ts"));
    assert!(!g.is_excluded(web, ""));
    assert!(!g.is_excluded(id(&g, "core"), "dist/main.js"));

    let dirty = g.dirty_projects(
        &g.path_index(),
        ["apps/web/dist/main.js", "apps/web/node_modules/x/y.js", "libs/core/dist/a.js"],
    );
    let names: BTreeSet<&str> = dirty.into_iter().map(|d| g.name(d)).collect();
    assert_eq!(names, BTreeSet::from(["core"]));
}
