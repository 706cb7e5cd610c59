// tests/fingerprint_store.rs

mod common;
use crate::common::init_tracing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use monowatch::fingerprint::{
    FingerprintStore, InputSpec, PathStyle, ProjectInputs, VersionTokenCache,
};
use monowatch::fs::mock::MockFileSystem;
use monowatch::fs::{FileSystem, RealFileSystem};

const FINGERPRINT: &str = "/repo/app/.monowatch/fingerprint.json";

fn app_spec() -> InputSpec {
    InputSpec {
        folder: PathBuf::from("/repo/app"),
        exclude: vec!["dist/**".to_string()],
        cache_folder: ".monowatch".to_string(),
        ..InputSpec::default()
    }
}

fn setup() -> (MockFileSystem, FingerprintStore, Arc<VersionTokenCache>) {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/repo/app/src/main.ts", "console.log(1)");
    fs.add_file("/repo/app/package.json", "{}");
    fs.add_file("/repo/app/dist/main.js", "compiled");
    let store = FingerprintStore::with_style(Arc::new(fs.clone()), PathStyle::Posix);
    (fs, store, Arc::new(VersionTokenCache::new()))
}

fn inputs(fs: &MockFileSystem, tokens: &Arc<VersionTokenCache>) -> ProjectInputs {
    ProjectInputs::new(app_spec(), Arc::new(fs.clone()), tokens.clone()).unwrap()
}

#[test]
fn unchanged_inputs_are_up_to_date_after_persist() {
    let (fs, store, tokens) = setup();
    let file = Path::new(FINGERPRINT);

    let first = store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap();
    assert!(!first.up_to_date, "no fingerprint yet");
    assert_eq!(first.current.input_file_versions.len(), 2, "dist/ is excluded");
    store.persist(&first.current, file).unwrap();

    // Persisting never turns the fingerprint file itself into an input.
    let second = store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap();
    assert!(second.up_to_date);
    assert_eq!(second.current, first.current);
}

#[test]
fn edited_input_or_config_makes_project_stale() {
    let (fs, store, tokens) = setup();
    let file = Path::new(FINGERPRINT);
    let first = store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap();
    store.persist(&first.current, file).unwrap();

    assert!(!store.check("app", "other-cfg", &inputs(&fs, &tokens), file).unwrap().up_to_date);

    fs.add_file("/repo/app/src/main.ts", "console.log(2)");
    tokens.invalidate(Path::new("/repo/app/src/main.ts"));
    assert!(!store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap().up_to_date);
}

#[test]
fn added_and_removed_inputs_make_project_stale() {
    let (fs, store, tokens) = setup();
    let file = Path::new(FINGERPRINT);
    let first = store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap();
    store.persist(&first.current, file).unwrap();

    fs.add_file("/repo/app/src/extra.ts", "new");
    assert!(!store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap().up_to_date);

    fs.remove_file("/repo/app/src/extra.ts");
    assert!(store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap().up_to_date);

    fs.remove_file("/repo/app/package.json");
    assert!(!store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap().up_to_date);
}

#[test]
fn corrupt_fingerprint_means_rebuild_not_error() {
    let (fs, store, tokens) = setup();
    let file = Path::new(FINGERPRINT);

    fs.add_file(file, r#"{"configHash":"cfg","inputFileVersions":[["../src/main.ts","x"]],"fileDependencies":[["../out",7]]}"#);
    assert!(store.try_load(file).unwrap_err().is_cache_corruption());

    let check = store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap();
    assert!(!check.up_to_date);

    // The next persist repairs it.
    store.persist(&check.current, file).unwrap();
    assert!(store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap().up_to_date);
}

#[test]
fn failed_write_surfaces_as_error_and_leaves_project_stale() {
    let (fs, store, tokens) = setup();
    let file = Path::new(FINGERPRINT);
    let check = store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap();

    fs.set_fail_writes(true);
    assert!(store.persist(&check.current, file).is_err());
    assert!(!fs.exists(file));
    assert!(!store.check("app", "cfg", &inputs(&fs, &tokens), file).unwrap().up_to_date);
}

#[test]
fn persist_on_real_filesystem_is_atomic_and_reloadable() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("app/src")).unwrap();
    std::fs::write(root.join("app/src/lib.rs"), "pub fn f() {}").unwrap();

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let store = FingerprintStore::new(fs.clone());
    let tokens = Arc::new(VersionTokenCache::new());
    let spec = InputSpec {
        folder: root.join("app"),
        cache_folder: ".monowatch".to_string(),
        ..InputSpec::default()
    };
    let file = root.join("app/.monowatch/fingerprint.json");

    let inputs = ProjectInputs::new(spec.clone(), fs.clone(), tokens.clone()).unwrap();
    let check = store.check("app", "cfg", &inputs, &file).unwrap();
    store.persist(&check.current, &file).unwrap();
    store.persist(&check.current, &file).unwrap();

    let leftovers = fs.read_dir(file.parent().unwrap()).unwrap();
    assert_eq!(leftovers, vec![file.clone()]);

    let raw = std::fs::read_to_string(&file).unwrap();
    assert!(raw.contains("../src/lib.rs"), "{raw}");
    assert_eq!(store.try_load(&file).unwrap(), Some(check.current.clone()));

    // A fresh session (empty token cache) agrees.
    let fresh = ProjectInputs::new(spec, fs, Arc::new(VersionTokenCache::new())).unwrap();
    assert!(store.check("app", "cfg", &fresh, &file).unwrap().up_to_date);
}
