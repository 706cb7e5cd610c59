// tests/fingerprint_roundtrip.rs

use std::collections::BTreeMap;

use proptest::prelude::*;
use monowatch::fingerprint::{
    deserialize, serialize, BuildFingerprint, PathConverter, PathStyle,
    SerializedBuildFingerprint,
};

fn segments() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z][a-z0-9_]{0,5}", 1..5)
}

fn absolute(root: &str, segments: &[String], style: PathStyle) -> String {
    match style {
        PathStyle::Posix => format!("/{}", segments.join("/")),
        PathStyle::Windows => format!("{root}\\{}", segments.join("\\")),
    }
}

/// A fingerprint whose paths all live on `style`'s filesystem, with some
/// outputs depending on one input and some on several.
fn fingerprint_strategy(style: PathStyle) -> impl Strategy<Value = (String, BuildFingerprint)> {
    let drives = prop_oneof![Just("C:"), Just("D:")];
    (
        drives.clone(),
        segments(),
        proptest::collection::vec((drives, segments(), "[0-9a-f]{8}"), 1..8),
        proptest::collection::vec((segments(), proptest::collection::vec(any::<usize>(), 1..4)), 0..4),
    )
        .prop_map(move |(base_drive, base, inputs, outputs)| {
            let base_folder = absolute(base_drive, &base, style);
            let versions: BTreeMap<String, String> = inputs
                .iter()
                .map(|(drive, segs, token)| (absolute(drive, segs, style), token.clone()))
                .collect();
            let keys: Vec<&String> = versions.keys().collect();

            let deps: BTreeMap<String, Vec<String>> = outputs
                .iter()
                .map(|(segs, picks)| {
                    let out = absolute(base_drive, segs, style);
                    let inputs = picks.iter().map(|i| keys[i % keys.len()].clone()).collect();
                    (out, inputs)
                })
                .collect();

            let fp = BuildFingerprint::new("config-hash", versions.clone());
            let fp = if deps.is_empty() {
                fp
            } else {
                fp.with_file_dependencies(deps)
            };
            (base_folder, fp)
        })
}

fn round_trip(base_folder: &str, fp: &BuildFingerprint, style: PathStyle) -> BuildFingerprint {
    let conv = PathConverter::new(base_folder, style);
    let serialized = serialize(fp, &conv).unwrap();

    // Through JSON, as it is stored on disk.
    let json = serde_json::to_string(&serialized).unwrap();
    assert!(!json.contains('\\'), "on-disk paths use '/': {json}");
    let parsed: SerializedBuildFingerprint = serde_json::from_str(&json).unwrap();

    deserialize(parsed, &conv, "fingerprint.json").unwrap()
}

proptest! {
    #[test]
    fn posix_fingerprints_survive_serialization((base, fp) in fingerprint_strategy(PathStyle::Posix)) {
        prop_assert_eq!(round_trip(&base, &fp, PathStyle::Posix), fp);
    }

    #[test]
    fn windows_fingerprints_survive_serialization((base, fp) in fingerprint_strategy(PathStyle::Windows)) {
        prop_assert_eq!(round_trip(&base, &fp, PathStyle::Windows), fp);
    }
}

#[test]
fn single_and_multiple_dependencies_use_compact_shapes() {
    let conv = PathConverter::new("/repo/app/.monowatch", PathStyle::Posix);
    let fp = BuildFingerprint::new(
        "h",
        BTreeMap::from([
            ("/repo/app/src/a.ts".to_string(), "1".to_string()),
            ("/repo/app/src/b.ts".to_string(), "2".to_string()),
        ]),
    )
    .with_file_dependencies(BTreeMap::from([
        ("/repo/app/dist/a.js".to_string(), vec!["/repo/app/src/a.ts".to_string()]),
        (
            "/repo/app/dist/bundle.js".to_string(),
            vec!["/repo/app/src/a.ts".to_string(), "/repo/app/src/b.ts".to_string()],
        ),
    ]));

    let json = serde_json::to_value(serialize(&fp, &conv).unwrap()).unwrap();
    assert_eq!(
        json["inputFileVersions"],
        serde_json::json!([["../src/a.ts", "1"], ["../src/b.ts", "2"]])
    );
    assert_eq!(
        json["fileDependencies"],
        serde_json::json!([["../dist/a.js", 0], ["../dist/bundle.js", [0, 1]]])
    );
}
