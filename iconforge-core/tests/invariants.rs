//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use iconforge_core::{
    config::{IconMetadata, Platform, ProjectConfig, SkipList},
    hashing::canonical_json,
    manifest::{assemble, manifest_order, IconRecord},
    provenance::{ProvenanceRecord, ProvenanceResolver, ProvenanceSource},
    BuildConfig, BuildPipeline, ColorNormalizer, IconSource, PipelineError,
};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

const ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M0 0h24v24H0z" fill="black"/></svg>"#;

fn normalize(doc: &str) -> String {
    ColorNormalizer::new(&SkipList::default()).normalize(doc).markup
}

fn record(name: &str, ts: i64) -> IconRecord {
    IconRecord::new(
        &IconSource::new(Path::new("icons"), &format!("{}.svg", name)),
        &ProjectConfig::default(),
        ProvenanceRecord::from_instant(
            DateTime::<Utc>::from_timestamp_millis(ts).unwrap(),
            ProvenanceSource::Filesystem,
        ),
        "icons",
    )
}

fn pipeline_for(root: &Path) -> BuildPipeline {
    BuildPipeline::new(BuildConfig {
        input_dir: root.join("icons"),
        out_dir: root.join("sprite"),
        config_dir: root.join("config"),
        use_history: false,
        ..BuildConfig::default()
    })
}

fn write_icon(root: &Path, rel: &str) {
    let path = root.join("icons").join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, ICON).unwrap();
}

#[cfg(feature = "test-hooks")]
#[test]
fn invariant_assemble_calls_validate() {
    use iconforge_core::validation::get_validation_call_count;

    let root = Path::new("/virtual");
    let sources = vec![IconSource::new(root, "close.svg"), IconSource::new(root, "Close.svg")];
    let before = get_validation_call_count();
    // Invalid names fail before provenance is ever consulted.
    let err = assemble(
        &sources,
        &ProjectConfig::default(),
        &ProvenanceResolver::filesystem_only(),
        "icons",
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::ValidationFailed(_)));
    assert!(get_validation_call_count() > before);
}

#[test]
fn invariant_manifest_refuses_invalid_names() {
    let root = Path::new("/virtual");
    let sources = vec![IconSource::new(root, "Bad_Name.svg")];
    let result = assemble(&sources, &ProjectConfig::default(), &ProvenanceResolver::filesystem_only(), "icons");

    // Must fail - validation is enforced
    let err = result.unwrap_err();
    assert!(err.to_string().contains("Validation failed"));
}

#[test]
fn invariant_invalid_names_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_icon(dir.path(), "ok-icon.svg");
    write_icon(dir.path(), "Not_Kebab.svg");

    let err = pipeline_for(dir.path()).run().unwrap_err();
    assert!(matches!(err, PipelineError::ValidationFailed(_)));
    assert!(!dir.path().join("sprite").exists());
}

#[test]
fn invariant_mask_content_never_rewritten() {
    let doc = r##"<svg><symbol id="eye"><mask id="m"><rect fill="#000000"/><circle fill="black"/></mask><path fill="black" mask="url(#m)"/></symbol></svg>"##;
    let out = normalize(doc);

    assert!(out.contains(r##"<mask id="m"><rect fill="#000000"/><circle fill="black"/></mask>"##));
    assert!(out.contains(r#"<path fill="currentColor" mask="url(#m)"/>"#));
}

#[test]
fn invariant_skip_listed_symbol_keeps_black() {
    let doc = r#"<svg><symbol id="logo"><path fill="black"/></symbol></svg>"#;
    let skip = SkipList::from_entries(["logo.svg"]);
    assert_eq!(ColorNormalizer::new(&skip).normalize(doc).markup, doc);
}

#[test]
fn invariant_normalizer_idempotent() {
    let doc = r##"<svg><symbol id="a"><mask><p fill="#000"/></mask><p fill="black"/><p stroke="#000000"/></symbol><symbol id="b"><p FILL="BLACK"/></symbol></svg>"##;
    let once = normalize(doc);
    let twice = normalize(&once);
    assert_eq!(once, twice);
}

#[test]
fn invariant_no_residue_for_any_mask_count() {
    let docs = [
        r#"<symbol id="z"><p fill="black"/></symbol>"#,
        r#"<symbol id="o"><mask><p fill="black"/></mask><p fill="black"/></symbol>"#,
        r#"<symbol id="m"><mask><a fill="black"/></mask><mask><b fill="black"/></mask><mask><c fill="black"/></mask></symbol>"#,
    ];
    let expected_rewrites = [1, 1, 0];

    for (doc, rewrites) in docs.iter().zip(expected_rewrites) {
        let out = normalize(doc);
        // Each rewrite swaps `black` for `currentColor`; nothing else may change length.
        let grown = "currentColor".len() - "black".len();
        assert_eq!(out.len(), doc.len() + rewrites * grown, "{}", out);
        assert_eq!(out.matches("<mask>").count(), doc.matches("<mask>").count());
        assert_eq!(out.matches("</mask>").count(), doc.matches("</mask>").count());
    }
}

#[test]
fn invariant_manifest_order() {
    let mut icons = vec![record("b", 100), record("zeta", 300), record("alpha", 300)];
    icons.sort_by(manifest_order);

    let names: Vec<_> = icons.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta", "b"]);
}

#[test]
fn invariant_missing_metadata_defaults() {
    let icon = record("close", 0);
    let json = serde_json::to_value(&icon).unwrap();

    assert_eq!(json["platforms"], serde_json::json!(["default"]));
    assert_eq!(json["keywords"], serde_json::json!([]));
    assert_eq!(json["legacyIdentifiers"], serde_json::json!([]));
    assert_eq!(json["semanticColors"], serde_json::json!([]));
    assert!(json["note"].is_null());
    assert!(json["category"].is_null());
}

#[test]
fn invariant_default_platform_is_web_eligible() {
    assert!(IconMetadata::default().is_web_eligible());
    assert_eq!(IconMetadata::default().platforms, vec![Platform::Default]);
}

#[test]
fn invariant_canonical_json_deterministic() {
    use serde_json::json;

    let obj1 = json!({"z": 1, "a": 2, "m": {"b": 1, "a": 2}});
    let obj2 = json!({"a": 2, "m": {"a": 2, "b": 1}, "z": 1});

    // Must be identical despite different input ordering
    assert_eq!(canonical_json(&obj1).unwrap(), canonical_json(&obj2).unwrap());
}
