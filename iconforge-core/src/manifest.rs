//! Manifest Assembly
//!
//! Joins discovered sources, project metadata and provenance into one
//! record per icon. Newest first; equal timestamps fall back to name.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;

use crate::config::{Platform, ProjectConfig, SemanticColor};
use crate::pipeline::PipelineError;
use crate::provenance::{ProvenanceRecord, ProvenanceResolver};
use crate::source::IconSource;
use crate::validation::Validator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconRecord {
    pub name: String,
    /// Path relative to the input root.
    pub file: String,
    pub svg_path: String,
    pub platforms: Vec<Platform>,
    pub added_date: NaiveDate,
    pub added_ts: i64,
    pub legacy_identifiers: Vec<String>,
    pub semantic_colors: Vec<SemanticColor>,
    pub keywords: Vec<String>,
    pub note: Option<String>,
    pub category: Option<String>,
}

impl IconRecord {
    pub fn new(source: &IconSource, config: &ProjectConfig, provenance: ProvenanceRecord, input_dir: &str) -> Self {
        let meta = config.metadata.lookup(&source.name);
        Self {
            name: source.name.clone(),
            file: source.relative_path.clone(),
            svg_path: format!("{}/{}", input_dir.trim_end_matches('/'), source.relative_path),
            platforms: meta.platforms,
            added_date: provenance.added_date,
            added_ts: provenance.added_ts,
            legacy_identifiers: meta.legacy_identifiers,
            semantic_colors: meta.semantic_colors,
            keywords: meta.keywords,
            note: meta.note,
            category: meta.category,
        }
    }
}

/// Newest first, then name ascending (byte-wise).
pub fn manifest_order(a: &IconRecord, b: &IconRecord) -> Ordering {
    b.added_ts.cmp(&a.added_ts).then_with(|| a.name.cmp(&b.name))
}

fn iso_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(serialize_with = "iso_millis")]
    pub generated_at: DateTime<Utc>,
    pub input_dir: String,
    pub sprite_path: String,
    pub icons: Vec<IconRecord>,
}

impl Manifest {
    pub fn new(icons: Vec<IconRecord>, input_dir: impl Into<String>, sprite_path: impl Into<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            input_dir: input_dir.into(),
            sprite_path: sprite_path.into(),
            icons,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, PipelineError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Builds the ordered icon records.
///
/// Always validates first; no record is built for an invalid icon set.
pub fn assemble(
    sources: &[IconSource],
    config: &ProjectConfig,
    resolver: &ProvenanceResolver,
    input_dir: &str,
) -> Result<Vec<IconRecord>, PipelineError> {
    Validator::new().enforce(sources, config)?;

    let mut icons = sources
        .par_iter()
        .map(|source| {
            let provenance = resolver
                .resolve(&source.absolute_path)
                .map_err(|e| PipelineError::io(&source.absolute_path, e))?;
            Ok(IconRecord::new(source, config, provenance, input_dir))
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    icons.sort_by(manifest_order);
    Ok(icons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IconMetadata;
    use crate::provenance::{HistorySource, ProvenanceSource};
    use chrono::FixedOffset;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    struct TableHistory(HashMap<PathBuf, &'static str>);

    impl HistorySource for TableHistory {
        fn name(&self) -> &'static str { "table" }

        fn first_added(&self, path: &Path) -> Option<DateTime<FixedOffset>> {
            DateTime::parse_from_rfc3339(self.0.get(path)?).ok()
        }
    }

    fn record(name: &str, ts: i64) -> IconRecord {
        IconRecord::new(
            &IconSource::new(Path::new("icons"), &format!("{}.svg", name)),
            &ProjectConfig::default(),
            ProvenanceRecord::from_instant(
                DateTime::<Utc>::from_timestamp_millis(ts).unwrap(),
                ProvenanceSource::History,
            ),
            "icons",
        )
    }

    #[test]
    fn test_order_newest_first_then_name() {
        let mut icons = vec![record("b", 100), record("zeta", 300), record("alpha", 300)];
        icons.sort_by(manifest_order);
        let names: Vec<_> = icons.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta", "b"]);
    }

    #[test]
    fn test_name_tiebreak_is_case_sensitive() {
        let mut icons = vec![record("b", 1), record("B", 1), record("a", 1)];
        icons.sort_by(manifest_order);
        let names: Vec<_> = icons.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["B", "a", "b"]);
    }

    #[test]
    fn test_defaults_without_metadata() {
        let icon = record("close", 0);
        assert_eq!(icon.platforms, vec![Platform::Default]);
        assert!(icon.keywords.is_empty());
        assert!(icon.legacy_identifiers.is_empty());
        assert!(icon.semantic_colors.is_empty());
        assert_eq!(icon.note, None);
        assert_eq!(icon.category, None);
        assert_eq!(icon.svg_path, "icons/close.svg");

        let json = serde_json::to_value(&icon).unwrap();
        assert_eq!(json["platforms"], serde_json::json!(["default"]));
        assert!(json["note"].is_null());
        assert!(json["category"].is_null());
        assert_eq!(json["addedDate"], "1970-01-01");
    }

    #[test]
    fn test_assemble_joins_metadata_and_history() {
        let root = Path::new("/virtual/icons");
        let sources = vec![
            IconSource::new(root, "old.svg"),
            IconSource::new(root, "nested/new.svg"),
        ];
        let history = TableHistory(HashMap::from([
            (root.join("old.svg"), "2020-01-01T00:00:00Z"),
            (root.join("nested/new.svg"), "2023-06-15T12:00:00+02:00"),
        ]));

        let mut config = ProjectConfig::default();
        config.metadata.insert(
            "nested/new",
            IconMetadata::from_value(&serde_json::json!({
                "platforms": ["web", "ios"],
                "keywords": "fresh",
                "semanticColors": ["#ff0000"]
            })),
        );

        let icons = assemble(&sources, &config, &ProvenanceResolver::new(Box::new(history)), "icons").unwrap();
        assert_eq!(icons[0].name, "nested/new");
        assert_eq!(icons[0].added_date.to_string(), "2023-06-15");
        assert_eq!(icons[0].platforms, vec![Platform::Web, Platform::Ios]);
        assert_eq!(icons[0].keywords, vec!["fresh"]);
        assert_eq!(icons[1].name, "old");
        assert_eq!(icons[1].added_ts, 1_577_836_800_000);
    }

    #[test]
    fn test_assemble_refuses_invalid_names() {
        let root = Path::new("/virtual/icons");
        let sources = vec![IconSource::new(root, "close.svg"), IconSource::new(root, "Close.SVG")];
        let err = assemble(&sources, &ProjectConfig::default(), &ProvenanceResolver::filesystem_only(), "icons")
            .unwrap_err();
        assert!(matches!(err, PipelineError::ValidationFailed(_)));
    }

    #[test]
    fn test_manifest_shape() {
        let manifest = Manifest::new(vec![record("close", 5)], "icons", "sprite/sprite.svg");
        let json: serde_json::Value = serde_json::from_str(&manifest.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["inputDir"], "icons");
        assert_eq!(json["spritePath"], "sprite/sprite.svg");
        assert_eq!(json["icons"].as_array().unwrap().len(), 1);
        assert!(json["generatedAt"].as_str().unwrap().ends_with('Z'));
    }
}
