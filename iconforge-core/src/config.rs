//! Project Configuration - Skip-List and Icon Metadata
//!
//! Both files are optional. A missing or unparsable file yields an empty
//! set/table so a project builds with zero configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::naming::{name_from_symbol_id, normalize_separators};

pub const SKIP_LIST_FILE: &str = "skip-optimize.json";
pub const METADATA_FILE: &str = "icon-meta.json";

pub const DEFAULT_BASE_SIZE: u32 = 24;

/// Target platform tag attached to an icon.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Web,
    Ios,
    Android,
    /// Sentinel: the render pipeline decides inclusion.
    Default,
    Other(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Web => "web",
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Default => "default",
            Platform::Other(s) => s,
        }
    }
}

impl From<String> for Platform {
    fn from(value: String) -> Self {
        match value.as_str() {
            "web" => Platform::Web,
            "ios" => Platform::Ios,
            "android" => Platform::Android,
            "default" => Platform::Default,
            _ => Platform::Other(value),
        }
    }
}

impl From<&str> for Platform {
    fn from(value: &str) -> Self {
        Platform::from(value.to_string())
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        match value {
            Platform::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSize {
    pub width: u32,
    pub height: u32,
}

impl Default for BaseSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_BASE_SIZE,
            height: DEFAULT_BASE_SIZE,
        }
    }
}

/// A literal color an icon intentionally carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticColor {
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SemanticColor {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            extra: Map::new(),
        }
    }
}

/// Hand-authored metadata for one icon, already canonicalized.
#[derive(Debug, Clone, PartialEq)]
pub struct IconMetadata {
    pub platforms: Vec<Platform>,
    pub base_size: BaseSize,
    pub keywords: Vec<String>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub legacy_identifiers: Vec<String>,
    pub semantic_colors: Vec<SemanticColor>,
}

impl Default for IconMetadata {
    fn default() -> Self {
        Self {
            platforms: vec![Platform::Default],
            base_size: BaseSize::default(),
            keywords: vec![],
            category: None,
            note: None,
            legacy_identifiers: vec![],
            semantic_colors: vec![],
        }
    }
}

impl IconMetadata {
    /// Build from one raw table entry. Non-object entries yield defaults.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            platforms: platform_list(obj.get("platforms")),
            base_size: base_size(obj.get("baseSize")),
            keywords: string_list(obj.get("keywords")),
            category: optional_string(obj.get("category")),
            note: optional_string(obj.get("note")),
            legacy_identifiers: string_list(
                obj.get("legacyIdentifiers").or_else(|| obj.get("oldClasses")),
            ),
            semantic_colors: color_list(
                obj.get("semanticColors").or_else(|| obj.get("colors")),
            ),
        }
    }

    pub fn supports(&self, platform: &Platform) -> bool {
        self.platforms.contains(platform)
    }

    /// Web sprite eligibility: tagged `web`, or left to the pipeline via `default`.
    pub fn is_web_eligible(&self) -> bool {
        self.supports(&Platform::Web) || self.supports(&Platform::Default)
    }
}

// --- Canonicalization, one function per optional-field type ---

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Sequence -> strings, scalar -> one-element sequence, absent -> empty.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(other) => scalar_string(other).into_iter().collect(),
        None => vec![],
    }
}

/// Like [`string_list`], but absence means `[default]`.
pub fn platform_list(value: Option<&Value>) -> Vec<Platform> {
    match value {
        None | Some(Value::Null) => vec![Platform::Default],
        Some(v) => {
            let items = string_list(Some(v));
            if items.is_empty() && !v.is_array() {
                vec![Platform::Default]
            } else {
                items.into_iter().map(Platform::from).collect()
            }
        }
    }
}

fn color_entry(value: &Value) -> Option<SemanticColor> {
    match value {
        Value::String(s) if !s.is_empty() => Some(SemanticColor::new(s.as_str())),
        Value::Object(obj) => {
            let value = obj.get("value")?.as_str()?.to_string();
            let mut extra = obj.clone();
            extra.remove("value");
            Some(SemanticColor { value, extra })
        }
        _ => None,
    }
}

pub fn color_list(value: Option<&Value>) -> Vec<SemanticColor> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(color_entry).collect(),
        Some(other) => color_entry(other).into_iter().collect(),
        None => vec![],
    }
}

pub fn optional_string(value: Option<&Value>) -> Option<String> {
    value.and_then(scalar_string)
}

fn dimension(value: &Value) -> Option<u32> {
    let n = value.as_f64()?;
    if n.is_finite() && n >= 1.0 && n <= u32::MAX as f64 {
        Some(n.round() as u32)
    } else {
        None
    }
}

/// `[w, h]` -> (w, h); `n` -> (n, n); anything else -> 24x24.
pub fn base_size(value: Option<&Value>) -> BaseSize {
    match value {
        Some(Value::Array(items)) if items.len() == 2 => {
            match (dimension(&items[0]), dimension(&items[1])) {
                (Some(width), Some(height)) => BaseSize { width, height },
                _ => BaseSize::default(),
            }
        }
        Some(v @ Value::Number(_)) => match dimension(v) {
            Some(n) => BaseSize { width: n, height: n },
            None => BaseSize::default(),
        },
        _ => BaseSize::default(),
    }
}

// --- Loaders ---

fn read_json(path: &Path) -> Option<Value> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "config file not readable, using defaults");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file unparsable, using defaults");
            None
        }
    }
}

fn read_skip_entries(path: &Path) -> Vec<String> {
    match read_json(path) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(_) => {
            warn!(path = %path.display(), "skip-list is not an array, ignoring");
            vec![]
        }
        None => vec![],
    }
}

fn skip_filename(entry: &str) -> String {
    normalize_separators(entry).to_lowercase()
}

fn skip_identifier(entry: &str) -> String {
    normalize_separators(strip_extension(entry)).to_lowercase()
}

/// Lowercased filenames exempt from optimization.
pub fn load_skip_filenames(path: &Path) -> BTreeSet<String> {
    read_skip_entries(path).iter().map(|s| skip_filename(s)).collect()
}

/// Lowercased identifiers (extension stripped) exempt from color rewriting.
pub fn load_skip_identifiers(path: &Path) -> BTreeSet<String> {
    read_skip_entries(path).iter().map(|s| skip_identifier(s)).collect()
}

/// The forms a skip entry may take for one icon: its full relative form
/// (`nested/brand`) or its last segment (`brand`).
fn skip_candidates(key: &str) -> [String; 2] {
    let key = normalize_separators(key).to_lowercase();
    let base = key.rsplit('/').next().unwrap_or(&key).to_string();
    [key, base]
}

fn strip_extension(entry: &str) -> &str {
    let segment_start = entry.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match entry[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &entry[..segment_start + dot],
        _ => entry,
    }
}

pub fn load_metadata(path: &Path) -> MetadataTable {
    match read_json(path) {
        Some(Value::Object(map)) => MetadataTable::from_map(&map),
        Some(_) => {
            warn!(path = %path.display(), "metadata is not an object, ignoring");
            MetadataTable::default()
        }
        None => MetadataTable::default(),
    }
}

// --- Aggregates ---

#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    entries: BTreeMap<String, IconMetadata>,
}

impl MetadataTable {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            entries: map
                .iter()
                .map(|(name, v)| (name.clone(), IconMetadata::from_value(v)))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, metadata: IconMetadata) {
        self.entries.insert(name.into(), metadata);
    }

    /// Entry for `name`, or the documented defaults.
    pub fn lookup(&self, name: &str) -> IconMetadata {
        self.entries.get(name).cloned().unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkipList {
    filenames: BTreeSet<String>,
    identifiers: BTreeSet<String>,
}

impl SkipList {
    pub fn load(path: &Path) -> Self {
        Self {
            filenames: load_skip_filenames(path),
            identifiers: load_skip_identifiers(path),
        }
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for entry in entries {
            let entry = entry.as_ref();
            list.filenames.insert(skip_filename(entry));
            list.identifiers.insert(skip_identifier(entry));
        }
        list
    }

    /// `relative_path` is the icon path under the input root.
    pub fn skips_optimization(&self, relative_path: &str) -> bool {
        skip_candidates(relative_path)
            .iter()
            .any(|c| self.filenames.contains(c))
    }

    /// `id` is a sprite symbol id; `--` maps back to the folder separator.
    pub fn skips_color(&self, id: &str) -> bool {
        skip_candidates(&name_from_symbol_id(id))
            .iter()
            .any(|c| self.identifiers.contains(c))
    }

    pub fn identifiers(&self) -> &BTreeSet<String> {
        &self.identifiers
    }

    pub fn filenames(&self) -> &BTreeSet<String> {
        &self.filenames
    }
}

/// Configuration loaded once per build and passed by reference.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    pub skip: SkipList,
    pub metadata: MetadataTable,
}

impl ProjectConfig {
    pub fn load(config_dir: &Path) -> Self {
        let skip = SkipList::load(&config_dir.join(SKIP_LIST_FILE));
        let metadata = load_metadata(&config_dir.join(METADATA_FILE));
        debug!(
            skip_entries = skip.filenames().len(),
            metadata_entries = metadata.len(),
            "project config loaded"
        );
        Self { skip, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_size_variants() {
        assert_eq!(base_size(Some(&json!([32, 16]))), BaseSize { width: 32, height: 16 });
        assert_eq!(base_size(Some(&json!(48))), BaseSize { width: 48, height: 48 });
        assert_eq!(base_size(Some(&json!([1, 2, 3]))), BaseSize::default());
        assert_eq!(base_size(Some(&json!("big"))), BaseSize::default());
        assert_eq!(base_size(None), BaseSize::default());
    }

    #[test]
    fn test_scalar_promoted_to_list() {
        assert_eq!(string_list(Some(&json!("arrow"))), vec!["arrow"]);
        assert_eq!(string_list(Some(&json!(["a", "b"]))), vec!["a", "b"]);
        assert!(string_list(Some(&json!(""))).is_empty());
        assert!(string_list(None).is_empty());
    }

    #[test]
    fn test_platforms_default_sentinel() {
        assert_eq!(platform_list(None), vec![Platform::Default]);
        assert_eq!(platform_list(Some(&json!("ios"))), vec![Platform::Ios]);
        assert_eq!(
            platform_list(Some(&json!(["web", "watch"]))),
            vec![Platform::Web, Platform::Other("watch".into())]
        );
        assert!(platform_list(Some(&json!([]))).is_empty());
    }

    #[test]
    fn test_colors_accept_strings_and_objects() {
        let colors = color_list(Some(&json!(["#ff0000", {"value": "#00ff00", "role": "accent"}, 3])));
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0].value, "#ff0000");
        assert_eq!(colors[1].value, "#00ff00");
        assert_eq!(colors[1].extra.get("role"), Some(&json!("accent")));
    }

    #[test]
    fn test_legacy_key_spellings() {
        let meta = IconMetadata::from_value(&json!({
            "oldClasses": "icon-x",
            "colors": ["#fff"],
            "note": "",
            "category": "actions"
        }));
        assert_eq!(meta.legacy_identifiers, vec!["icon-x"]);
        assert_eq!(meta.semantic_colors, vec![SemanticColor::new("#fff")]);
        assert_eq!(meta.note, None);
        assert_eq!(meta.category.as_deref(), Some("actions"));
    }

    #[test]
    fn test_skip_list_canonicalization() {
        let skip = SkipList::from_entries(["Logo.SVG", "brand/mark.svg", "plain"]);
        assert!(skip.skips_optimization("logo.svg"));
        assert!(skip.skips_optimization("LOGO.svg"));
        assert!(skip.skips_color("logo"));
        assert!(skip.skips_color("brand/mark"));
        assert!(skip.skips_color("PLAIN"));
        assert!(!skip.skips_color("logo.svg"));
    }

    #[test]
    fn test_skip_list_matches_nested_icons() {
        let nested = SkipList::from_entries(["nested/brand.svg"]);
        assert!(nested.skips_optimization("nested/brand.svg"));
        assert!(nested.skips_color("nested--brand"));
        assert!(!nested.skips_optimization("brand.svg"));
        assert!(!nested.skips_color("brand"));

        let base = SkipList::from_entries(["Brand.svg"]);
        assert!(base.skips_optimization("nested/brand.svg"));
        assert!(base.skips_color("nested--brand"));
        assert!(base.skips_color("brand"));
        assert!(!base.skips_color("nested--brand-alt"));

        let windows = SkipList::from_entries(["nested\\brand.svg"]);
        assert!(windows.skips_color("nested--brand"));
    }

    #[test]
    fn test_missing_files_yield_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(dir.path());
        assert!(config.metadata.is_empty());
        assert!(config.skip.filenames().is_empty());
    }

    #[test]
    fn test_unparsable_files_yield_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SKIP_LIST_FILE), "not json").unwrap();
        fs::write(dir.path().join(METADATA_FILE), "[1, 2]").unwrap();
        let config = ProjectConfig::load(dir.path());
        assert!(config.metadata.is_empty());
        assert!(config.skip.identifiers().is_empty());
    }

    #[test]
    fn test_metadata_lookup_defaults() {
        let table = MetadataTable::default();
        let meta = table.lookup("missing");
        assert_eq!(meta.platforms, vec![Platform::Default]);
        assert!(meta.is_web_eligible());
    }
}
