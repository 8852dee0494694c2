//! Identifier Policy
//!
//! Icon names are derived from paths relative to the input root. Folder
//! segments are kept as a namespace: `actions/close.svg` -> `actions/close`.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

pub const ICON_EXTENSION: &str = "svg";

/// Separator that replaces `/` when a name becomes a sprite symbol id.
pub const SYMBOL_ID_SEPARATOR: &str = "--";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate icon name '{name}': {}", conflicting_paths.join(", "))]
pub struct DuplicateName {
    pub name: String,
    pub conflicting_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid file names (must be lowercase kebab-case): {}", paths.join(", "))]
pub struct InvalidNames {
    pub paths: Vec<String>,
}

pub fn normalize_separators(relative_path: &str) -> String {
    relative_path.replace('\\', "/")
}

fn strip_icon_extension(path: &str) -> &str {
    let split = path.len().saturating_sub(ICON_EXTENSION.len() + 1);
    match (path.get(..split), path.get(split..)) {
        (Some(stem), Some(ext))
            if !stem.is_empty()
                && ext.starts_with('.')
                && ext[1..].eq_ignore_ascii_case(ICON_EXTENSION) =>
        {
            stem
        }
        _ => path,
    }
}

/// `nested\\Open-Panel.SVG` -> `nested/Open-Panel`.
pub fn derive_name(relative_path: &str) -> String {
    let normalized = normalize_separators(relative_path);
    strip_icon_extension(&normalized).to_string()
}

/// Sprite symbol id for a derived name.
pub fn symbol_id(name: &str) -> String {
    name.replace('/', SYMBOL_ID_SEPARATOR)
}

/// Inverse of [`symbol_id`]. Valid names never contain `--`.
pub fn name_from_symbol_id(id: &str) -> String {
    id.replace(SYMBOL_ID_SEPARATOR, "/")
}

/// Base name used for the naming convention check. Only a lowercase
/// `.svg` suffix is stripped, so `Close.SVG` is reported as invalid.
pub fn convention_stem(relative_path: &str) -> &str {
    let base = relative_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(relative_path);
    base.strip_suffix(".svg").unwrap_or(base)
}

fn kebab_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid kebab-case pattern"))
}

pub fn is_kebab_case(stem: &str) -> bool {
    kebab_pattern().is_match(stem)
}

/// Every lowercased derived name must come from exactly one source path.
pub fn check_unique<S: AsRef<str>>(paths: &[S]) -> Result<(), Vec<DuplicateName>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for path in paths {
        let normalized = normalize_separators(path.as_ref());
        let key = derive_name(&normalized).to_lowercase();
        let group = groups.entry(key).or_default();
        if !group.contains(&normalized) {
            group.push(normalized);
        }
    }

    let duplicates: Vec<_> = groups
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(name, conflicting_paths)| DuplicateName {
            name,
            conflicting_paths,
        })
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(duplicates)
    }
}

/// Collects every offending path instead of stopping at the first.
pub fn check_naming_convention<S: AsRef<str>>(paths: &[S]) -> Result<(), InvalidNames> {
    let offenders: Vec<String> = paths
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !is_kebab_case(convention_stem(p)))
        .map(normalize_separators)
        .collect();

    if offenders.is_empty() {
        Ok(())
    } else {
        Err(InvalidNames { paths: offenders })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_name_keeps_folders() {
        assert_eq!(derive_name("close.svg"), "close");
        assert_eq!(derive_name("nested/open-panel.svg"), "nested/open-panel");
        assert_eq!(derive_name("nested\\deep\\x.SVG"), "nested/deep/x");
        assert_eq!(derive_name("readme.txt"), "readme.txt");
    }

    #[test]
    fn test_symbol_id() {
        assert_eq!(symbol_id("close"), "close");
        assert_eq!(symbol_id("nested/open-panel"), "nested--open-panel");
    }

    #[test]
    fn test_kebab_case() {
        for ok in ["close", "arrow-drop-down", "h1", "2fa-key"] {
            assert!(is_kebab_case(ok), "{ok}");
        }
        for bad in ["Close", "arrow_down", "a--b", "-a", "a-", "", "a b"] {
            assert!(!is_kebab_case(bad), "{bad}");
        }
    }

    #[test]
    fn test_check_unique_reports_all_paths() {
        let err = check_unique(&["close.svg", "Close.SVG", "open.svg"]).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].name, "close");
        assert_eq!(err[0].conflicting_paths, vec!["close.svg", "Close.SVG"]);
    }

    #[test]
    fn test_check_unique_ignores_separator_spelling() {
        assert!(check_unique(&["a/b.svg", "a\\b.svg"]).is_ok());
        assert!(check_unique(&["a/b.svg", "b.svg"]).is_ok());
    }

    #[test]
    fn test_naming_convention_collects_all() {
        let err = check_naming_convention(&["ok.svg", "Bad.svg", "dir/snake_case.svg", "Close.SVG"])
            .unwrap_err();
        assert_eq!(err.paths, vec!["Bad.svg", "dir/snake_case.svg", "Close.SVG"]);
    }

    #[test]
    fn test_folder_names_not_checked() {
        assert!(check_naming_convention(&["My Folder/close.svg"]).is_ok());
    }
}
