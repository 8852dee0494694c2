//! Root `<svg>` element access for optimizer and sprite assembly.

use regex::Regex;
use std::sync::OnceLock;

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid attribute pattern")
    })
}

fn root_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)<svg\b([^>]*?)(/?)>").expect("valid root pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// The outermost `<svg>` element of an icon document.
#[derive(Debug, Clone)]
pub struct RootSvg<'a> {
    /// Byte range of the opening tag.
    pub open_tag: std::ops::Range<usize>,
    pub attributes: Vec<Attribute>,
    /// Markup between the opening tag and the last `</svg>`.
    pub inner: &'a str,
}

impl<'a> RootSvg<'a> {
    pub fn find(markup: &'a str) -> Option<Self> {
        let caps = root_pattern().captures(markup)?;
        let whole = caps.get(0)?;
        let attributes = parse_attributes(caps.get(1).map_or("", |m| m.as_str()));
        let self_closing = caps.get(2).map_or(false, |m| !m.as_str().is_empty());

        let inner = if self_closing {
            ""
        } else {
            let close = rfind_ignore_case(markup, "</svg>")?;
            if close < whole.end() {
                return None;
            }
            &markup[whole.end()..close]
        };

        Some(Self {
            open_tag: whole.range(),
            attributes,
            inner,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    /// `viewBox`, or one synthesized from numeric `width`/`height`.
    pub fn view_box(&self) -> Option<String> {
        if let Some(vb) = self.attribute("viewBox") {
            return Some(vb.to_string());
        }
        let width = parse_length(self.attribute("width")?)?;
        let height = parse_length(self.attribute("height")?)?;
        Some(format!("0 0 {} {}", width, height))
    }
}

pub fn parse_attributes(tag_body: &str) -> Vec<Attribute> {
    attribute_pattern()
        .captures_iter(tag_body)
        .map(|caps| Attribute {
            name: caps[1].to_string(),
            value: caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or(String::new(), |m| m.as_str().to_string()),
        })
        .collect()
}

/// Serialize an attribute with double quotes.
pub fn render_attribute(name: &str, value: &str) -> String {
    format!(" {}=\"{}\"", name, value.replace('"', "&quot;"))
}

fn parse_length(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").parse::<f64>().ok().filter(|n| *n > 0.0)
}

fn rfind_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    (0..=hay.len().checked_sub(needle.len())?)
        .rev()
        .find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_attributes_and_inner() {
        let svg = r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg" viewBox='0 0 24 24' fill="none"><path d="M0 0"/></svg>"#;
        let root = RootSvg::find(svg).unwrap();
        assert_eq!(root.attribute("viewbox"), Some("0 0 24 24"));
        assert_eq!(root.attribute("fill"), Some("none"));
        assert_eq!(root.inner, r#"<path d="M0 0"/>"#);
    }

    #[test]
    fn test_view_box_synthesized() {
        let root = RootSvg::find(r#"<svg width="32px" height="16"></svg>"#).unwrap();
        assert_eq!(root.view_box().as_deref(), Some("0 0 32 16"));
    }

    #[test]
    fn test_self_closing_and_missing_root() {
        assert_eq!(RootSvg::find("<svg/>").unwrap().inner, "");
        assert!(RootSvg::find("<g></g>").is_none());
        assert!(RootSvg::find("<svg>").is_none());
    }
}
