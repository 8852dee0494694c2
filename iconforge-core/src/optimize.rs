//! Markup Optimizer
//!
//! Structural cleanup ahead of sprite assembly. This is deliberately small:
//! it strips what a sprite never needs, writes every attribute as
//! `name="value"` and normalizes whitespace between tags. Colors are left
//! alone; the normalizer handles those after assembly and relies on the
//! double-quoted attribute form.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::markup::{render_attribute, RootSvg};
use crate::pipeline::PipelineError;

pub trait Optimizer: Send + Sync {
    fn optimize(&self, markup: &str, path: &str) -> Result<String, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    pub remove_xml_declaration: bool,
    pub remove_doctype: bool,
    pub remove_comments: bool,
    /// Drop `<metadata>`, `<title>` and `<desc>`.
    pub remove_descriptive: bool,
    /// Drop root `width`/`height` when a `viewBox` is present.
    pub remove_dimensions: bool,
    /// Rewrite `a='v'` and `a = "v"` as `a="v"` on every tag.
    pub normalize_quotes: bool,
    pub collapse_whitespace: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            remove_xml_declaration: true,
            remove_doctype: true,
            remove_comments: true,
            remove_descriptive: true,
            remove_dimensions: true,
            normalize_quotes: true,
            collapse_whitespace: true,
        }
    }
}

struct Patterns {
    xml_declaration: Regex,
    doctype: Regex,
    comment: Regex,
    descriptive: Vec<Regex>,
    tag: Regex,
    attribute: Regex,
    inter_tag_space: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let element = |name: &str| {
            Regex::new(&format!(r"(?is)<{name}\b[^>]*?(?:/>|>.*?</{name}\s*>)"))
                .expect("valid element pattern")
        };
        Patterns {
            xml_declaration: Regex::new(r"(?s)<\?xml.*?\?>").expect("valid pattern"),
            doctype: Regex::new(r"(?is)<!DOCTYPE[^>]*>").expect("valid pattern"),
            comment: Regex::new(r"(?s)<!--.*?-->").expect("valid pattern"),
            descriptive: ["metadata", "title", "desc"].into_iter().map(element).collect(),
            tag: Regex::new(r"<[A-Za-z][^<>]*>").expect("valid pattern"),
            attribute: Regex::new(
                r#"(?P<pre>\s)(?P<name>[A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#,
            )
            .expect("valid pattern"),
            inter_tag_space: Regex::new(r">\s+<").expect("valid pattern"),
        }
    })
}

#[derive(Debug, Clone, Default)]
pub struct MarkupOptimizer {
    options: OptimizeOptions,
}

impl MarkupOptimizer {
    pub fn new(options: OptimizeOptions) -> Self {
        Self { options }
    }

    fn strip_dimensions(markup: &str) -> String {
        let Some(root) = RootSvg::find(markup) else {
            return markup.to_string();
        };
        if root.attribute("viewBox").is_none() {
            return markup.to_string();
        }

        let self_closing = markup[root.open_tag.clone()].ends_with("/>");
        let mut tag = String::from("<svg");
        for attr in &root.attributes {
            if attr.name == "width" || attr.name == "height" {
                continue;
            }
            tag.push_str(&render_attribute(&attr.name, &attr.value));
        }
        tag.push_str(if self_closing { "/>" } else { ">" });

        format!(
            "{}{}{}",
            &markup[..root.open_tag.start],
            tag,
            &markup[root.open_tag.end..]
        )
    }
}

fn quote_attributes(markup: &str) -> String {
    let p = patterns();
    p.tag
        .replace_all(markup, |tag: &Captures| {
            p.attribute
                .replace_all(&tag[0], |attr: &Captures| {
                    let value = match (attr.name("dq"), attr.name("sq")) {
                        (Some(v), _) => v.as_str().to_string(),
                        (None, Some(v)) => v.as_str().replace('"', "&quot;"),
                        (None, None) => String::new(),
                    };
                    format!("{}{}=\"{}\"", &attr["pre"], &attr["name"], value)
                })
                .into_owned()
        })
        .into_owned()
}

impl Optimizer for MarkupOptimizer {
    fn optimize(&self, markup: &str, _path: &str) -> Result<String, PipelineError> {
        let p = patterns();
        let mut out = markup.to_string();

        if self.options.remove_xml_declaration {
            out = p.xml_declaration.replace_all(&out, "").into_owned();
        }
        if self.options.remove_doctype {
            out = p.doctype.replace_all(&out, "").into_owned();
        }
        if self.options.remove_comments {
            out = p.comment.replace_all(&out, "").into_owned();
        }
        if self.options.remove_descriptive {
            for re in &p.descriptive {
                out = re.replace_all(&out, "").into_owned();
            }
        }
        if self.options.remove_dimensions {
            out = Self::strip_dimensions(&out);
        }
        if self.options.normalize_quotes {
            out = quote_attributes(&out);
        }
        if self.options.collapse_whitespace {
            out = p.inter_tag_space.replace_all(&out, "><").into_owned();
        }

        Ok(out.trim().to_string())
    }
}

/// Leaves markup untouched. Used for skip-listed files.
pub struct Passthrough;

impl Optimizer for Passthrough {
    fn optimize(&self, markup: &str, _path: &str) -> Result<String, PipelineError> {
        Ok(markup.to_string())
    }
}
