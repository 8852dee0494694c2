//! Sprite Assembly
//!
//! Packs optimized icon documents into one `<svg>` of `<symbol>` elements.

use crate::markup::{render_attribute, RootSvg};
use crate::naming::symbol_id;
use crate::pipeline::PipelineError;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Root attributes that do not carry over onto a symbol.
const DROPPED_ATTRIBUTES: &[&str] = &["width", "height", "version", "x", "y", "id", "viewbox"];

/// One optimized icon ready to be packed.
#[derive(Debug, Clone)]
pub struct SpriteShape {
    pub name: String,
    pub relative_path: String,
    pub markup: String,
}

impl SpriteShape {
    pub fn id(&self) -> String {
        symbol_id(&self.name)
    }
}

pub trait SpriteAssembler {
    fn assemble(&self, shapes: &[SpriteShape]) -> Result<String, PipelineError>;
}

/// Symbol-mode sprite: one `<symbol id=…>` per shape, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct SymbolSprite;

impl SymbolSprite {
    fn symbol(shape: &SpriteShape) -> Result<String, PipelineError> {
        let root = RootSvg::find(&shape.markup).ok_or_else(|| PipelineError::Markup {
            path: shape.relative_path.clone(),
            message: "no root <svg> element".to_string(),
        })?;

        let mut out = String::from("<symbol");
        out.push_str(&render_attribute("id", &shape.id()));
        if let Some(view_box) = root.view_box() {
            out.push_str(&render_attribute("viewBox", &view_box));
        }
        for attr in &root.attributes {
            let lower = attr.name.to_ascii_lowercase();
            if lower.starts_with("xmlns") || DROPPED_ATTRIBUTES.contains(&lower.as_str()) {
                continue;
            }
            out.push_str(&render_attribute(&attr.name, &attr.value));
        }
        out.push('>');
        out.push_str(root.inner);
        out.push_str("</symbol>");
        Ok(out)
    }
}

impl SpriteAssembler for SymbolSprite {
    fn assemble(&self, shapes: &[SpriteShape]) -> Result<String, PipelineError> {
        let mut ordered: Vec<&SpriteShape> = shapes.iter().collect();
        ordered.sort_by_key(|s| s.id());

        let mut doc = format!(r#"<svg xmlns="{}" xmlns:xlink="{}">"#, SVG_NS, XLINK_NS);
        for shape in ordered {
            doc.push_str(&Self::symbol(shape)?);
        }
        doc.push_str("</svg>");
        Ok(doc)
    }
}
