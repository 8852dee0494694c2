//! Platform Exports - PNG and PDF
//!
//! Optional outputs for icons tagged with a non-web platform. Every export
//! directory is wiped and regenerated. A failing icon is logged and skipped;
//! it never aborts the run.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{BaseSize, Platform, ProjectConfig};
use crate::pipeline::PipelineError;
use crate::process::run_with_timeout;
use crate::source::IconSource;

pub const PNG_SCALES: [u32; 3] = [1, 2, 3];
pub const DEFAULT_PDF_RENDERER: &str = "inkscape";
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);
/// Largest raster edge, in pixels, at any scale.
pub const MAX_RASTER_EDGE: u32 = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Pdf,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub png: bool,
    pub pdf: bool,
    /// An icon is exported when it carries any of these platforms.
    pub platforms: Vec<Platform>,
    pub pdf_renderer: String,
    pub render_timeout: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            png: false,
            pdf: false,
            platforms: vec![Platform::Ios],
            pdf_renderer: DEFAULT_PDF_RENDERER.to_string(),
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

impl ExportOptions {
    pub fn enabled(&self) -> bool {
        self.png || self.pdf
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFailure {
    pub name: String,
    pub format: ExportFormat,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSummary {
    pub png: usize,
    pub pdf: usize,
    pub failures: Vec<ExportFailure>,
}

fn reset_dir(dir: &Path) -> Result<(), PipelineError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))
}

fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e)),
        None => Ok(()),
    }
}

/// Pixel size of `base` at `scale`, or `None` past [`MAX_RASTER_EDGE`].
pub fn raster_size(base: BaseSize, scale: u32) -> Option<(u32, u32)> {
    let width = base.width.checked_mul(scale)?;
    let height = base.height.checked_mul(scale)?;
    (width <= MAX_RASTER_EDGE && height <= MAX_RASTER_EDGE).then_some((width, height))
}

fn export_error(source: &IconSource, message: impl ToString) -> PipelineError {
    PipelineError::Export {
        name: source.name.clone(),
        message: message.to_string(),
    }
}

/// Render `source` at each scale of `base`, fitted and centered.
pub fn render_png(source: &IconSource, base: BaseSize, out_dir: &Path) -> Result<usize, PipelineError> {
    let sizes = PNG_SCALES
        .iter()
        .map(|&scale| {
            raster_size(base, scale).map(|size| (scale, size)).ok_or_else(|| {
                export_error(
                    source,
                    format!(
                        "base size {}x{} at {}x exceeds {} px",
                        base.width, base.height, scale, MAX_RASTER_EDGE
                    ),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let data = source.read_bytes()?;
    let tree = usvg::Tree::from_data(&data, &usvg::Options::default())
        .map_err(|e| export_error(source, format!("unparsable SVG: {}", e)))?;
    let size = tree.size();

    for (scale, (width, height)) in sizes {
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| export_error(source, format!("invalid raster size {}x{}", width, height)))?;

        let factor = (width as f32 / size.width()).min(height as f32 / size.height());
        let dx = (width as f32 - size.width() * factor) / 2.0;
        let dy = (height as f32 - size.height() * factor) / 2.0;
        let transform = tiny_skia::Transform::from_scale(factor, factor).post_translate(dx, dy);
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        let out = out_dir.join(format!("{}@{}x.png", source.name, scale));
        ensure_parent(&out)?;
        pixmap
            .save_png(&out)
            .map_err(|e| export_error(source, format!("PNG write failed: {}", e)))?;
    }

    Ok(PNG_SCALES.len())
}

/// Hand the source to the external PDF renderer.
pub fn render_pdf(source: &IconSource, out_dir: &Path, options: &ExportOptions) -> Result<PathBuf, PipelineError> {
    let out = out_dir.join(format!("{}.pdf", source.name));
    ensure_parent(&out)?;

    let mut command = Command::new(&options.pdf_renderer);
    command
        .arg(&source.absolute_path)
        .arg("--export-type=pdf")
        .arg(format!("--export-filename={}", out.display()));

    let output = run_with_timeout(&mut command, options.render_timeout)
        .map_err(|e| export_error(source, format!("{} failed: {}", options.pdf_renderer, e)))?;
    if !output.status.success() {
        return Err(export_error(source, format!("{} exited with {}", options.pdf_renderer, output.status)));
    }
    Ok(out)
}

pub struct Exporter<'a> {
    options: &'a ExportOptions,
    config: &'a ProjectConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(options: &'a ExportOptions, config: &'a ProjectConfig) -> Self {
        Self { options, config }
    }

    pub fn eligible<'s>(&self, sources: &'s [IconSource]) -> Vec<&'s IconSource> {
        sources
            .iter()
            .filter(|s| {
                let meta = self.config.metadata.lookup(&s.name);
                self.options.platforms.iter().any(|p| meta.supports(p))
            })
            .collect()
    }

    fn record(summary: &mut ExportSummary, source: &IconSource, format: ExportFormat, err: PipelineError) {
        warn!(icon = %source.name, format = ?format, error = %err, "export failed");
        summary.failures.push(ExportFailure {
            name: source.name.clone(),
            format,
            message: err.to_string(),
        });
    }

    /// Runs the enabled exports into `<export_root>/png` and `<export_root>/pdf`.
    pub fn run(&self, sources: &[IconSource], export_root: &Path) -> Result<ExportSummary, PipelineError> {
        let mut summary = ExportSummary::default();
        let eligible = self.eligible(sources);

        if self.options.png {
            let dir = export_root.join("png");
            reset_dir(&dir)?;
            let results: Vec<_> = eligible
                .par_iter()
                .map(|s| render_png(s, self.config.metadata.lookup(&s.name).base_size, &dir))
                .collect();
            for (source, result) in eligible.iter().zip(results) {
                match result {
                    Ok(count) => summary.png += count,
                    Err(e) => Self::record(&mut summary, source, ExportFormat::Png, e),
                }
            }
            info!(dir = %dir.display(), files = summary.png, "PNG exports written");
        }

        if self.options.pdf {
            let dir = export_root.join("pdf");
            reset_dir(&dir)?;
            let results: Vec<_> = eligible
                .par_iter()
                .map(|s| render_pdf(s, &dir, self.options))
                .collect();
            for (source, result) in eligible.iter().zip(results) {
                match result {
                    Ok(_) => summary.pdf += 1,
                    Err(e) => Self::record(&mut summary, source, ExportFormat::Pdf, e),
                }
            }
            info!(dir = %dir.display(), files = summary.pdf, "PDF exports written");
        }

        Ok(summary)
    }
}
