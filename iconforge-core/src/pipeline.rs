//! Build Pipeline - Single Entry Point
//!
//! CRITICAL: validation runs before anything is written. A build that fails
//! validation leaves no output behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ProjectConfig;
use crate::export::{ExportOptions, ExportSummary, Exporter};
use crate::hashing::{fingerprint, sha256_hex};
use crate::manifest::{assemble, IconRecord, Manifest};
use crate::normalize::{ColorNormalizer, NormalizeStats};
use crate::observability::build_span;
use crate::optimize::{MarkupOptimizer, Optimizer, Passthrough};
use crate::provenance::{ProvenanceResolver, DEFAULT_HISTORY_TIMEOUT};
use crate::source::{discover, IconSource};
use crate::sprite::{SpriteAssembler, SpriteShape, SymbolSprite};
use crate::validation::{ValidationResult, Validator};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Validation failed: {}", .0.summary())]
    ValidationFailed(ValidationResult),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid markup in {path}: {message}")]
    Markup { path: String, message: String },

    #[error("Export failed for {name}: {message}")]
    Export { name: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Explicit build configuration, constructed once per run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub input_dir: PathBuf,
    pub out_dir: PathBuf,
    pub config_dir: PathBuf,
    pub sprite_file: String,
    pub manifest_file: String,
    /// Consult `git` for provenance; otherwise mtime only.
    pub use_history: bool,
    pub history_timeout: Duration,
    pub exports: ExportOptions,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("icons"),
            out_dir: PathBuf::from("sprite"),
            config_dir: PathBuf::from("config"),
            sprite_file: "sprite.svg".to_string(),
            manifest_file: "icons.json".to_string(),
            use_history: true,
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
            exports: ExportOptions::default(),
        }
    }
}

fn posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl BuildConfig {
    pub fn sprite_path(&self) -> PathBuf {
        self.out_dir.join(&self.sprite_file)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.out_dir.join(&self.manifest_file)
    }

    pub fn export_root(&self) -> PathBuf {
        self.out_dir.join("exports")
    }

    /// Input root as recorded in the manifest.
    pub fn logical_input_dir(&self) -> String {
        posix(&self.input_dir)
    }

    /// Sprite location as recorded in the manifest.
    pub fn logical_sprite_path(&self) -> String {
        posix(&self.sprite_path())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub build_id: String,
    pub engine_version: String,
    pub generated_at: DateTime<Utc>,
    pub icon_count: usize,
    pub symbol_count: usize,
    pub sprite_path: PathBuf,
    pub manifest_path: PathBuf,
    /// SHA-256 of the written sprite.
    pub sprite_hash: String,
    /// SHA-256 of the canonical icon records; `generatedAt` excluded.
    pub icons_hash: String,
    pub normalize: NormalizeStats,
    pub exports: Option<ExportSummary>,
}

/// Both mandatory outputs, computed in memory before anything is written.
#[derive(Debug, Clone)]
pub struct BuildOutputs {
    pub sprite: String,
    pub manifest: Manifest,
    pub symbol_count: usize,
    pub normalize: NormalizeStats,
}

/// The build pipeline - single entry point for a full run
pub struct BuildPipeline {
    config: BuildConfig,
    validator: Validator,
    optimizer: Box<dyn Optimizer>,
    assembler: Box<dyn SpriteAssembler>,
    resolver: ProvenanceResolver,
}

impl BuildPipeline {
    pub fn new(config: BuildConfig) -> Self {
        let resolver = if config.use_history {
            ProvenanceResolver::git(config.history_timeout)
        } else {
            ProvenanceResolver::filesystem_only()
        };
        Self {
            config,
            validator: Validator::new(),
            optimizer: Box::new(MarkupOptimizer::default()),
            assembler: Box::new(SymbolSprite),
            resolver,
        }
    }

    pub fn with_optimizer(mut self, optimizer: Box<dyn Optimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_assembler(mut self, assembler: Box<dyn SpriteAssembler>) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_resolver(mut self, resolver: ProvenanceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn load_project(&self) -> ProjectConfig {
        ProjectConfig::load(&self.config.config_dir)
    }

    pub fn discover(&self) -> Result<Vec<IconSource>, PipelineError> {
        discover(&self.config.input_dir)
    }

    /// Identifier checks only. Never writes anything.
    pub fn validate_only(&self) -> Result<ValidationResult, PipelineError> {
        let _guard = build_span("validate", &Uuid::new_v4().to_string()).entered();
        let sources = self.discover()?;
        let project = self.load_project();
        Ok(self.validator.validate(&sources, &project))
    }

    fn optimize_all(&self, sources: &[IconSource], project: &ProjectConfig) -> Result<Vec<SpriteShape>, PipelineError> {
        let mut shapes = vec![];

        for source in sources {
            let meta = project.metadata.lookup(&source.name);
            if !meta.is_web_eligible() {
                debug!(icon = %source.name, "not web-eligible, left out of sprite");
                continue;
            }

            let markup = source.read_markup()?;
            let optimized = if project.skip.skips_optimization(&source.relative_path) {
                info!(icon = %source.relative_path, "skipped optimization");
                Passthrough.optimize(&markup, &source.relative_path)?
            } else {
                self.optimizer.optimize(&markup, &source.relative_path)?
            };

            shapes.push(SpriteShape {
                name: source.name.clone(),
                relative_path: source.relative_path.clone(),
                markup: optimized,
            });
        }

        Ok(shapes)
    }

    /// Compute sprite and manifest without touching the output directory.
    pub fn compile(&self, sources: &[IconSource], project: &ProjectConfig) -> Result<BuildOutputs, PipelineError> {
        // MANDATORY: nothing is built for an invalid icon set.
        self.validator.enforce(sources, project)?;

        info!(count = sources.len(), "optimizing icons");
        let shapes = self.optimize_all(sources, project)?;

        info!(symbols = shapes.len(), "assembling sprite");
        let raw_sprite = self.assembler.assemble(&shapes)?;

        info!("normalizing sprite colors outside masks");
        let normalized = ColorNormalizer::new(&project.skip).normalize(&raw_sprite);
        debug!(stats = ?normalized.stats, "color normalization done");

        info!("assembling manifest");
        let input_dir = self.config.logical_input_dir();
        let icons: Vec<IconRecord> = assemble(sources, project, &self.resolver, &input_dir)?;
        let manifest = Manifest::new(icons, input_dir, self.config.logical_sprite_path());

        Ok(BuildOutputs {
            sprite: normalized.markup,
            manifest,
            symbol_count: shapes.len(),
            normalize: normalized.stats,
        })
    }

    fn write(path: &Path, contents: &str) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| PipelineError::io(path, e))
    }

    /// Full run: discover, validate, compile, write, export.
    pub fn run(&self) -> Result<BuildReport, PipelineError> {
        let build_id = Uuid::new_v4().to_string();
        let span = build_span("build", &build_id);
        let _guard = span.enter();

        let sources = self.discover()?;
        let project = self.load_project();
        let outputs = self.compile(&sources, &project)?;

        let sprite_path = self.config.sprite_path();
        let manifest_path = self.config.manifest_path();
        Self::write(&sprite_path, &outputs.sprite)?;
        info!(path = %sprite_path.display(), "sprite written");
        Self::write(&manifest_path, &outputs.manifest.to_json_pretty()?)?;
        info!(path = %manifest_path.display(), "manifest written");

        let exports = if self.config.exports.enabled() {
            let exporter = Exporter::new(&self.config.exports, &project);
            Some(exporter.run(&sources, &self.config.export_root())?)
        } else {
            None
        };

        Ok(BuildReport {
            build_id,
            engine_version: ENGINE_VERSION.to_string(),
            generated_at: outputs.manifest.generated_at,
            icon_count: outputs.manifest.icons.len(),
            symbol_count: outputs.symbol_count,
            sprite_path,
            manifest_path,
            sprite_hash: sha256_hex(outputs.sprite.as_bytes()),
            icons_hash: fingerprint(&outputs.manifest.icons)?,
            normalize: outputs.normalize,
            exports,
        })
    }
}

/// Normalize an already assembled sprite file, in place unless `output` is given.
pub fn normalize_file(sprite: &Path, output: Option<&Path>, config_dir: &Path) -> Result<NormalizeStats, PipelineError> {
    let markup = fs::read_to_string(sprite).map_err(|e| PipelineError::io(sprite, e))?;
    let project = ProjectConfig::load(config_dir);
    let normalized = ColorNormalizer::new(&project.skip).normalize(&markup);

    let target = output.unwrap_or(sprite);
    BuildPipeline::write(target, &normalized.markup)?;
    info!(path = %target.display(), rewrites = normalized.stats.rewrites, "sprite normalized");
    Ok(normalized.stats)
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self::new(BuildConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = BuildConfig::default();
        assert_eq!(config.sprite_path(), PathBuf::from("sprite/sprite.svg"));
        assert_eq!(config.manifest_path(), PathBuf::from("sprite/icons.json"));
        assert_eq!(config.export_root(), PathBuf::from("sprite/exports"));
        assert_eq!(config.logical_input_dir(), "icons");
        assert_eq!(config.logical_sprite_path(), "sprite/sprite.svg");
        assert!(!config.exports.enabled());
    }

    #[test]
    fn test_missing_input_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = BuildPipeline::new(BuildConfig {
            input_dir: dir.path().join("absent"),
            out_dir: dir.path().join("out"),
            use_history: false,
            ..BuildConfig::default()
        });
        assert!(matches!(pipeline.run(), Err(PipelineError::Io { .. })));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_unusable_markup_aborts_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let icons = dir.path().join("icons");
        fs::create_dir_all(&icons).unwrap();
        fs::write(icons.join("broken.svg"), "<path/>").unwrap();

        let pipeline = BuildPipeline::new(BuildConfig {
            input_dir: icons,
            out_dir: dir.path().join("out"),
            use_history: false,
            ..BuildConfig::default()
        });
        let err = pipeline.run().unwrap_err();
        assert!(err.to_string().contains("broken.svg"));
        assert!(!dir.path().join("out").exists());
    }
}
