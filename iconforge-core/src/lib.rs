//! IconForge Core - Icon Asset Build Pipeline
//!
//! # The Rules (Non-Negotiable)
//! 1. SVG Files Are Truth
//! 2. Names Are Unique And Kebab-Case
//! 3. Validation Runs Before Any Output
//! 4. Masks Are Never Recolored
//! 5. Outputs Are Regenerated, Never Patched

pub mod config;
pub mod export;
pub mod hashing;
pub mod manifest;
pub mod markup;
pub mod naming;
pub mod normalize;
pub mod observability;
pub mod optimize;
pub mod pipeline;
pub mod process;
pub mod provenance;
pub mod source;
pub mod sprite;
pub mod validation;

pub use config::{IconMetadata, MetadataTable, Platform, ProjectConfig, SkipList};
pub use export::{ExportOptions, ExportSummary, Exporter};
pub use hashing::{canonical_json, fingerprint, sha256_hex};
pub use manifest::{assemble, IconRecord, Manifest};
pub use normalize::{ColorNormalizer, NormalizeStats, Normalized};
pub use pipeline::{normalize_file, BuildConfig, BuildPipeline, BuildReport, PipelineError};
pub use provenance::{ProvenanceRecord, ProvenanceResolver};
pub use source::{discover, IconSource};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, Validator, ViolationSeverity};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
