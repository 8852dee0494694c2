//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations over the whole icon set.
//! Any `Error` violation aborts the build before output is written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::config::ProjectConfig;
use crate::naming::{check_naming_convention, check_unique};
use crate::pipeline::PipelineError;
use crate::source::IconSource;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    /// Every source path involved, reported together.
    pub paths: Vec<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub icon_count: usize,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn summary(&self) -> String {
        let messages: Vec<_> = self
            .errors()
            .map(|v| format!("{}: {} [{}]", v.rule, v.message, v.paths.join(", ")))
            .collect();
        messages.join("; ")
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, sources: &[IconSource], config: &ProjectConfig) -> Vec<ValidationViolation>;
}

fn relative_paths(sources: &[IconSource]) -> Vec<&str> {
    sources.iter().map(|s| s.relative_path.as_str()).collect()
}

// --- Concrete Rules ---

/// Colliding names would silently overwrite a manifest entry or symbol.
pub struct UniqueNameRule;

impl ValidationRule for UniqueNameRule {
    fn name(&self) -> &'static str { "unique_name" }

    fn validate(&self, sources: &[IconSource], _config: &ProjectConfig) -> Vec<ValidationViolation> {
        match check_unique(&relative_paths(sources)) {
            Ok(()) => vec![],
            Err(duplicates) => duplicates
                .into_iter()
                .map(|d| ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Error,
                    message: format!("Duplicate icon name '{}'", d.name),
                    paths: d.conflicting_paths,
                    remediation: vec!["Rename or remove one of the conflicting files".to_string()],
                })
                .collect(),
        }
    }
}

pub struct KebabCaseRule;

impl ValidationRule for KebabCaseRule {
    fn name(&self) -> &'static str { "kebab_case" }

    fn validate(&self, sources: &[IconSource], _config: &ProjectConfig) -> Vec<ValidationViolation> {
        match check_naming_convention(&relative_paths(sources)) {
            Ok(()) => vec![],
            Err(invalid) => vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Invalid file names (must be lowercase kebab-case)".to_string(),
                paths: invalid.paths,
                remediation: vec!["Example: arrow-drop-down.svg".to_string()],
            }],
        }
    }
}

/// Metadata keyed by a name no icon derives. Never blocks.
pub struct OrphanMetadataRule;

impl ValidationRule for OrphanMetadataRule {
    fn name(&self) -> &'static str { "orphan_metadata" }

    fn validate(&self, sources: &[IconSource], config: &ProjectConfig) -> Vec<ValidationViolation> {
        let names: BTreeSet<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        let orphans: Vec<String> = config
            .metadata
            .names()
            .filter(|n| !names.contains(n))
            .map(str::to_string)
            .collect();

        if orphans.is_empty() {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Warning,
            message: "Metadata entries match no icon".to_string(),
            paths: orphans,
            remediation: vec!["Remove the entries or fix their names".to_string()],
        }]
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(UniqueNameRule),
                Box::new(KebabCaseRule),
                Box::new(OrphanMetadataRule),
            ],
        }
    }

    /// Runs every rule; nothing is fail-fast.
    pub fn validate(&self, sources: &[IconSource], config: &ProjectConfig) -> ValidationResult {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(sources, config))
            .collect();

        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        ValidationResult {
            valid,
            icon_count: sources.len(),
            violations,
        }
    }

    /// Validate and turn any error into `PipelineError::ValidationFailed`.
    pub fn enforce(&self, sources: &[IconSource], config: &ProjectConfig) -> Result<ValidationResult, PipelineError> {
        let result = self.validate(sources, config);

        for v in result.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning) {
            warn!(rule = %v.rule, paths = ?v.paths, "{}", v.message);
        }

        if result.valid {
            Ok(result)
        } else {
            Err(PipelineError::ValidationFailed(result))
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
