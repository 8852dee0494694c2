//! IconForge CLI - Build entry point
//!
//! Commands: build, validate, normalize
//! Outputs JSON to stdout, logs to stderr
//! Exit codes: 0 success, 2 validation failure, 1 any other error

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use iconforge_core::{
    export::ExportOptions,
    normalize_file,
    observability::{init_logging, LogFormat},
    BuildConfig, BuildPipeline, PipelineError, Platform,
};

#[derive(Parser)]
#[command(name = "iconforge-cli")]
#[command(about = "IconForge CLI - SVG icon sprite and manifest compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the source SVG icons
    #[arg(short, long, default_value = "icons", global = true)]
    input_dir: PathBuf,

    /// Directory receiving sprite, manifest and exports
    #[arg(short, long, default_value = "sprite", global = true)]
    out_dir: PathBuf,

    /// Directory holding skip-optimize.json and icon-meta.json
    #[arg(short, long, default_value = "config", global = true)]
    config_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Build sprite and manifest, plus optional exports
    Build {
        /// Rasterize PNGs at 1x/2x/3x
        #[arg(long)]
        png: bool,

        /// Render PDFs through the external renderer
        #[arg(long)]
        pdf: bool,

        /// Platforms selected for export (repeatable)
        #[arg(long = "export-platform", default_values_t = vec!["ios".to_string()])]
        export_platforms: Vec<String>,

        /// Use file mtimes only; never ask git for provenance
        #[arg(long)]
        no_history: bool,
    },

    /// Run the naming checks without writing anything
    Validate,

    /// Normalize colors of an existing sprite file
    Normalize {
        /// Sprite to normalize
        sprite: PathBuf,

        /// Write here instead of in place
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => println!(r#"{{"success": false, "error": "Serialization failed: {}"}}"#, e),
    }
}

fn fail(err: PipelineError) -> ExitCode {
    error!(error = %err, "run aborted");
    match &err {
        PipelineError::ValidationFailed(result) => {
            emit(&serde_json::json!({
                "success": false,
                "error": err.to_string(),
                "validation": result,
            }));
            ExitCode::from(2) // Validation failure
        }
        _ => {
            emit(&serde_json::json!({
                "success": false,
                "error": err.to_string(),
            }));
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let config = BuildConfig {
        input_dir: cli.input_dir,
        out_dir: cli.out_dir,
        config_dir: cli.config_dir,
        ..BuildConfig::default()
    };

    match cli.command {
        Commands::Build { png, pdf, export_platforms, no_history } => {
            let config = BuildConfig {
                use_history: !no_history,
                exports: ExportOptions {
                    png,
                    pdf,
                    platforms: export_platforms.into_iter().map(Platform::from).collect(),
                    ..ExportOptions::default()
                },
                ..config
            };

            match BuildPipeline::new(config).run() {
                Ok(report) => {
                    emit(&report);
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }

        Commands::Validate => match BuildPipeline::new(config).validate_only() {
            Ok(result) => {
                emit(&result);
                if result.valid {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2) // Validation failure
                }
            }
            Err(e) => fail(e),
        },

        Commands::Normalize { sprite, output } => {
            match normalize_file(&sprite, output.as_deref(), &config.config_dir) {
                Ok(stats) => {
                    emit(&serde_json::json!({ "success": true, "stats": stats }));
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }
    }
}
