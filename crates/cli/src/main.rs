mod render;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use cgen_core::{Diagnostic, Expansion, GenerationReport, Generator, Mode};
use cgen_diagnostics as diag;
use cgen_settings::{DEFAULT_SETTINGS_FILE, Settings, load_settings};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::render::{Format, print_progress, print_summary, render_diagnostics};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "cgen",
    version,
    about = "cgen: expand source templates against a parameter catalog"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate every file listed in the settings file.
    Generate {
        /// Settings file. Relative paths inside it resolve against its directory.
        #[arg(long, short, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
        /// Exit 1 when any error diagnostic was produced, not only when a
        /// file could not be generated.
        #[arg(long)]
        strict: bool,
    },

    /// Expand a single template and print the result to stdout.
    ///
    /// Nothing is written; missing per-parameter templates are reported but
    /// not created.
    Expand {
        /// Template name relative to the template directory.
        template: String,
        /// Settings file (see `generate --help`).
        #[arg(long, short, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
        /// Use the parameter set configured for this output file instead of
        /// the whole catalog.
        #[arg(long)]
        file: Option<String>,
    },

    /// Expand every configured file in memory and report diagnostics.
    Check {
        /// Settings file (see `generate --help`).
        #[arg(long, short, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
    },

    /// Explain a diagnostic ID (e.g. CG1001).
    Explain { id: String },
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match cli.cmd {
        Cmd::Generate { settings, strict } => cmd_generate(&settings, strict, format)?,
        Cmd::Expand {
            template,
            settings,
            file,
        } => cmd_expand(&template, &settings, file.as_deref(), format)?,
        Cmd::Check { settings } => cmd_check(&settings, format)?,
        Cmd::Explain { id } => cmd_explain(&id, format)?,
    }

    Ok(())
}

// ── Commands ────────────────────────────────────────────────────────────

fn cmd_generate(settings_path: &Path, strict: bool, format: Format) -> Result<()> {
    let (settings, base) = read_settings(settings_path)?;
    let report = Generator::new(&settings, base, Mode::Write)
        .run_with(|file| {
            if format == Format::Pretty {
                print_progress(file);
            }
        })
        .with_context(|| format!("cannot generate {}", settings.subsystem_name))?;

    let failed = report.failed_files() > 0;
    let ok = !failed && !(strict && report.has_errors());
    emit_report(&report, ok, format)?;
    if !ok {
        process::exit(1);
    }
    Ok(())
}

fn cmd_check(settings_path: &Path, format: Format) -> Result<()> {
    let (settings, base) = read_settings(settings_path)?;
    let report = Generator::new(&settings, base, Mode::DryRun)
        .run_with(|file| {
            if format == Format::Pretty {
                print_progress(file);
            }
        })
        .with_context(|| format!("cannot check {}", settings.subsystem_name))?;

    let ok = report.failed_files() == 0 && !report.has_errors();
    emit_report(&report, ok, format)?;
    if ok && format == Format::Pretty {
        eprintln!("check ok");
    }
    if !ok {
        process::exit(1);
    }
    Ok(())
}

/// JSON shape of `cgen expand`.
#[derive(Serialize)]
struct ExpandOutput<'a> {
    template: &'a str,
    #[serde(flatten)]
    expansion: &'a Expansion,
}

fn cmd_expand(
    template: &str,
    settings_path: &Path,
    file: Option<&str>,
    format: Format,
) -> Result<()> {
    let (settings, base) = read_settings(settings_path)?;
    let expansion = Generator::new(&settings, base, Mode::DryRun)
        .expand_one(template, file)
        .with_context(|| format!("cannot expand {template}"))?;

    match format {
        Format::Json => {
            let out = ExpandOutput {
                template,
                expansion: &expansion,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            // Generated text to stdout, diagnostics to stderr.
            for line in &expansion.lines {
                println!("{line}");
            }
            render_diagnostics(&expansion.diagnostics);
            print_summary(&expansion.diagnostics);
        }
    }

    exit_on_errors(&expansion.diagnostics);
    Ok(())
}

fn cmd_explain(id: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let out = serde_json::json!({
                "id": id,
                "explanation": diag::explain(id),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            // Explanation is the expected output: stdout, not stderr.
            if let Some(text) = diag::explain(id) {
                use ariadne::Fmt;
                println!("{}: {}", id.fg(ariadne::Color::Cyan), text);
            } else {
                println!("{id}: (no explanation available)");
            }
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Load the settings file and return it with the directory relative paths
/// resolve against.
fn read_settings(path: &Path) -> Result<(Settings, PathBuf)> {
    let settings = load_settings(path)
        .with_context(|| format!("cannot load settings from {}", path.display()))?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok((settings, base))
}

/// Print a run report: a single JSON object on stdout, or rendered
/// diagnostics and a summary on stderr.
fn emit_report(report: &GenerationReport, ok: bool, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let out = serde_json::json!({
                "ok": ok,
                "failed_files": report.failed_files(),
                "diagnostics": report.diagnostics,
                "files": report.files,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            let all: Vec<Diagnostic> = report.all_diagnostics().cloned().collect();
            render_diagnostics(&all);
            print_summary(&all);
        }
    }
    Ok(())
}

/// Exit with code 1 if any diagnostic is an error.
/// Warnings and info do not cause a non-zero exit.
fn exit_on_errors(diagnostics: &[Diagnostic]) {
    if diagnostics.iter().any(Diagnostic::is_error) {
        process::exit(1);
    }
}
