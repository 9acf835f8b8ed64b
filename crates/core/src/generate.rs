//! Generation driver.
//!
//! Ties the collaborators together for a settings file: load the catalog,
//! prepare the output directories, expand each configured file's base
//! template with its parameter set, check the result, write it, and append
//! the run to the optional log file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cgen_diagnostics::{Diagnostic, codes};
use cgen_settings::{FileSpec, Settings};
use serde::Serialize;
use thiserror::Error;

use crate::check::check_brackets;
use crate::output::{WriteOutcome, prepare_directories, write_lines};
use crate::params::ParameterSet;
use crate::params::catalog::{
    CatalogError, CatalogLoad, IdPolicy, load_catalog, resolve_file_parameters,
};
use crate::template::expand::{Engine, EngineOptions, ExpandError, Expansion};
use crate::template::scope::Scope;
use crate::template::store::FsTemplateStore;

/// Variable holding the subsystem name in every root scope.
pub const SUBSYSTEM_VAR: &str = "s#name";

/// Shorthand for building a `BTreeMap<String, String>` context from key-value pairs.
macro_rules! ctx {
    ($($k:expr => $v:expr),+ $(,)?) => {
        BTreeMap::from([$(($k.into(), $v.into())),+])
    };
}

/// Errors that stop a whole run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The parameter catalog could not be read.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// `--file` named a file that is not configured.
    #[error("no file named {0} in files_to_generate")]
    UnknownFile(String),
    /// The requested template could not be read.
    #[error(transparent)]
    Expand(#[from] ExpandError),
}

/// Whether a run touches the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Create directories, stubs, outputs and the log.
    Write,
    /// Expand in memory only.
    DryRun,
}

/// Final state of one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Expanded and written.
    Written,
    /// Expanded; the output existed and overwriting is disabled.
    SkippedExisting,
    /// Expanded in memory only.
    Checked,
    /// Not generated.
    Failed,
}

/// Outcome for one entry of `files_to_generate`.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Output path relative to the output root.
    pub filename: String,
    /// Base template name.
    pub template: String,
    /// Full output path.
    pub output: PathBuf,
    /// What happened to the file.
    pub status: FileStatus,
    /// Number of generated lines.
    pub line_count: usize,
    /// Diagnostics for this file.
    pub diagnostics: Vec<Diagnostic>,
    /// Blank templates created while expanding this file.
    pub stubs: Vec<String>,
    /// Generated lines.
    #[serde(skip)]
    pub lines: Vec<String>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    /// Diagnostics not tied to one output file (catalog, directories, log).
    pub diagnostics: Vec<Diagnostic>,
    /// Per-file outcomes in settings order.
    pub files: Vec<FileReport>,
}

impl GenerationReport {
    /// Every diagnostic of the run, run-level first.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .chain(self.files.iter().flat_map(|f| f.diagnostics.iter()))
    }

    /// Number of files that were not generated.
    pub fn failed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Failed)
            .count()
    }

    /// `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.all_diagnostics().any(Diagnostic::is_error)
    }
}

/// Runs generation for one settings file.
///
/// Relative paths in the settings resolve against `base`, normally the
/// directory holding the settings file.
pub struct Generator<'a> {
    settings: &'a Settings,
    base: PathBuf,
    mode: Mode,
}

impl<'a> Generator<'a> {
    /// Create a generator.
    pub fn new(settings: &'a Settings, base: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            settings,
            base: base.into(),
            mode,
        }
    }

    /// Base directory for relative paths.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Load the main catalog with the configured id policy.
    pub fn load_catalog(&self) -> Result<CatalogLoad, CatalogError> {
        load_catalog(
            &self.settings.catalog_path(&self.base),
            IdPolicy::from_start(self.settings.auto_increment()),
        )
    }

    /// Scope every root template starts from.
    pub fn root_scope(&self) -> Scope {
        let mut scope = Scope::new();
        scope.define(SUBSYSTEM_VAR, self.settings.subsystem_name.as_str());
        scope
    }

    fn engine_options(&self) -> EngineOptions {
        EngineOptions::from_settings(self.settings).with_stubs(self.mode == Mode::Write)
    }

    fn store(&self) -> FsTemplateStore {
        FsTemplateStore::new(self.settings.template_root(&self.base))
    }

    /// Generate every configured file.
    pub fn run(&self) -> Result<GenerationReport, GenerateError> {
        self.run_with(|_| {})
    }

    /// Generate every configured file, calling `on_file` after each one.
    pub fn run_with(
        &self,
        mut on_file: impl FnMut(&FileReport),
    ) -> Result<GenerationReport, GenerateError> {
        let catalog = self.load_catalog()?;
        let mut report = GenerationReport {
            diagnostics: catalog.diagnostics,
            files: Vec::with_capacity(self.settings.files_to_generate.len()),
        };
        if self.mode == Mode::Write {
            report.diagnostics.extend(prepare_directories(
                &self.settings.output_root(&self.base),
                &self.settings.subdirectories,
            ));
        }

        let store = self.store();
        let engine = Engine::new(&store, self.engine_options());
        let scope = self.root_scope();
        for spec in &self.settings.files_to_generate {
            let file = self.generate_file(&engine, &catalog.parameters, spec, &scope);
            on_file(&file);
            report.files.push(file);
        }

        if self.mode == Mode::Write
            && let Some(log) = &self.settings.log_file
        {
            self.write_log(&mut report, &self.base.join(log));
        }
        Ok(report)
    }

    fn generate_file(
        &self,
        engine: &Engine<'_>,
        catalog: &ParameterSet,
        spec: &FileSpec,
        scope: &Scope,
    ) -> FileReport {
        let template = spec.base_template(&self.settings.template_suffix);
        let params = resolve_file_parameters(
            catalog,
            spec.parameters.as_ref(),
            &self.base,
            &spec.filename,
        );
        let mut file = FileReport {
            filename: spec.filename.clone(),
            template: template.clone(),
            output: self.settings.output_root(&self.base).join(&spec.filename),
            status: FileStatus::Checked,
            line_count: 0,
            diagnostics: params.diagnostics,
            stubs: Vec::new(),
            lines: Vec::new(),
        };

        let expansion = match engine.expand(&template, &params.parameters, scope) {
            Ok(expansion) => expansion,
            Err(e) => {
                file.diagnostics.push(
                    Diagnostic::error(
                        codes::BASE_TEMPLATE_NOT_FOUND,
                        format!("{e}; {} not generated", spec.filename),
                        None,
                    )
                    .with_context(ctx!("file" => spec.filename.as_str(), "template" => template)),
                );
                file.status = FileStatus::Failed;
                return file;
            }
        };
        file.diagnostics.extend(expansion.diagnostics);
        file.diagnostics
            .extend(check_brackets(&expansion.lines, &spec.filename, &file.template));
        file.stubs = expansion.stubs;
        file.line_count = expansion.lines.len();
        file.lines = expansion.lines;

        if self.mode == Mode::DryRun {
            return file;
        }
        match write_lines(&file.output, &file.lines, self.settings.overwrite_existing_files) {
            Ok(WriteOutcome::Written) => file.status = FileStatus::Written,
            Ok(WriteOutcome::SkippedExisting) => {
                file.status = FileStatus::SkippedExisting;
                file.diagnostics.push(Diagnostic::warn(
                    codes::OUTPUT_EXISTS,
                    format!("{} exists and overwriting is disabled; skipped", file.output.display()),
                    None,
                ));
            }
            Err(e) => {
                file.status = FileStatus::Failed;
                file.diagnostics.push(Diagnostic::error(
                    codes::WRITE_FAILED,
                    format!("cannot write {}: {e}", file.output.display()),
                    None,
                ));
            }
        }
        file
    }

    fn write_log(&self, report: &mut GenerationReport, path: &Path) {
        let mut lines: Vec<String> = report.all_diagnostics().map(ToString::to_string).collect();
        lines.extend(
            report
                .files
                .iter()
                .filter(|f| f.status == FileStatus::Written)
                .map(|f| format!("wrote {} lines to {}", f.line_count, f.output.display())),
        );
        match write_lines(path, &lines, self.settings.overwrite_existing_files) {
            Ok(WriteOutcome::Written) => {}
            Ok(WriteOutcome::SkippedExisting) => report.diagnostics.push(Diagnostic::warn(
                codes::OUTPUT_EXISTS,
                format!("log {} exists and overwriting is disabled; skipped", path.display()),
                None,
            )),
            Err(e) => report.diagnostics.push(Diagnostic::error(
                codes::WRITE_FAILED,
                format!("cannot write log {}: {e}", path.display()),
                None,
            )),
        }
    }

    /// Expand a single template without writing anything.
    ///
    /// Uses the parameter set of the configured file `file` when given,
    /// otherwise the whole catalog. Catalog diagnostics come first in the
    /// returned expansion.
    pub fn expand_one(&self, template: &str, file: Option<&str>) -> Result<Expansion, GenerateError> {
        let catalog = self.load_catalog()?;
        let mut diagnostics = catalog.diagnostics;
        let params = match file {
            None => catalog.parameters,
            Some(name) => {
                let spec = self
                    .settings
                    .files_to_generate
                    .iter()
                    .find(|f| f.filename == name)
                    .ok_or_else(|| GenerateError::UnknownFile(name.to_string()))?;
                let load = resolve_file_parameters(
                    &catalog.parameters,
                    spec.parameters.as_ref(),
                    &self.base,
                    name,
                );
                diagnostics.extend(load.diagnostics);
                load.parameters
            }
        };
        let store = self.store();
        let engine = Engine::new(&store, self.engine_options());
        let mut expansion = engine.expand(template, &params, &self.root_scope())?;
        diagnostics.append(&mut expansion.diagnostics);
        expansion.diagnostics = diagnostics;
        Ok(expansion)
    }
}
