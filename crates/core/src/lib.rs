//! cgen core library.
//!
//! Expands line-oriented source templates against a parameter catalog.
//! The main entry points are [`Engine::expand`] for a single template and
//! [`Generator`] for a whole settings file.

#![warn(missing_docs)]

/// Bracket balance check over generated output.
pub mod check;
/// Generation driver for a settings file.
pub mod generate;
/// Writing generated files and preparing output directories.
pub mod output;
/// Parameters, parameter sets, catalog loading and ordering.
pub mod params;
/// Template expansion.
pub mod template;

// ── Convenience re-exports ──────────────────────────────────────────────────
// Flat imports for the most common entry points. The full module paths
// remain available for less common types.

// Parameters
pub use params::catalog::{CatalogError, CatalogLoad, IdPolicy, load_catalog, parse_catalog};
pub use params::{Parameter, ParameterSet};

// Expansion
pub use template::expand::{Engine, EngineOptions, ExpandError, Expansion};
pub use template::scope::Scope;
pub use template::store::{FsTemplateStore, MemoryTemplateStore, TemplateStore};

// Output
pub use check::check_brackets;
pub use output::{WriteOutcome, write_lines};

// Driver
pub use generate::{FileReport, FileStatus, GenerateError, GenerationReport, Generator, Mode};

// Diagnostics (re-exported from the diagnostics crate)
pub use cgen_diagnostics::{Diagnostic, Location, Severity, Span, codes};
