//! Settings file definitions and loading for the cgen template generator.
//!
//! A settings file is JSON that may carry `//` line comments and `/* */`
//! block comments. It names the subsystem, the directories and files to
//! generate, where templates and the parameter catalog live, and a handful
//! of policy switches.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";
/// Default template filename suffix.
pub const DEFAULT_TEMPLATE_SUFFIX: &str = ".cgen_template";

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("cannot read settings file {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// JSON deserialization failed.
    #[error("invalid settings JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A field value is unusable.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// The name of the field that failed validation.
        field: String,
        /// A human-readable explanation of why the field value is invalid.
        reason: String,
    },
}

/// Generator settings.
///
/// # Example
/// ```
/// let s = cgen_settings::load_settings_from_str(r#"{
///     // output goes to ./ADB
///     "subsystem_name": "ADB",
///     "files_to_generate": [{ "filename": "parameters.c" }]
/// }"#).unwrap();
/// assert_eq!(s.files_to_generate[0].base_template(&s.template_suffix), "parameters.c.cgen_template");
/// assert!(s.continue_indentation);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Subsystem name: output root directory and value of `s#name`.
    pub subsystem_name: String,
    /// Directories created below the output root.
    #[serde(default)]
    pub subdirectories: Vec<String>,
    /// Output files, generated in this order.
    #[serde(default)]
    pub files_to_generate: Vec<FileSpec>,
    /// Path of the parameter catalog.
    #[serde(default = "default_catalog")]
    pub parameters: String,
    /// First id handed out when catalog ids are auto-incremented.
    /// `None` (or `-1`) keeps the ids written in the catalog.
    #[serde(default)]
    pub auto_increment_start_id: Option<i64>,
    /// Replace output files that already exist.
    #[serde(default = "default_true")]
    pub overwrite_existing_files: bool,
    /// Prefix included template output with the directive's indentation.
    #[serde(default = "default_true")]
    pub continue_indentation: bool,
    /// Template search root.
    #[serde(default = "default_template_dir")]
    pub template_dir: String,
    /// Filename suffix that identifies a template file.
    #[serde(default = "default_template_suffix")]
    pub template_suffix: String,
    /// Optional diagnostic log file.
    #[serde(default)]
    pub log_file: Option<String>,
}

/// One output file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSpec {
    /// Output path relative to the output root.
    pub filename: String,
    /// Base template; defaults to `filename` + template suffix.
    #[serde(default)]
    pub base_template: Option<String>,
    /// Parameter set for this file; defaults to the whole catalog.
    #[serde(default)]
    pub parameters: Option<ParameterSource>,
}

impl FileSpec {
    /// The base template name, applying the `filename + suffix` default.
    pub fn base_template(&self, suffix: &str) -> String {
        match &self.base_template {
            Some(t) => t.clone(),
            None => format!("{}{}", self.filename, suffix),
        }
    }
}

/// Where a file's parameter set comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ParameterSource {
    /// A separate catalog file (explicit ids).
    Catalog(String),
    /// A list of catalog names and inline definitions.
    List(Vec<ParameterEntry>),
}

/// An element of an inline parameter list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ParameterEntry {
    /// Use the catalog entry with this name.
    Name(String),
    /// Define an ad-hoc parameter: `[id, name, dataType, defaultValue]`.
    Inline(InlineParameter),
}

/// An ad-hoc parameter written as `[id, "name", "dataType", "defaultValue"]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineParameter(pub i64, pub String, pub String, pub String);

fn default_true() -> bool {
    true
}

fn default_catalog() -> String {
    "params.csv".into()
}

fn default_template_dir() -> String {
    "templates".into()
}

fn default_template_suffix() -> String {
    DEFAULT_TEMPLATE_SUFFIX.into()
}

impl Settings {
    /// Auto-increment start id with the `-1` sentinel folded into `None`.
    pub fn auto_increment(&self) -> Option<i64> {
        self.auto_increment_start_id.filter(|&id| id != -1)
    }

    /// Output root (`<base>/<subsystem_name>`).
    pub fn output_root(&self, base: &Path) -> PathBuf {
        base.join(&self.subsystem_name)
    }

    /// Template search root.
    pub fn template_root(&self, base: &Path) -> PathBuf {
        base.join(&self.template_dir)
    }

    /// Catalog path.
    pub fn catalog_path(&self, base: &Path) -> PathBuf {
        base.join(&self.parameters)
    }
}

/// Remove `//` and `/* */` comments outside string literals.
///
/// Line comments keep their terminating newline so line numbers in serde
/// errors still match the file.
pub fn strip_comments(input: &str) -> String {
    enum State {
        Code,
        Str,
        Line,
        Block,
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Code;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match (c, chars.peek()) {
                ('"', _) => {
                    state = State::Str;
                    out.push(c);
                }
                ('/', Some('/')) => {
                    chars.next();
                    state = State::Line;
                }
                ('/', Some('*')) => {
                    chars.next();
                    state = State::Block;
                }
                _ => out.push(c),
            },
            State::Str => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == '"' {
                    state = State::Code;
                }
            }
            State::Line => {
                if c == '\n' {
                    out.push(c);
                    state = State::Code;
                }
            }
            State::Block => {
                if c == '\n' {
                    out.push(c);
                } else if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                }
            }
        }
    }
    out
}

/// Load and validate [`Settings`] from a JSON (with comments) string.
///
/// Only the fields the generator cannot work without are checked:
/// - `subsystem_name` must be non-empty
/// - `template_suffix` must be non-empty
/// - every `files_to_generate[].filename` must be non-empty
pub fn load_settings_from_str(s: &str) -> Result<Settings, SettingsError> {
    let settings: Settings = serde_json::from_str(&strip_comments(s))?;

    if settings.subsystem_name.trim().is_empty() {
        return Err(SettingsError::InvalidField {
            field: "subsystem_name".into(),
            reason: "must not be empty".into(),
        });
    }
    if settings.template_suffix.is_empty() {
        return Err(SettingsError::InvalidField {
            field: "template_suffix".into(),
            reason: "must not be empty".into(),
        });
    }
    if let Some(i) = settings
        .files_to_generate
        .iter()
        .position(|f| f.filename.trim().is_empty())
    {
        return Err(SettingsError::InvalidField {
            field: format!("files_to_generate[{i}].filename"),
            reason: "must not be empty".into(),
        });
    }

    Ok(settings)
}

/// Read and load settings from a file.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_settings_from_str(&text)
}
