//! Parameter catalog loading.
//!
//! A catalog is a headerless CSV file with one parameter per record:
//! `id,name,dataType,defaultValue`. Lines starting with `#` are comments.
//! Fields may be quoted to carry commas (`"{0, 0}"`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cgen_diagnostics::{Diagnostic, Location, codes};
use cgen_settings::{ParameterEntry, ParameterSource};
use thiserror::Error;

use super::{Parameter, ParameterSet};

/// Shorthand for building a `BTreeMap<String, String>` context from key-value pairs.
macro_rules! ctx {
    ($($k:expr => $v:expr),+ $(,)?) => {
        BTreeMap::from([$(($k.into(), $v.into())),+])
    };
}

/// Id column value meaning "not specified" under auto-increment.
pub const UNSPECIFIED_ID: &str = "-1";

/// Errors that prevent a catalog from being loaded at all.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("cannot read parameter catalog {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// How catalog ids are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Use the id column of each record.
    Explicit,
    /// Number records consecutively from `start`, ignoring the id column.
    AutoIncrement {
        /// Id of the first record.
        start: i64,
    },
}

impl IdPolicy {
    /// Policy for an optional auto-increment start id.
    pub fn from_start(start: Option<i64>) -> Self {
        match start {
            Some(start) => Self::AutoIncrement { start },
            None => Self::Explicit,
        }
    }
}

/// Result of loading a catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoad {
    /// The loaded parameters, in file order.
    pub parameters: ParameterSet,
    /// Diagnostics produced while loading.
    pub diagnostics: Vec<Diagnostic>,
}

/// One non-comment CSV record with its 1-based source line.
#[derive(Debug)]
pub(crate) struct Record {
    pub(crate) line: usize,
    pub(crate) fields: Vec<String>,
}

/// Split headerless CSV text into records, skipping `#` comments and blank
/// lines. Every record sits on a single line. Parse failures come back as
/// `(line, message)`.
pub(crate) fn read_records(text: &str) -> Vec<Result<Record, (usize, String)>> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = idx + 1;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());
        let mut record = csv::StringRecord::new();
        match reader.read_record(&mut record) {
            Ok(_) => out.push(Ok(Record {
                line,
                fields: record.iter().map(str::to_string).collect(),
            })),
            Err(e) => out.push(Err((line, e.to_string()))),
        }
    }
    out
}

/// Parse catalog text.
///
/// `source` names the catalog in diagnostics.
///
/// ```
/// use cgen_core::params::catalog::{IdPolicy, parse_catalog};
/// let load = parse_catalog("10,LED_MODE,uint16_t,0xCAFE\n", "params.csv", IdPolicy::Explicit);
/// assert_eq!(load.parameters.get("LED_MODE").unwrap().hex_id(), "0xa");
/// ```
pub fn parse_catalog(text: &str, source: &str, policy: IdPolicy) -> CatalogLoad {
    let mut load = CatalogLoad::default();
    let mut next_id = match policy {
        IdPolicy::AutoIncrement { start } => start,
        IdPolicy::Explicit => 0,
    };
    let mut overridden = 0usize;

    for record in read_records(text) {
        let record = match record {
            Ok(r) => r,
            Err((line, message)) => {
                load.diagnostics.push(Diagnostic::error(
                    codes::CATALOG_UNREADABLE,
                    format!("cannot parse parameter record: {message}"),
                    Some(Location::line(source, line)),
                ));
                continue;
            }
        };
        let loc = Location::line(source, record.line);
        if record.fields.len() < 4 {
            load.diagnostics.push(
                Diagnostic::warn(
                    codes::SHORT_PARAM_RECORD,
                    format!(
                        "parameter record has {} of 4 columns; missing columns are empty",
                        record.fields.len()
                    ),
                    Some(loc.clone()),
                )
                .with_context(ctx!("columns" => record.fields.len().to_string())),
            );
        }
        let field = |i: usize| record.fields.get(i).map_or("", String::as_str);
        let (raw_id, name, data_type, default_value) = (field(0), field(1), field(2), field(3));

        let param = match policy {
            IdPolicy::Explicit => {
                let p = Parameter::from_raw_id(raw_id, name, data_type, default_value);
                if p.id().is_none() {
                    load.diagnostics.push(
                        Diagnostic::warn(
                            codes::INVALID_PARAM_ID,
                            format!("id of parameter {name} is not a number: {raw_id:?}"),
                            Some(loc.clone()),
                        )
                        .with_context(ctx!("parameter" => name, "id" => raw_id)),
                    );
                }
                p
            }
            IdPolicy::AutoIncrement { .. } => {
                if !raw_id.is_empty() && raw_id != UNSPECIFIED_ID {
                    if raw_id.parse::<i64>().is_ok() {
                        overridden += 1;
                    } else {
                        load.diagnostics.push(
                            Diagnostic::warn(
                                codes::INVALID_PARAM_ID,
                                format!("id of parameter {name} is not a number: {raw_id:?}"),
                                Some(loc.clone()),
                            )
                            .with_context(ctx!("parameter" => name, "id" => raw_id)),
                        );
                    }
                }
                let p = Parameter::new(next_id, name, data_type, default_value);
                next_id += 1;
                p
            }
        };
        insert_reporting(&mut load.parameters, param, &mut load.diagnostics, Some(loc));
    }

    if overridden > 0 {
        load.diagnostics.push(
            Diagnostic::warn(
                codes::AUTO_ID_OVERRIDE,
                format!(
                    "auto increment enabled for parameter ids; {overridden} id value(s) from {source} ignored"
                ),
                Some(Location::line(source, 1)),
            )
            .with_context(ctx!("ignored" => overridden.to_string())),
        );
    }
    load
}

/// Read and parse a catalog file.
pub fn load_catalog(path: &Path, policy: IdPolicy) -> Result<CatalogLoad, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_catalog(&text, &path.display().to_string(), policy))
}

/// Insert into `set`, reporting a reserved name or a replaced duplicate.
fn insert_reporting(
    set: &mut ParameterSet,
    param: Parameter,
    diags: &mut Vec<Diagnostic>,
    loc: Option<Location>,
) {
    match set.insert(param) {
        Ok(None) => {}
        Ok(Some(old)) => diags.push(
            Diagnostic::info(
                codes::DUPLICATE_PARAM,
                format!(
                    "parameter {} defined again; the later definition wins",
                    old.name()
                ),
                loc,
            )
            .with_context(ctx!("parameter" => old.name())),
        ),
        Err(rejected) => diags.push(Diagnostic::error(
            codes::RESERVED_PARAM_NAME,
            format!(
                "`{}` is reserved for selecting every parameter",
                rejected.name()
            ),
            loc,
        )),
    }
}

/// Resolve the parameter set of one output file.
///
/// - no source: the whole catalog
/// - a catalog path (relative to `base`): that file, with explicit ids
/// - a list: catalog names and inline definitions, in list order
///
/// `file` names the output file in diagnostics. Problems are reported and
/// yield a smaller (possibly empty) set.
pub fn resolve_file_parameters(
    catalog: &ParameterSet,
    source: Option<&ParameterSource>,
    base: &Path,
    file: &str,
) -> CatalogLoad {
    match source {
        None => CatalogLoad {
            parameters: catalog.clone(),
            diagnostics: Vec::new(),
        },
        Some(ParameterSource::Catalog(path)) => {
            match load_catalog(&base.join(path), IdPolicy::Explicit) {
                Ok(load) => load,
                Err(e) => CatalogLoad {
                    parameters: ParameterSet::new(),
                    diagnostics: vec![
                        Diagnostic::error(codes::CATALOG_UNREADABLE, e.to_string(), None)
                            .with_context(ctx!("file" => file, "catalog" => path.as_str())),
                    ],
                },
            }
        }
        Some(ParameterSource::List(entries)) => {
            let mut load = CatalogLoad::default();
            for entry in entries {
                let param = match entry {
                    ParameterEntry::Name(name) => match catalog.get(name) {
                        Some(p) => p.clone(),
                        None => {
                            load.diagnostics.push(
                                Diagnostic::error(
                                    codes::UNKNOWN_PARAMETER,
                                    format!("parameter {name} listed for {file} is not in the catalog"),
                                    None,
                                )
                                .with_context(ctx!("file" => file, "parameter" => name.as_str())),
                            );
                            continue;
                        }
                    },
                    ParameterEntry::Inline(def) => {
                        Parameter::new(def.0, def.1.as_str(), def.2.as_str(), def.3.as_str())
                    }
                };
                insert_reporting(&mut load.parameters, param, &mut load.diagnostics, None);
            }
            load
        }
    }
}
