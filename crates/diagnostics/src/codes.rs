//! Diagnostic ID constants.
//!
//! Use these instead of string literals to get compile-time typo detection.
//! Every constant has an entry in [`TABLE`], which backs
//! [`explain`](crate::explain).
//!
//! Ranges:
//! - `CG1xxx` directive syntax
//! - `CG2xxx` unresolved references
//! - `CG3xxx` scope and per-parameter templates
//! - `CG4xxx` parameter catalog
//! - `CG5xxx` output checks

// ── Directive syntax ────────────────────────────────────────────────────

/// A directive marker was opened but never closed on the same line.
pub const UNTERMINATED_DIRECTIVE: &str = "CG1001";
/// The name between the directive markers is not a known directive.
pub const UNKNOWN_DIRECTIVE: &str = "CG1002";
/// A parameter directive has no `[...]` parameter list.
pub const MISSING_PARAM_LIST: &str = "CG1003";
/// A template directive names no template file.
pub const MISSING_TEMPLATE_NAME: &str = "CG1004";
/// A template file name does not carry the configured template suffix.
pub const MISSING_TEMPLATE_SUFFIX: &str = "CG1005";
/// A `var` definition is missing its `\{name\}` delimiters or name.
pub const MALFORMED_VARIABLE: &str = "CG1006";
/// A `p-block` directive has no `\{` open marker on its own line.
pub const MISSING_BLOCK_OPEN: &str = "CG1007";
/// A `p-block` directive has no matching `\}` close marker.
pub const MISSING_BLOCK_CLOSE: &str = "CG1008";

// ── Unresolved references ──────────────────────────────────────────────

/// A parameter selection names a parameter outside the parameter set.
pub const UNKNOWN_PARAMETER: &str = "CG2001";
/// A `template` directive references a file that cannot be read.
pub const TEMPLATE_NOT_FOUND: &str = "CG2002";
/// A `vars` directive references a file that cannot be read.
pub const VARS_FILE_NOT_FOUND: &str = "CG2003";
/// Template nesting exceeded the recursion limit.
pub const RECURSION_LIMIT: &str = "CG2004";
/// The base template for an output file cannot be read.
pub const BASE_TEMPLATE_NOT_FOUND: &str = "CG2005";

// ── Scope and per-parameter templates ──────────────────────────────────

/// A template redefines a variable that is already visible.
pub const VARIABLE_SHADOWED: &str = "CG3001";
/// A per-parameter template exists but expanded to nothing.
pub const EMPTY_PARAM_TEMPLATE: &str = "CG3002";
/// A per-parameter template was missing; a blank stub was created.
pub const MISSING_PARAM_TEMPLATE: &str = "CG3003";
/// A blank stub template could not be created.
pub const STUB_CREATE_FAILED: &str = "CG3004";

// ── Parameter catalog ──────────────────────────────────────────────────

/// A parameter id column is not an integer.
pub const INVALID_PARAM_ID: &str = "CG4001";
/// Auto-increment ids replaced explicitly specified ids.
pub const AUTO_ID_OVERRIDE: &str = "CG4002";
/// A catalog record has fewer than four columns.
pub const SHORT_PARAM_RECORD: &str = "CG4003";
/// A parameter uses the reserved selector name `all`.
pub const RESERVED_PARAM_NAME: &str = "CG4004";
/// A parameter name appears twice; the later definition wins.
pub const DUPLICATE_PARAM: &str = "CG4005";
/// A parameter source could not be read or parsed.
pub const CATALOG_UNREADABLE: &str = "CG4006";

// ── Output checks ──────────────────────────────────────────────────────

/// Generated output closes more brackets than it opened.
pub const EXTRA_CLOSING_BRACKET: &str = "CG5001";
/// Generated output leaves a bracket unclosed.
pub const UNCLOSED_BRACKET: &str = "CG5002";
/// An output file already exists and overwriting is disabled.
pub const OUTPUT_EXISTS: &str = "CG5003";
/// An output directory already existed before generation.
pub const DIRECTORY_EXISTS: &str = "CG5004";
/// An output file or directory could not be written.
pub const WRITE_FAILED: &str = "CG5005";

/// `(id, explanation)` for every known code, in id order.
pub const TABLE: &[(&str, &str)] = &[
    (
        UNTERMINATED_DIRECTIVE,
        "A directive starts with `$` but the line has no closing `$`. The line is dropped from the output. Close the directive as `$name$`.",
    ),
    (
        UNKNOWN_DIRECTIVE,
        "The text between `$` markers is not one of var, vars, template, p-line, p-template, p-block. The line is dropped from the output.",
    ),
    (
        MISSING_PARAM_LIST,
        "p-line, p-template and p-block need a parameter list such as `[LED_MODE|FAN_SPEED]` or `[all]` after the directive. The line is dropped.",
    ),
    (
        MISSING_TEMPLATE_NAME,
        "template and p-template need a template file name after the directive (or after the parameter list). The line is dropped.",
    ),
    (
        MISSING_TEMPLATE_SUFFIX,
        "Template file names must end with the configured template suffix (default `.cgen_template`). The line is dropped.",
    ),
    (
        MALFORMED_VARIABLE,
        "A var definition must look like `$var$\\{NAME\\}value`. The line is dropped and no variable is defined.",
    ),
    (
        MISSING_BLOCK_OPEN,
        "A p-block directive must carry the `\\{` open marker on its own line. The line is dropped.",
    ),
    (
        MISSING_BLOCK_CLOSE,
        "No line after the p-block directive contains the `\\}` close marker. The directive line is dropped and the block content stays in the output.",
    ),
    (
        UNKNOWN_PARAMETER,
        "A parameter named in a selection list is not part of this file's parameter set. That name is skipped; the other names are still processed.",
    ),
    (
        TEMPLATE_NOT_FOUND,
        "The template named by a template directive could not be read. The directive contributes no lines.",
    ),
    (
        VARS_FILE_NOT_FOUND,
        "The variable file named by a vars directive could not be read. No variables are added.",
    ),
    (
        RECURSION_LIMIT,
        "Templates are nested too deeply, usually because a template includes itself. The offending directive contributes no lines.",
    ),
    (
        BASE_TEMPLATE_NOT_FOUND,
        "The base template for an output file could not be read. That file is not generated; other files still are.",
    ),
    (
        VARIABLE_SHADOWED,
        "A template defines a variable that is already visible from a parent template. The new value applies locally and does not leak back to the parent.",
    ),
    (
        EMPTY_PARAM_TEMPLATE,
        "A per-parameter template exists but produced no lines. A marker comment was placed in the output where the code belongs.",
    ),
    (
        MISSING_PARAM_TEMPLATE,
        "A per-parameter template did not exist. A blank template was created (unless stubs are disabled) and a marker comment was placed in the output.",
    ),
    (
        STUB_CREATE_FAILED,
        "A blank per-parameter template could not be created on disk. The marker comment is still emitted.",
    ),
    (
        INVALID_PARAM_ID,
        "The id column of a parameter record is not an integer. The parameter keeps its raw id text and sorts after every numeric id.",
    ),
    (
        AUTO_ID_OVERRIDE,
        "Auto-increment ids are enabled but the catalog specifies ids. The specified ids were ignored; set them to -1 to silence this warning.",
    ),
    (
        SHORT_PARAM_RECORD,
        "A parameter record has fewer than four columns (id, name, dataType, defaultValue). Missing columns are treated as empty.",
    ),
    (
        RESERVED_PARAM_NAME,
        "`all` selects every parameter and cannot be used as a parameter name. The record is ignored.",
    ),
    (
        DUPLICATE_PARAM,
        "Two parameters share a name. The later definition replaces the earlier one.",
    ),
    (
        CATALOG_UNREADABLE,
        "A parameter source file could not be read or parsed. The affected parameter set is empty.",
    ),
    (
        EXTRA_CLOSING_BRACKET,
        "Scanning the generated output top to bottom, a `}` appeared with no open `{`. Heuristic only: strings and comments are not excluded.",
    ),
    (
        UNCLOSED_BRACKET,
        "Scanning the generated output bottom to top, a `{` was never closed. Heuristic only: strings and comments are not excluded.",
    ),
    (
        OUTPUT_EXISTS,
        "The output file already exists and overwrite_existing_files is false. The file was skipped.",
    ),
    (
        DIRECTORY_EXISTS,
        "An output directory already existed. Existing files in it are kept.",
    ),
    (
        WRITE_FAILED,
        "An output file, directory or log could not be written.",
    ),
];
