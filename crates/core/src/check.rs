//! Bracket balance check over generated output.
//!
//! Counts `{` and `}` on every line without regard for strings or comments,
//! so findings are warnings only. Output is never changed.

use std::collections::BTreeMap;

use cgen_diagnostics::{Diagnostic, Location, codes};

/// Net `{` minus `}` on one line.
fn balance(line: &str) -> i64 {
    line.chars().fold(0, |n, c| match c {
        '{' => n + 1,
        '}' => n - 1,
        _ => n,
    })
}

/// Check `lines` of the output `file` produced from `template`.
///
/// Reports at most one extra closing bracket (first line where the running
/// count, top to bottom, goes negative) and at most one unclosed bracket
/// (first line where the running count, bottom to top, goes positive).
/// Line numbers are 1-based.
pub fn check_brackets(lines: &[String], file: &str, template: &str) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let context = || -> BTreeMap<String, String> {
        BTreeMap::from([
            ("file".to_string(), file.to_string()),
            ("template".to_string(), template.to_string()),
        ])
    };

    let mut running = 0i64;
    for (i, line) in lines.iter().enumerate() {
        running += balance(line);
        if running < 0 {
            diags.push(
                Diagnostic::warn(
                    codes::EXTRA_CLOSING_BRACKET,
                    format!("extra closing bracket in code produced by {template}"),
                    Some(Location::line(file, i + 1)),
                )
                .with_context(context()),
            );
            break;
        }
    }

    running = 0;
    for (i, line) in lines.iter().enumerate().rev() {
        running += balance(line);
        if running > 0 {
            diags.push(
                Diagnostic::warn(
                    codes::UNCLOSED_BRACKET,
                    format!("unclosed bracket in code produced by {template}"),
                    Some(Location::line(file, i + 1)),
                )
                .with_context(context()),
            );
            break;
        }
    }
    diags
}
