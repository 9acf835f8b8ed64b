//! Pretty diagnostic rendering using ariadne.
//!
//! Converts [`Diagnostic`]s into ariadne [`Report`]s annotated with the
//! template line they point at. Diagnostics without a readable source file
//! fall back to a plain one-line message.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, IsTerminal};
use std::ops::Range;

use ariadne::{Color, Config, Fmt, IndexType, Label, Report, ReportKind, Source};
use cgen_core::{FileReport, FileStatus};
use cgen_diagnostics::{Diagnostic, LineIndex, Location, Severity};

// ── Output format ───────────────────────────────────────────────────────

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Coloured, source-annotated output (ariadne).
    Pretty,
    /// Machine-readable JSON.
    Json,
}

impl Format {
    /// Use the explicit choice, else pick by whether stdout is a TTY.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            // Default: pretty for interactive terminals, JSON for pipes
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

// ── Severity mapping ────────────────────────────────────────────────────

fn report_kind(severity: &Severity) -> ReportKind<'static> {
    match severity {
        Severity::Error => ReportKind::Error,
        Severity::Warn => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
        _ => ReportKind::Warning,
    }
}

fn severity_color(severity: &Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warn => Color::Yellow,
        Severity::Info => Color::Blue,
        _ => Color::White,
    }
}

// ── Source lookup ───────────────────────────────────────────────────────

/// Template texts read so far, keyed by the path diagnostics name them by.
/// `None` marks a file that could not be read.
type Sources = BTreeMap<String, Option<(String, LineIndex)>>;

/// The source text of `loc` and the byte range it points at.
fn annotate<'c>(sources: &'c mut Sources, loc: &Location) -> Option<(&'c str, Range<usize>)> {
    let (text, index) = sources
        .entry(loc.file.clone())
        .or_insert_with(|| {
            fs::read_to_string(&loc.file)
                .ok()
                .map(|text| {
                    let index = LineIndex::new(&text);
                    (text, index)
                })
        })
        .as_ref()?;
    let line = index.line_range(loc.line.checked_sub(1)?)?;
    let range = match loc.span {
        Some(span) => {
            let start = (line.start + span.start).min(line.end);
            let end = (line.start + span.end).min(line.end).max(start);
            // The file may have changed since expansion.
            if text.is_char_boundary(start) && text.is_char_boundary(end) {
                start..end
            } else {
                line
            }
        }
        None => line,
    };
    Some((text.as_str(), range))
}

// ── Pretty rendering ────────────────────────────────────────────────────

/// Render diagnostics to stderr.
///
/// Diagnostics whose location names a readable file are shown with the
/// offending template line underlined; the rest as standalone messages.
pub(crate) fn render_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let config = Config::default()
        .with_compact(false)
        .with_index_type(IndexType::Byte);
    let mut sources = Sources::new();

    for diag in diagnostics {
        let annotated = match &diag.location {
            Some(loc) => {
                annotate(&mut sources, loc).map(|(text, range)| (loc.file.as_str(), text, range))
            }
            None => None,
        };
        match annotated {
            Some((file, text, range)) => render_report(diag, file, text, range, config),
            None => render_plain(diag),
        }
    }
}

fn render_report(diag: &Diagnostic, file: &str, text: &str, range: Range<usize>, config: Config) {
    let mut builder = Report::build(report_kind(&diag.severity), (file, range.clone()))
        .with_code(diag.id.as_ref())
        .with_message(&diag.message)
        .with_config(config);

    builder = builder.with_label(
        Label::new((file, range))
            .with_message(make_label_message(diag))
            .with_color(severity_color(&diag.severity)),
    );
    if let Some(explanation) = diag.explain() {
        builder = builder.with_help(explanation);
    }

    let mut cache = (file, Source::from(text));
    builder.finish().eprint(&mut cache).ok();
}

fn render_plain(diag: &Diagnostic) {
    let kind_str = match diag.severity {
        Severity::Error => "error",
        Severity::Warn => "warning",
        Severity::Info => "info",
        _ => "diagnostic",
    };
    match &diag.location {
        Some(loc) => eprintln!("{kind_str}[{}]: {} ({loc})", diag.id, diag.message),
        None => eprintln!("{kind_str}[{}]: {}", diag.id, diag.message),
    }

    if let Some(ctx) = &diag.context {
        eprintln!("  = note: {}", context_note(ctx));
    }
    if let Some(explanation) = diag.explain() {
        eprintln!("  = help: {explanation}");
    }
}

fn context_note(ctx: &BTreeMap<String, String>) -> String {
    ctx.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Label text: the structured context when there is any (e.g.
/// "directive=p-line, parameter=FAN"), else the message.
fn make_label_message(diag: &Diagnostic) -> String {
    match &diag.context {
        Some(ctx) if !ctx.is_empty() => context_note(ctx),
        _ => diag.message.clone(),
    }
}

// ── Progress ────────────────────────────────────────────────────────────

/// One stderr line for a finished output file.
pub(crate) fn print_progress(file: &FileReport) {
    match file.status {
        FileStatus::Written => eprintln!(
            "wrote {} lines to {}",
            file.line_count,
            file.output.display()
        ),
        FileStatus::SkippedExisting => eprintln!("kept existing {}", file.output.display()),
        FileStatus::Checked => eprintln!("checked {} ({} lines)", file.filename, file.line_count),
        FileStatus::Failed => eprintln!("{} {}", "failed".fg(Color::Red), file.filename),
    }
}

// ── Summary line ────────────────────────────────────────────────────────

/// Print a coloured summary line showing error/warning/info counts.
///
/// Example: `2 errors, 1 warning, 0 info`
pub(crate) fn print_summary(diagnostics: &[Diagnostic]) {
    let (mut errors, mut warnings, mut infos) = (0usize, 0usize, 0usize);
    for d in diagnostics {
        match d.severity {
            Severity::Error => errors += 1,
            Severity::Warn => warnings += 1,
            Severity::Info => infos += 1,
            _ => warnings += 1,
        }
    }

    // Only print summary when there are diagnostics.
    if errors + warnings + infos == 0 {
        return;
    }

    let mut parts = Vec::new();
    if errors > 0 {
        let s = if errors == 1 { "" } else { "s" };
        parts.push(format!("{}", format!("{errors} error{s}").fg(Color::Red)));
    }
    if warnings > 0 {
        let s = if warnings == 1 { "" } else { "s" };
        parts.push(format!(
            "{}",
            format!("{warnings} warning{s}").fg(Color::Yellow)
        ));
    }
    if infos > 0 {
        parts.push(format!("{}", format!("{infos} info").fg(Color::Blue)));
    }
    eprintln!("{}", parts.join(", "));
}
