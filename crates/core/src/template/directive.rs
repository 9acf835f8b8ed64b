//! Directive recognition and argument parsing.
//!
//! A directive is a name between two `$` markers on a template line,
//! followed by its arguments:
//!
//! ```text
//! $var$\{NAME\}value
//! $vars$ common.csv
//! $template$ header.h.cgen_template
//! $p-line$[LED_MODE|FAN] p#enumName = p#id,
//! $p-template$[all] param.c.cgen_template
//! $p-block$[all] \{
//! ```
//!
//! Parsing is position based: every helper takes the byte offset where its
//! argument starts and reports the offset where it ends.

use cgen_diagnostics::Span;

/// The directive marker character.
pub const MARKER: char = '$';
/// Opens a variable name or a p-block body.
pub const OPEN: &str = "\\{";
/// Closes a variable name or a p-block body.
pub const CLOSE: &str = "\\}";
/// Separates names in a parameter list.
pub const LIST_SEPARATOR: char = '|';

/// Known directive names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `var`: define one variable.
    Var,
    /// `vars`: define variables from a `name,value` file.
    Vars,
    /// `template`: include another template.
    Template,
    /// `p-line`: repeat the rest of the line per parameter.
    PLine,
    /// `p-template`: include a template per parameter.
    PTemplate,
    /// `p-block`: repeat the following lines per parameter.
    PBlock,
}

impl DirectiveKind {
    /// Look up a directive by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "var" => Self::Var,
            "vars" => Self::Vars,
            "template" => Self::Template,
            "p-line" => Self::PLine,
            "p-template" => Self::PTemplate,
            "p-block" => Self::PBlock,
            _ => return None,
        })
    }

    /// The directive's name as written in templates.
    pub fn name(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Vars => "vars",
            Self::Template => "template",
            Self::PLine => "p-line",
            Self::PTemplate => "p-template",
            Self::PBlock => "p-block",
        }
    }

    /// `true` for directives that define variables.
    pub fn is_definition(self) -> bool {
        matches!(self, Self::Var | Self::Vars)
    }
}

impl std::fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A directive name found on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveToken<'a> {
    /// Text between the markers.
    pub name: &'a str,
    /// Byte offset of the opening marker.
    pub open: usize,
    /// Byte offset of the closing marker.
    pub close: usize,
}

impl DirectiveToken<'_> {
    /// Offset just past the closing marker, where arguments start.
    pub fn args_start(&self) -> usize {
        self.close + MARKER.len_utf8()
    }

    /// Span covering both markers and the name.
    pub fn span(&self) -> Span {
        Span::new(self.open, self.args_start())
    }
}

/// Outcome of looking for a directive on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located<'a> {
    /// No marker at all.
    None,
    /// A marker with no partner.
    Unterminated {
        /// Byte offset of the lone marker.
        open: usize,
    },
    /// A complete directive name.
    Found(DirectiveToken<'a>),
}

/// Find the first directive on `line` at or after byte offset `from`.
///
/// ```
/// use cgen_core::template::directive::{Located, locate};
/// let Located::Found(tok) = locate("  $p-line$[all] x", 0) else { panic!() };
/// assert_eq!((tok.name, tok.open, tok.close), ("p-line", 2, 9));
/// ```
pub fn locate(line: &str, from: usize) -> Located<'_> {
    let Some(rest) = line.get(from..) else {
        return Located::None;
    };
    let Some(rel_open) = rest.find(MARKER) else {
        return Located::None;
    };
    let open = from + rel_open;
    let name_start = open + MARKER.len_utf8();
    match line[name_start..].find(MARKER) {
        Some(rel_close) => {
            let close = name_start + rel_close;
            Located::Found(DirectiveToken {
                name: &line[name_start..close],
                open,
                close,
            })
        }
        None => Located::Unterminated { open },
    }
}

/// Why a directive's arguments could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgError {
    /// No `[` after the directive.
    MissingListOpen,
    /// `[` without a following `]`.
    MissingListClose,
    /// Nothing after the directive where a file name belongs.
    MissingName,
    /// A template name without the template suffix.
    MissingSuffix,
    /// No `\{` where a variable name or block body should open.
    MissingOpen,
    /// No `\}` after the variable name.
    MissingClose,
    /// `\{\}` with nothing in between.
    EmptyName,
}

impl std::fmt::Display for ArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::MissingListOpen => "no parameter list; missing `[`",
            Self::MissingListClose => "parameter list is not closed; missing `]`",
            Self::MissingName => "no file name given",
            Self::MissingSuffix => "template name lacks the template suffix",
            Self::MissingOpen => "missing `\\{`",
            Self::MissingClose => "missing `\\}`",
            Self::EmptyName => "variable name is empty",
        })
    }
}

/// A parsed `[a|b|c]` parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamList<'a> {
    /// Names between the brackets, split on `|`, in list order. May contain
    /// empty strings.
    pub names: Vec<&'a str>,
    /// Span of the list including both brackets.
    pub span: Span,
}

impl ParamList<'_> {
    /// Offset just past the closing `]`.
    pub fn end(&self) -> usize {
        self.span.end
    }
}

/// Parse the parameter list starting at or after `from`.
pub fn param_list(line: &str, from: usize) -> Result<ParamList<'_>, ArgError> {
    let rest = line.get(from..).unwrap_or("");
    let open = from + rest.find('[').ok_or(ArgError::MissingListOpen)?;
    let close = open + 1 + line[open + 1..].find(']').ok_or(ArgError::MissingListClose)?;
    Ok(ParamList {
        names: line[open + 1..close]
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .collect(),
        span: Span::new(open, close + 1),
    })
}

/// Skip one whitespace separator at `at`, if present.
pub fn skip_separator(line: &str, at: usize) -> usize {
    match line.get(at..).and_then(|rest| rest.chars().next()) {
        Some(c) if c.is_whitespace() => at + c.len_utf8(),
        Some(_) => at,
        None => line.len(),
    }
}

/// Parse a template file name after an optional separator at `at`.
///
/// The name runs up to and including the first occurrence of `suffix`.
pub fn template_name<'a>(
    line: &'a str,
    at: usize,
    suffix: &str,
) -> Result<(&'a str, Span), ArgError> {
    let start = skip_separator(line, at);
    let rest = &line[start..];
    if rest.trim().is_empty() {
        return Err(ArgError::MissingName);
    }
    let end = start + rest.find(suffix).ok_or(ArgError::MissingSuffix)? + suffix.len();
    let raw = &line[start..end];
    let name = raw.trim_start();
    let name_start = end - name.len();
    if name.len() == suffix.len() {
        return Err(ArgError::MissingName);
    }
    Ok((name, Span::new(name_start, end)))
}

/// Parse the file name of a `vars` directive: the rest of the line,
/// trimmed.
pub fn file_name(line: &str, at: usize) -> Result<&str, ArgError> {
    let start = skip_separator(line, at);
    match line[start..].trim() {
        "" => Err(ArgError::MissingName),
        name => Ok(name),
    }
}

/// A `\{NAME\}value` variable definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarDef<'a> {
    /// Text strictly between `\{` and `\}`.
    pub name: &'a str,
    /// Everything after `\}`, verbatim.
    pub value: &'a str,
}

/// Parse a variable definition starting at or after `from`.
pub fn var_definition(line: &str, from: usize) -> Result<VarDef<'_>, ArgError> {
    let rest = line.get(from..).unwrap_or("");
    let open = from + rest.find(OPEN).ok_or(ArgError::MissingOpen)?;
    let name_start = open + OPEN.len();
    let close = name_start + line[name_start..].find(CLOSE).ok_or(ArgError::MissingClose)?;
    let name = &line[name_start..close];
    if name.is_empty() {
        return Err(ArgError::EmptyName);
    }
    Ok(VarDef {
        name,
        value: &line[close + CLOSE.len()..],
    })
}

/// Leading whitespace of `line`.
pub fn indentation(line: &str) -> &str {
    let body = line.trim_start();
    &line[..line.len() - body.len()]
}
