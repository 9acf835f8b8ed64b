//! Recursive template expansion.
//!
//! Expanding a template runs three passes over its lines:
//!
//! 1. drop comment lines (`//<`)
//! 2. collect `var`/`vars` definitions into a private copy of the scope and
//!    remove those lines, then substitute the scope into every line
//! 3. scan for directives, splicing each directive's output in place
//!
//! Included templates and parameter blocks are expanded the same way with
//! their own scope copy, so nothing they define leaks back.

use std::io;

use cgen_diagnostics::{Diagnostic, Location, Span, codes};
use cgen_settings::{DEFAULT_TEMPLATE_SUFFIX, Settings};
use serde::Serialize;
use thiserror::Error;

use super::directive::{self, DirectiveKind, DirectiveToken, Located};
use super::dispatch::Edit;
use super::scope::Scope;
use super::store::TemplateStore;
use crate::params::ParameterSet;

/// Lines whose trimmed text starts with this are template comments.
pub const COMMENT_MARKER: &str = "//<";

/// Default template nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Expansion switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Suffix every template name must carry.
    pub template_suffix: String,
    /// Prefix included lines with the directive line's indentation.
    pub continue_indentation: bool,
    /// Create blank files for missing per-parameter templates.
    pub create_stubs: bool,
    /// Maximum template nesting depth.
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            template_suffix: DEFAULT_TEMPLATE_SUFFIX.to_string(),
            continue_indentation: true,
            create_stubs: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineOptions {
    /// Options taken from generator settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            template_suffix: settings.template_suffix.clone(),
            continue_indentation: settings.continue_indentation,
            ..Self::default()
        }
    }

    /// Same options with stub creation switched on or off.
    pub fn with_stubs(mut self, create_stubs: bool) -> Self {
        self.create_stubs = create_stubs;
        self
    }
}

/// A root template could not be read.
#[derive(Debug, Error)]
pub enum ExpandError {
    /// The template does not exist.
    #[error("template {name} not found")]
    TemplateNotFound {
        /// Template as shown to the user.
        name: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The template exists but could not be read.
    #[error("cannot read template {name}: {source}")]
    Io {
        /// Template as shown to the user.
        name: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl ExpandError {
    fn from_io(name: String, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::TemplateNotFound { name, source }
        } else {
            Self::Io { name, source }
        }
    }
}

/// Result of expanding one root template.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Expansion {
    /// Fully expanded output lines.
    pub lines: Vec<String>,
    /// Everything reported along the way.
    pub diagnostics: Vec<Diagnostic>,
    /// Blank templates created for missing per-parameter templates.
    pub stubs: Vec<String>,
}

impl Expansion {
    /// `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Template expansion entry point.
///
/// # Example
/// ```
/// use cgen_core::{Engine, EngineOptions, MemoryTemplateStore, ParameterSet, Parameter, Scope};
/// let store = MemoryTemplateStore::new().with("ids.h.cgen_template", "$p-line$[all] p#name=p#hexId");
/// let mut params = ParameterSet::new();
/// params.insert(Parameter::new(10, "LED_MODE", "uint16_t", "0xCAFE")).unwrap();
/// let engine = Engine::new(&store, EngineOptions::default());
/// let out = engine.expand("ids.h.cgen_template", &params, &Scope::new()).unwrap();
/// assert_eq!(out.lines, ["LED_MODE=0xa"]);
/// ```
pub struct Engine<'s> {
    store: &'s dyn TemplateStore,
    options: EngineOptions,
}

impl<'s> Engine<'s> {
    /// Create an engine reading templates from `store`.
    pub fn new(store: &'s dyn TemplateStore, options: EngineOptions) -> Self {
        Self { store, options }
    }

    /// The engine's options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Expand the named template.
    ///
    /// Fails only if the template itself cannot be read; every problem
    /// inside it is reported in [`Expansion::diagnostics`].
    pub fn expand(
        &self,
        template: &str,
        params: &ParameterSet,
        scope: &Scope,
    ) -> Result<Expansion, ExpandError> {
        let text = self
            .store
            .read(template)
            .map_err(|e| ExpandError::from_io(self.store.display_name(template), e))?;
        Ok(self.expand_str(template, &text, params, scope))
    }

    /// Expand template text that did not come from the store. `origin`
    /// names it in diagnostics; nested templates still come from the store.
    pub fn expand_str(
        &self,
        origin: &str,
        text: &str,
        params: &ParameterSet,
        scope: &Scope,
    ) -> Expansion {
        let mut expander = Expander {
            store: self.store,
            options: &self.options,
            params,
            diags: Vec::new(),
            stubs: Vec::new(),
            depth: 0,
        };
        let lines = expander.expand_buffer(origin, to_lines(text), scope);
        Expansion {
            lines,
            diagnostics: expander.diags,
            stubs: expander.stubs,
        }
    }
}

/// A buffer line with the 1-based line of the template it came from.
#[derive(Debug, Clone)]
pub(super) struct Line {
    pub(super) text: String,
    pub(super) number: usize,
    /// `text` is still the source line, so byte spans in it match the file.
    pub(super) verbatim: bool,
}

fn to_lines(text: &str) -> Vec<Line> {
    text.lines()
        .enumerate()
        .map(|(i, l)| Line {
            text: l.to_string(),
            number: i + 1,
            verbatim: true,
        })
        .collect()
}

/// The directive being handled and where it sits.
pub(super) struct Site<'l> {
    /// Template (or block) name used for diagnostics.
    pub(super) origin: &'l str,
    pub(super) line: &'l Line,
    pub(super) tok: DirectiveToken<'l>,
}

impl Site<'_> {
    pub(super) fn text(&self) -> &str {
        &self.line.text
    }
}

/// Mutable state of one expansion run.
pub(super) struct Expander<'a> {
    pub(super) store: &'a dyn TemplateStore,
    pub(super) options: &'a EngineOptions,
    pub(super) params: &'a ParameterSet,
    pub(super) diags: Vec<Diagnostic>,
    pub(super) stubs: Vec<String>,
    depth: usize,
}

impl Expander<'_> {
    /// Location of a directive for diagnostics.
    pub(super) fn location(&self, site: &Site<'_>) -> Location {
        self.location_at(site.origin, site.line, site.tok.span())
    }

    /// Location of `span` on `line`. Lines changed by substitution keep only
    /// their line number.
    pub(super) fn location_at(&self, origin: &str, line: &Line, span: Span) -> Location {
        let loc = Location::line(self.store.display_name(origin), line.number);
        if line.verbatim {
            loc.with_span(span)
        } else {
            loc
        }
    }

    /// Check the nesting limit before descending from `site`.
    pub(super) fn may_descend(&mut self, site: &Site<'_>) -> bool {
        if self.depth < self.options.max_depth {
            return true;
        }
        let loc = self.location(site);
        self.diags.push(Diagnostic::error(
            codes::RECURSION_LIMIT,
            format!(
                "templates nested more than {} levels deep; directive skipped",
                self.options.max_depth
            ),
            Some(loc),
        ));
        false
    }

    /// Expand a template from the store one level down.
    pub(super) fn nested_template(
        &mut self,
        name: &str,
        scope: &Scope,
    ) -> io::Result<Vec<String>> {
        let text = self.store.read(name)?;
        self.depth += 1;
        let lines = self.expand_buffer(name, to_lines(&text), scope);
        self.depth -= 1;
        Ok(lines)
    }

    /// Expand already-loaded lines one level down.
    pub(super) fn nested_buffer(
        &mut self,
        origin: &str,
        buf: Vec<Line>,
        scope: &Scope,
    ) -> Vec<String> {
        self.depth += 1;
        let lines = self.expand_buffer(origin, buf, scope);
        self.depth -= 1;
        lines
    }

    fn expand_buffer(&mut self, origin: &str, mut buf: Vec<Line>, scope: &Scope) -> Vec<String> {
        let mut scope = scope.clone();
        buf.retain(|l| !l.text.trim_start().starts_with(COMMENT_MARKER));
        self.collect_definitions(origin, &mut buf, &mut scope);
        if !scope.is_empty() {
            for line in &mut buf {
                let text = scope.substitute(&line.text);
                if text != line.text {
                    line.text = text;
                    line.verbatim = false;
                }
            }
        }
        self.run_directives(origin, &mut buf, &mut scope);
        buf.into_iter().map(|l| l.text).collect()
    }

    /// Remove definition lines and lines with an unterminated marker,
    /// applying the definitions to `scope`.
    fn collect_definitions(&mut self, origin: &str, buf: &mut Vec<Line>, scope: &mut Scope) {
        let mut kept = Vec::with_capacity(buf.len());
        for line in std::mem::take(buf) {
            let keep = match directive::locate(&line.text, 0) {
                Located::None => true,
                Located::Unterminated { open } => {
                    self.unterminated(origin, &line, open);
                    false
                }
                Located::Found(tok) => match DirectiveKind::from_name(tok.name) {
                    Some(kind) if kind.is_definition() => {
                        let site = Site {
                            origin,
                            line: &line,
                            tok,
                        };
                        self.define(kind, &site, scope);
                        false
                    }
                    _ => true,
                },
            };
            if keep {
                kept.push(line);
            }
        }
        *buf = kept;
    }

    fn run_directives(&mut self, origin: &str, buf: &mut Vec<Line>, scope: &mut Scope) {
        let mut i = 0;
        while i < buf.len() {
            let Some(edit) = self.dispatch(origin, buf, i, scope) else {
                i += 1;
                continue;
            };
            let end = (i + edit.consumed.max(1)).min(buf.len());
            let number = buf[i].number;
            let added = edit.lines.len();
            buf.splice(
                i..end,
                edit.lines.into_iter().map(|text| Line {
                    text,
                    number,
                    verbatim: false,
                }),
            );
            i += added;
        }
    }

    /// Route the directive on `buf[idx]`, if any, to its handler.
    fn dispatch(
        &mut self,
        origin: &str,
        buf: &[Line],
        idx: usize,
        scope: &mut Scope,
    ) -> Option<Edit> {
        let line = &buf[idx];
        let tok = match directive::locate(&line.text, 0) {
            Located::None => return None,
            Located::Unterminated { open } => {
                self.unterminated(origin, line, open);
                return Some(Edit::discard());
            }
            Located::Found(tok) => tok,
        };
        let site = Site { origin, line, tok };
        let Some(kind) = DirectiveKind::from_name(tok.name) else {
            let loc = self.location(&site);
            self.diags.push(Diagnostic::error(
                codes::UNKNOWN_DIRECTIVE,
                format!("unrecognized directive `{}`; line dropped", tok.name),
                Some(loc),
            ));
            return Some(Edit::discard());
        };
        Some(match kind {
            DirectiveKind::Var | DirectiveKind::Vars => {
                self.define(kind, &site, scope);
                Edit::discard()
            }
            DirectiveKind::Template => self.include_template(&site, scope),
            DirectiveKind::PLine => self.param_lines(&site),
            DirectiveKind::PTemplate => self.param_templates(&site, scope),
            DirectiveKind::PBlock => self.param_block(&site, buf, idx, scope),
        })
    }

    fn unterminated(&mut self, origin: &str, line: &Line, open: usize) {
        let loc = self.location_at(origin, line, Span::new(open, open + 1));
        self.diags.push(Diagnostic::error(
            codes::UNTERMINATED_DIRECTIVE,
            "directive marker `$` is never closed; line dropped",
            Some(loc),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameter;
    use crate::template::store::MemoryTemplateStore;

    fn params() -> ParameterSet {
        let mut set = ParameterSet::new();
        for p in [
            Parameter::new(20, "FAN", "uint32_t", "1"),
            Parameter::new(10, "LED_MODE", "uint16_t", "0xCAFE"),
        ] {
            set.insert(p).unwrap();
        }
        set
    }

    fn run(store: &MemoryTemplateStore, text: &str) -> Expansion {
        let engine = Engine::new(store, EngineOptions::default());
        engine.expand_str("root", text, &params(), &Scope::new())
    }

    #[test]
    fn comments_are_removed() {
        let out = run(&MemoryTemplateStore::new(), "a\n  //< note\nb\n// kept");
        assert_eq!(out.lines, ["a", "b", "// kept"]);
    }

    #[test]
    fn variables_substitute_into_later_and_earlier_lines() {
        let out = run(
            &MemoryTemplateStore::new(),
            "X = VALUE;\n$var$\\{VALUE\\}42\nY = VALUE;",
        );
        assert_eq!(out.lines, ["X = 42;", "Y = 42;"]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn definition_produced_by_substitution_is_honoured() {
        // line 2 only becomes a `var` line once DEF is replaced
        let store = MemoryTemplateStore::new().with("c.cgen_template", "child Y");
        let out = run(
            &store,
            "$var$\\{DEF\\}$var$\nDEF\\{Y\\}5\n$template$ c.cgen_template",
        );
        assert_eq!(out.lines, ["child 5"]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn unterminated_marker_drops_line() {
        let out = run(&MemoryTemplateStore::new(), "a\ncost $5\nb");
        assert_eq!(out.lines, ["a", "b"]);
        assert_eq!(out.diagnostics[0].id, codes::UNTERMINATED_DIRECTIVE);
        assert_eq!(out.diagnostics[0].location.as_ref().map(|l| l.line), Some(2));
    }

    #[test]
    fn spans_are_kept_only_on_unchanged_lines() {
        let out = run(&MemoryTemplateStore::new(), "$var$\\{X\\}abc\nX $nope$\n$nope$");
        let locs: Vec<_> = out
            .diagnostics
            .iter()
            .filter_map(|d| d.location.as_ref())
            .map(|l| (l.line, l.span))
            .collect();
        assert_eq!(locs, [(2, None), (3, Some(Span::new(0, 6)))]);
    }

    #[test]
    fn unknown_directive_drops_line() {
        let out = run(&MemoryTemplateStore::new(), "$nope$ x\nkeep");
        assert_eq!(out.lines, ["keep"]);
        assert_eq!(out.diagnostics[0].id, codes::UNKNOWN_DIRECTIVE);
    }

    #[test]
    fn included_lines_are_not_rescanned() {
        let store = MemoryTemplateStore::new().with("sub.cgen_template", "$p-line$[FAN] p#name");
        let out = run(&store, "$template$ sub.cgen_template\n$p-line$[LED_MODE] p#name");
        assert_eq!(out.lines, ["FAN", "LED_MODE"]);
    }

    #[test]
    fn missing_root_template_is_an_error() {
        let store = MemoryTemplateStore::new();
        let engine = Engine::new(&store, EngineOptions::default());
        let err = engine
            .expand("none.cgen_template", &params(), &Scope::new())
            .unwrap_err();
        assert!(matches!(err, ExpandError::TemplateNotFound { .. }));
    }

    #[test]
    fn empty_root_template_expands_to_nothing() {
        let store = MemoryTemplateStore::new().with("e.cgen_template", "");
        let engine = Engine::new(&store, EngineOptions::default());
        let out = engine
            .expand("e.cgen_template", &params(), &Scope::new())
            .unwrap();
        assert!(out.lines.is_empty());
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn self_inclusion_hits_the_depth_limit() {
        let store = MemoryTemplateStore::new()
            .with("loop.cgen_template", "x\n$template$ loop.cgen_template");
        let options = EngineOptions {
            max_depth: 3,
            ..EngineOptions::default()
        };
        let engine = Engine::new(&store, options);
        let out = engine
            .expand("loop.cgen_template", &params(), &Scope::new())
            .unwrap();
        assert_eq!(out.lines, ["x", "x", "x", "x"]);
        let limits = out
            .diagnostics
            .iter()
            .filter(|d| d.id == codes::RECURSION_LIMIT)
            .count();
        assert_eq!(limits, 1);
    }
}
