//! Directive handlers.
//!
//! Each handler turns one directive line into an [`Edit`]: how many buffer
//! lines starting at the directive are replaced, and by what.

use std::collections::BTreeMap;
use std::io;

use cgen_diagnostics::{Diagnostic, Location, codes};

use super::directive::{self, ArgError, DirectiveKind, ParamList};
use super::expand::{Expander, Line, Site};
use super::scope::Scope;
use crate::params::{Parameter, ParameterSet};
use crate::params::catalog::read_records;

/// Shorthand for building a `BTreeMap<String, String>` context from key-value pairs.
macro_rules! ctx {
    ($($k:expr => $v:expr),+ $(,)?) => {
        BTreeMap::from([$(($k.into(), $v.into())),+])
    };
}

/// Replacement for `consumed` lines starting at the directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Edit {
    pub(super) consumed: usize,
    pub(super) lines: Vec<String>,
}

impl Edit {
    /// Remove the directive line.
    pub(super) fn discard() -> Self {
        Self::replace(Vec::new())
    }

    /// Replace the directive line with `lines`.
    pub(super) fn replace(lines: Vec<String>) -> Self {
        Self { consumed: 1, lines }
    }
}

/// Comment emitted where a per-parameter template produced nothing.
fn marker_comment(param: &Parameter) -> String {
    format!("// Add {} code section here!", param.name())
}

impl<'a> Expander<'a> {
    fn push(&mut self, diag: Diagnostic) {
        self.diags.push(diag);
    }

    fn arg_error(&mut self, site: &Site<'_>, err: ArgError) {
        let id = match err {
            ArgError::MissingListOpen | ArgError::MissingListClose => codes::MISSING_PARAM_LIST,
            ArgError::MissingName => codes::MISSING_TEMPLATE_NAME,
            ArgError::MissingSuffix => codes::MISSING_TEMPLATE_SUFFIX,
            ArgError::MissingOpen if site.tok.name == "p-block" => codes::MISSING_BLOCK_OPEN,
            ArgError::MissingOpen | ArgError::MissingClose | ArgError::EmptyName => {
                codes::MALFORMED_VARIABLE
            }
        };
        let loc = self.location(site);
        self.push(
            Diagnostic::error(id, format!("{}: {err}; line dropped", site.tok.name), Some(loc))
                .with_context(ctx!("directive" => site.tok.name)),
        );
    }

    /// Prefix `lines` with the directive line's indentation when enabled.
    fn indent(&self, site: &Site<'_>, lines: Vec<String>) -> Vec<String> {
        let prefix = directive::indentation(site.text());
        if !self.options.continue_indentation || prefix.is_empty() {
            return lines;
        }
        lines.into_iter().map(|l| format!("{prefix}{l}")).collect()
    }

    /// Resolve a parameter list, reporting names outside the set.
    fn select(&mut self, site: &Site<'_>, list: &ParamList<'_>) -> Vec<&'a Parameter> {
        let params: &'a ParameterSet = self.params;
        let selection = params.select(&list.names);
        for name in selection.unknown {
            let loc = self.location_at(site.origin, site.line, list.span);
            self.push(
                Diagnostic::warn(
                    codes::UNKNOWN_PARAMETER,
                    format!("parameter {name} is not in this file's parameter set; skipped"),
                    Some(loc),
                )
                .with_context(ctx!("directive" => site.tok.name, "parameter" => name)),
            );
        }
        selection.params
    }

    // ── var / vars ──────────────────────────────────────────────────────

    /// Apply a `var` or `vars` directive to `scope`.
    pub(super) fn define(&mut self, kind: DirectiveKind, site: &Site<'_>, scope: &mut Scope) {
        match kind {
            DirectiveKind::Var => self.define_variable(site, scope),
            DirectiveKind::Vars => self.load_variables(site, scope),
            _ => {}
        }
    }

    fn define_variable(&mut self, site: &Site<'_>, scope: &mut Scope) {
        match directive::var_definition(site.text(), site.tok.args_start()) {
            Ok(def) => self.bind(site, scope, def.name, def.value),
            Err(e) => self.arg_error(site, e),
        }
    }

    fn bind(&mut self, site: &Site<'_>, scope: &mut Scope, name: &str, value: &str) {
        let Some(previous) = scope.define(name, value) else {
            return;
        };
        let loc = self.location(site);
        let template = self.store.display_name(site.origin);
        self.push(
            Diagnostic::warn(
                codes::VARIABLE_SHADOWED,
                format!("{template} overrides variable {name} locally with value {value:?}"),
                Some(loc),
            )
            .with_context(ctx!(
                "variable" => name,
                "value" => value,
                "previous" => previous,
                "template" => template.as_str(),
            )),
        );
    }

    fn load_variables(&mut self, site: &Site<'_>, scope: &mut Scope) {
        let name = match directive::file_name(site.text(), site.tok.args_start()) {
            Ok(name) => name,
            Err(e) => return self.arg_error(site, e),
        };
        let file = self.store.display_name(name);
        let text = match self.store.read(name) {
            Ok(text) => text,
            Err(e) => {
                let loc = self.location(site);
                self.push(
                    Diagnostic::warn(
                        codes::VARS_FILE_NOT_FOUND,
                        format!("cannot read variable file {file}: {e}"),
                        Some(loc),
                    )
                    .with_context(ctx!("directive" => "vars", "file" => file.as_str())),
                );
                return;
            }
        };
        for record in read_records(&text) {
            match record {
                Ok(r) if r.fields.len() >= 2 && !r.fields[0].is_empty() => {
                    let value = r.fields[1..].join(",");
                    self.bind(site, scope, &r.fields[0], &value);
                }
                Ok(r) => self.push(Diagnostic::error(
                    codes::MALFORMED_VARIABLE,
                    "variable record needs a name and a value",
                    Some(Location::line(file.as_str(), r.line)),
                )),
                Err((line, message)) => self.push(Diagnostic::error(
                    codes::MALFORMED_VARIABLE,
                    format!("cannot parse variable record: {message}"),
                    Some(Location::line(file.as_str(), line)),
                )),
            }
        }
    }

    // ── template ────────────────────────────────────────────────────────

    pub(super) fn include_template(&mut self, site: &Site<'_>, scope: &Scope) -> Edit {
        let suffix = &self.options.template_suffix;
        let name = match directive::template_name(site.text(), site.tok.args_start(), suffix) {
            Ok((name, _)) => name,
            Err(e) => {
                self.arg_error(site, e);
                return Edit::discard();
            }
        };
        if !self.may_descend(site) {
            return Edit::discard();
        }
        match self.nested_template(name, scope) {
            Ok(lines) => Edit::replace(self.indent(site, lines)),
            Err(e) => {
                self.unreadable_template(site, name, &e);
                Edit::discard()
            }
        }
    }

    fn unreadable_template(&mut self, site: &Site<'_>, name: &str, err: &io::Error) {
        let loc = self.location(site);
        let file = self.store.display_name(name);
        self.push(
            Diagnostic::warn(
                codes::TEMPLATE_NOT_FOUND,
                format!("cannot read template {file}: {err}"),
                Some(loc),
            )
            .with_context(ctx!("directive" => site.tok.name, "template" => name)),
        );
    }

    // ── p-line ──────────────────────────────────────────────────────────

    pub(super) fn param_lines(&mut self, site: &Site<'_>) -> Edit {
        let text = site.text();
        let list = match directive::param_list(text, site.tok.args_start()) {
            Ok(list) => list,
            Err(e) => {
                self.arg_error(site, e);
                return Edit::discard();
            }
        };
        let content = &text[directive::skip_separator(text, list.end())..];
        let lines = self
            .select(site, &list)
            .into_iter()
            .map(|p| p.fill(content))
            .collect();
        Edit::replace(lines)
    }

    // ── p-template ──────────────────────────────────────────────────────

    pub(super) fn param_templates(&mut self, site: &Site<'_>, scope: &Scope) -> Edit {
        let text = site.text();
        let list = match directive::param_list(text, site.tok.args_start()) {
            Ok(list) => list,
            Err(e) => {
                self.arg_error(site, e);
                return Edit::discard();
            }
        };
        let name = match directive::template_name(text, list.end(), &self.options.template_suffix)
        {
            Ok((name, _)) => name,
            Err(e) => {
                self.arg_error(site, e);
                return Edit::discard();
            }
        };
        let selected = self.select(site, &list);
        if selected.is_empty() || !self.may_descend(site) {
            return Edit::discard();
        }

        let mut out = Vec::new();
        for param in selected {
            let local = scope.with_parameter(param);
            match self.nested_template(name, &local) {
                Ok(lines) if lines.is_empty() => {
                    let loc = self.location(site);
                    self.push(
                        Diagnostic::info(
                            codes::EMPTY_PARAM_TEMPLATE,
                            format!(
                                "template {} is empty for parameter {}",
                                self.store.display_name(name),
                                param.name()
                            ),
                            Some(loc),
                        )
                        .with_context(ctx!("template" => name, "parameter" => param.name())),
                    );
                    out.push(marker_comment(param));
                }
                Ok(lines) => out.extend(lines),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.missing_param_template(site, name, param);
                    out.push(marker_comment(param));
                }
                Err(e) => {
                    self.unreadable_template(site, name, &e);
                    out.push(marker_comment(param));
                }
            }
        }
        Edit::replace(self.indent(site, out))
    }

    fn missing_param_template(&mut self, site: &Site<'_>, name: &str, param: &Parameter) {
        let loc = self.location(site);
        let file = self.store.display_name(name);
        let context = ctx!("template" => name, "parameter" => param.name());
        if !self.options.create_stubs {
            self.push(
                Diagnostic::warn(
                    codes::MISSING_PARAM_TEMPLATE,
                    format!("template {file} for parameter {} does not exist", param.name()),
                    Some(loc),
                )
                .with_context(context),
            );
            return;
        }
        match self.store.create_stub(name) {
            Ok(()) => {
                if !self.stubs.contains(&file) {
                    self.stubs.push(file.clone());
                }
                self.push(
                    Diagnostic::warn(
                        codes::MISSING_PARAM_TEMPLATE,
                        format!(
                            "template {file} for parameter {} did not exist; created a blank template",
                            param.name()
                        ),
                        Some(loc),
                    )
                    .with_context(context),
                );
            }
            Err(e) => self.push(
                Diagnostic::error(
                    codes::STUB_CREATE_FAILED,
                    format!("cannot create blank template {file}: {e}"),
                    Some(loc),
                )
                .with_context(context),
            ),
        }
    }

    // ── p-block ─────────────────────────────────────────────────────────

    /// Repeat the lines between the directive and the first later line
    /// holding the close marker. The close line is consumed whole.
    pub(super) fn param_block(
        &mut self,
        site: &Site<'_>,
        buf: &[Line],
        idx: usize,
        scope: &Scope,
    ) -> Edit {
        let text = site.text();
        let list = match directive::param_list(text, site.tok.args_start()) {
            Ok(list) => list,
            Err(e) => {
                self.arg_error(site, e);
                return Edit::discard();
            }
        };
        if !text[list.end()..].contains(directive::OPEN) {
            self.arg_error(site, ArgError::MissingOpen);
            return Edit::discard();
        }
        let Some(rel) = buf[idx + 1..]
            .iter()
            .position(|l| l.text.contains(directive::CLOSE))
        else {
            let loc = self.location(site);
            self.push(
                Diagnostic::error(
                    codes::MISSING_BLOCK_CLOSE,
                    "p-block is never closed with `\\}`; directive line dropped",
                    Some(loc),
                )
                .with_context(ctx!("directive" => "p-block")),
            );
            return Edit::discard();
        };
        let close = idx + 1 + rel;
        let body = &buf[idx + 1..close];

        let selected = self.select(site, &list);
        let mut lines = Vec::new();
        if !selected.is_empty() && self.may_descend(site) {
            for param in selected {
                let local = scope.with_parameter(param);
                lines.extend(self.nested_buffer(site.origin, body.to_vec(), &local));
            }
        }
        Edit {
            consumed: close - idx + 1,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::params::{Parameter, ParameterSet};
    use crate::template::expand::{Engine, EngineOptions, Expansion};
    use crate::template::scope::Scope;
    use crate::template::store::MemoryTemplateStore;
    use cgen_diagnostics::{Severity, codes};

    fn params() -> ParameterSet {
        let mut set = ParameterSet::new();
        for p in [
            Parameter::new(20, "FAN", "uint32_t", "1"),
            Parameter::new(10, "LED_MODE", "uint16_t", "0xCAFE"),
            Parameter::new(15, "TEMP", "float", "0.0"),
        ] {
            set.insert(p).unwrap();
        }
        set
    }

    fn run_with(store: &MemoryTemplateStore, options: EngineOptions, text: &str) -> Expansion {
        let engine = Engine::new(store, options);
        engine.expand_str("root", text, &params(), &Scope::new())
    }

    fn run(store: &MemoryTemplateStore, text: &str) -> Expansion {
        run_with(store, EngineOptions::default(), text)
    }

    fn ids(out: &Expansion) -> Vec<&str> {
        out.diagnostics.iter().map(|d| &*d.id).collect()
    }

    #[test]
    fn p_line_example() {
        let out = run(&MemoryTemplateStore::new(), "$p-line$[LED_MODE] p#name=p#hexId");
        assert_eq!(out.lines, ["LED_MODE=0xa"]);
    }

    #[test]
    fn p_line_all_is_sorted_by_id() {
        let out = run(&MemoryTemplateStore::new(), "$p-line$[all] p#enumName = p#id,");
        assert_eq!(
            out.lines,
            [
                "LED_MODE_param_id = 10,",
                "TEMP_param_id = 15,",
                "FAN_param_id = 20,"
            ]
        );
    }

    #[test]
    fn p_line_unknown_name_is_skipped() {
        let out = run(&MemoryTemplateStore::new(), "$p-line$[FAN|NOPE|TEMP] p#name");
        assert_eq!(out.lines, ["FAN", "TEMP"]);
        assert_eq!(ids(&out), [codes::UNKNOWN_PARAMETER]);
    }

    #[test]
    fn p_line_without_list_is_dropped() {
        let out = run(&MemoryTemplateStore::new(), "$p-line$ p#name\nnext");
        assert_eq!(out.lines, ["next"]);
        assert_eq!(ids(&out), [codes::MISSING_PARAM_LIST]);
    }

    #[test]
    fn template_inherits_scope_and_indentation() {
        let store = MemoryTemplateStore::new().with("sub.cgen_template", "int NAME;\nfloat x;");
        let text = "$var$\\{NAME\\}counter\n    $template$ sub.cgen_template";
        let out = run(&store, text);
        assert_eq!(out.lines, ["    int counter;", "    float x;"]);

        let plain = run_with(
            &store,
            EngineOptions {
                continue_indentation: false,
                ..EngineOptions::default()
            },
            text,
        );
        assert_eq!(plain.lines, ["int counter;", "float x;"]);
    }

    #[test]
    fn child_definitions_do_not_leak() {
        let store = MemoryTemplateStore::new()
            .with("sub.cgen_template", "$var$\\{X\\}child\nin child: X");
        let out = run(&store, "$var$\\{X\\}parent\n$template$ sub.cgen_template\nafter: X");
        assert_eq!(out.lines, ["in child: child", "after: parent"]);
        assert_eq!(ids(&out), [codes::VARIABLE_SHADOWED]);
        assert_eq!(out.diagnostics[0].severity, Severity::Warn);
    }

    #[test]
    fn child_sees_parent_values_substituted() {
        // The directive line is substituted before it runs, so a variable
        // can carry a template name.
        let store = MemoryTemplateStore::new().with("real.cgen_template", "included");
        let out = run(&store, "$var$\\{WHICH\\}real\n$template$ WHICH.cgen_template");
        assert_eq!(out.lines, ["included"]);
    }

    #[test]
    fn missing_template_reports_and_drops() {
        let out = run(&MemoryTemplateStore::new(), "a\n$template$ gone.cgen_template\nb");
        assert_eq!(out.lines, ["a", "b"]);
        assert_eq!(ids(&out), [codes::TEMPLATE_NOT_FOUND]);
    }

    #[test]
    fn template_name_needs_suffix() {
        let out = run(&MemoryTemplateStore::new(), "$template$ sub.h");
        assert!(out.lines.is_empty());
        assert_eq!(ids(&out), [codes::MISSING_TEMPLATE_SUFFIX]);
    }

    #[test]
    fn p_template_binds_parameter_tokens() {
        let store = MemoryTemplateStore::new()
            .with("case.cgen_template", "case p#enumName: return p#defaultValue;");
        let out = run(&store, "\t$p-template$[FAN|LED_MODE] case.cgen_template");
        assert_eq!(
            out.lines,
            [
                "\tcase FAN_param_id: return 1;",
                "\tcase LED_MODE_param_id: return 0xCAFE;"
            ]
        );
    }

    #[test]
    fn p_template_missing_creates_stub_then_reports_empty() {
        let store = MemoryTemplateStore::new();
        let first = run(&store, "$p-template$[FAN] handler.cgen_template");
        assert_eq!(first.lines, ["// Add FAN code section here!"]);
        assert_eq!(ids(&first), [codes::MISSING_PARAM_TEMPLATE]);
        assert_eq!(first.stubs, ["handler.cgen_template"]);
        assert_eq!(store.get("handler.cgen_template").as_deref(), Some(""));

        let second = run(&store, "$p-template$[FAN] handler.cgen_template");
        assert_eq!(second.lines, ["// Add FAN code section here!"]);
        assert_eq!(ids(&second), [codes::EMPTY_PARAM_TEMPLATE]);
        assert!(second.stubs.is_empty());
    }

    #[test]
    fn p_template_without_stubs_leaves_store_alone() {
        let store = MemoryTemplateStore::new();
        let options = EngineOptions::default().with_stubs(false);
        let out = run_with(&store, options, "$p-template$[FAN] handler.cgen_template");
        assert_eq!(out.lines, ["// Add FAN code section here!"]);
        assert!(!store.contains("handler.cgen_template"));
        assert!(out.stubs.is_empty());
    }

    #[test]
    fn p_block_repeats_body_per_parameter() {
        let text = "start\n$p-block$[TEMP|FAN] \\{\n  p#name:\n    p#dType x;\n\\}\nend";
        let out = run(&MemoryTemplateStore::new(), text);
        assert_eq!(
            out.lines,
            ["start", "  TEMP:", "     x;", "  FAN:", "    long x;", "end"]
        );
    }

    #[test]
    fn parameter_directives_fill_tokens_alike() {
        // a default value that names another token
        let mut set = ParameterSet::new();
        set.insert(Parameter::new(10, "LED", "uint16_t", "p#id")).unwrap();
        let store = MemoryTemplateStore::new().with("v.cgen_template", "p#defaultValue");
        let engine = Engine::new(&store, EngineOptions::default());
        let expand = |text: &str| engine.expand_str("root", text, &set, &Scope::new()).lines;

        let line = expand("$p-line$[LED] p#defaultValue");
        assert_eq!(line, ["p#id"]);
        assert_eq!(expand("$p-block$[LED] \\{\np#defaultValue\n\\}"), line);
        assert_eq!(expand("$p-template$[LED] v.cgen_template"), line);
    }

    #[test]
    fn p_block_body_runs_directives() {
        let store = MemoryTemplateStore::new().with("p.cgen_template", "from p#name");
        let text = "$p-block$[LED_MODE] \\{\n$template$ p.cgen_template\n$p-line$[p#name] p#id\n\\}";
        let out = run(&store, text);
        assert_eq!(out.lines, ["from LED_MODE", "10"]);
    }

    #[test]
    fn p_block_empty_selection_consumes_block() {
        let text = "a\n$p-block$[] \\{\nbody\n\\}\nb";
        let out = run(&MemoryTemplateStore::new(), text);
        assert_eq!(out.lines, ["a", "b"]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn p_block_without_close_drops_directive_only() {
        let out = run(&MemoryTemplateStore::new(), "$p-block$[all] \\{\nbody");
        assert_eq!(out.lines, ["body"]);
        assert_eq!(ids(&out), [codes::MISSING_BLOCK_CLOSE]);
    }

    #[test]
    fn p_block_without_open_marker() {
        let out = run(&MemoryTemplateStore::new(), "$p-block$[all]\nbody\n\\}");
        assert_eq!(ids(&out), [codes::MISSING_BLOCK_OPEN]);
        assert_eq!(out.lines, ["body", "\\}"]);
    }

    #[test]
    fn vars_file_defines_variables() {
        let store = MemoryTemplateStore::new()
            .with("common.csv", "# name,value\nPREFIX,adb_\nLIST,a,b\nbroken\n");
        let out = run(&store, "$vars$ common.csv\nPREFIXinit(LIST);");
        assert_eq!(out.lines, ["adb_init(a,b);"]);
        assert_eq!(ids(&out), [codes::MALFORMED_VARIABLE]);
        assert_eq!(out.diagnostics[0].location.as_ref().map(|l| l.line), Some(4));
    }

    #[test]
    fn vars_file_missing() {
        let out = run(&MemoryTemplateStore::new(), "$vars$ none.csv\nx");
        assert_eq!(out.lines, ["x"]);
        assert_eq!(ids(&out), [codes::VARS_FILE_NOT_FOUND]);
    }

    #[test]
    fn malformed_var_is_reported() {
        let out = run(&MemoryTemplateStore::new(), "$var$ NAME value\nNAME");
        assert_eq!(out.lines, ["NAME"]);
        assert_eq!(ids(&out), [codes::MALFORMED_VARIABLE]);
    }

    #[test]
    fn diagnostics_point_at_source_lines() {
        let store = MemoryTemplateStore::new().with("sub.cgen_template", "ok\n\n$bogus$");
        let out = run(&store, "//< comment\n$var$\\{A\\}1\n$template$ sub.cgen_template");
        assert_eq!(out.lines, ["ok", ""]);
        let loc = out.diagnostics[0].location.as_ref().unwrap();
        assert_eq!((loc.file.as_str(), loc.line), ("sub.cgen_template", 3));
    }
}
