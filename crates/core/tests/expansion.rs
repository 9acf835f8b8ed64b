//! End-to-end expansion behaviour through the public engine API.
//!
//! Covers ordering of `all` selections, scope isolation across nested
//! templates, determinism, the per-parameter stub workflow, p-block
//! consumption, and plain-text round trips.

mod common;

use cgen_core::{
    Engine, EngineOptions, IdPolicy, MemoryTemplateStore, Scope, Severity, codes, parse_catalog,
};
use common::{diag_codes, expand, find_diag, param_set, sample_params, store};

#[test]
fn all_selection_follows_id_order_not_insertion_order() {
    let forward = param_set(&[(1, "A", "", ""), (2, "B", "", ""), (3, "C", "", "")]);
    let backward = param_set(&[(3, "C", "", ""), (2, "B", "", ""), (1, "A", "", "")]);
    let s = store(&[("t.cgen_template", "$p-line$[all] p#name")]);
    assert_eq!(expand(&s, "t.cgen_template", &forward).lines, ["A", "B", "C"]);
    assert_eq!(expand(&s, "t.cgen_template", &backward).lines, ["A", "B", "C"]);
}

#[test]
fn all_selection_applies_to_every_parameter_directive() {
    let s = store(&[
        (
            "t.cgen_template",
            "$p-template$[all] item.cgen_template\n$p-block$[all] \\{\nblock p#id\n\\}",
        ),
        ("item.cgen_template", "item p#name"),
    ]);
    let out = expand(&s, "t.cgen_template", &sample_params());
    assert_eq!(
        out.lines,
        [
            "item LED_MODE",
            "item FAN_SPEED",
            "item BEACON_PERIOD",
            "block 10",
            "block 20",
            "block 30"
        ]
    );
}

#[test]
fn equal_ids_keep_insertion_order() {
    let set = param_set(&[(5, "Y", "", ""), (1, "Z", "", ""), (5, "X", "", "")]);
    let s = store(&[("t.cgen_template", "$p-line$[all] p#name")]);
    assert_eq!(expand(&s, "t.cgen_template", &set).lines, ["Z", "Y", "X"]);
}

#[test]
fn child_variables_never_reach_the_parent() {
    let s = store(&[
        (
            "root.cgen_template",
            "$template$ child.cgen_template\nparent sees: DEPTH ONLY_CHILD",
        ),
        (
            "child.cgen_template",
            "$var$\\{DEPTH\\}1\n$var$\\{ONLY_CHILD\\}yes\nchild sees: DEPTH ONLY_CHILD\n$template$ grandchild.cgen_template",
        ),
        ("grandchild.cgen_template", "grandchild sees: DEPTH ONLY_CHILD"),
    ]);
    let out = expand(&s, "root.cgen_template", &sample_params());
    assert_eq!(
        out.lines,
        [
            "child sees: 1 yes",
            "grandchild sees: 1 yes",
            "parent sees: DEPTH ONLY_CHILD"
        ]
    );
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
}

#[test]
fn parameter_tokens_do_not_leak_out_of_p_template() {
    let s = store(&[
        (
            "root.cgen_template",
            "$p-template$[LED_MODE] item.cgen_template\nafter: p#name",
        ),
        ("item.cgen_template", "inside: p#name"),
    ]);
    let out = expand(&s, "root.cgen_template", &sample_params());
    assert_eq!(out.lines, ["inside: LED_MODE", "after: p#name"]);
}

#[test]
fn repeated_runs_are_identical() {
    let s = store(&[
        (
            "root.cgen_template",
            "$var$\\{B\\}2\n$var$\\{A\\}1\n$var$\\{C\\}3\nA B C\n$p-line$[all] p#enumName = p#hexId,\n$template$ sub.cgen_template",
        ),
        ("sub.cgen_template", "$p-block$[all] \\{\ncase p#enumName: A;\n\\}"),
    ]);
    let first = expand(&s, "root.cgen_template", &sample_params());
    let second = expand(&s, "root.cgen_template", &sample_params());
    assert_eq!(first.lines, second.lines);
    assert_eq!(first.lines[0], "1 2 3");
}

#[test]
fn p_template_stub_then_empty_on_second_run() {
    let s = store(&[("root.cgen_template", "  $p-template$[FAN_SPEED] fan.cgen_template")]);
    let params = sample_params();

    let first = expand(&s, "root.cgen_template", &params);
    assert_eq!(first.lines, ["  // Add FAN_SPEED code section here!"]);
    assert_eq!(diag_codes(&first.diagnostics), [codes::MISSING_PARAM_TEMPLATE]);
    assert_eq!(first.stubs, ["fan.cgen_template"]);
    assert_eq!(s.get("fan.cgen_template").as_deref(), Some(""));

    let second = expand(&s, "root.cgen_template", &params);
    assert_eq!(second.lines, first.lines);
    let empty = find_diag(&second.diagnostics, codes::EMPTY_PARAM_TEMPLATE);
    assert_eq!(empty.severity, Severity::Info);
    assert!(second.stubs.is_empty());
}

#[test]
fn p_block_with_no_selection_consumes_its_range() {
    for list in ["[]", "[NOPE|ALSO_NOPE]"] {
        let text = format!("before\n$p-block${list} \\{{\nbody p#name\nmore\n\\}}\nafter");
        let s = store(&[("t.cgen_template", text.as_str())]);
        let out = expand(&s, "t.cgen_template", &sample_params());
        assert_eq!(out.lines, ["before", "after"], "list {list}");
    }
}

#[test]
fn text_without_directives_round_trips() {
    let text = "#include <stdint.h>\n//< generator note\n\n  int x = 1; // trailing\n\t//< indented note\n}";
    let s = store(&[("t.cgen_template", text)]);
    let out = expand(&s, "t.cgen_template", &sample_params());
    assert_eq!(
        out.lines,
        ["#include <stdint.h>", "", "  int x = 1; // trailing", "}"]
    );
    assert!(out.diagnostics.is_empty());
}

#[test]
fn catalog_line_to_hex_id() {
    let load = parse_catalog("10,LED_MODE,uint16_t,0xCAFE", "params.csv", IdPolicy::Explicit);
    let s = store(&[("t.cgen_template", "$p-line$[LED_MODE] p#name=p#hexId")]);
    assert_eq!(expand(&s, "t.cgen_template", &load.parameters).lines, ["LED_MODE=0xa"]);
}

#[test]
fn seeded_scope_reaches_nested_templates() {
    let s = store(&[
        ("root.cgen_template", "$template$ sub.cgen_template"),
        ("sub.cgen_template", "s#name_init();"),
    ]);
    let mut scope = Scope::new();
    scope.define("s#name", "ADB");
    let out = Engine::new(&s, EngineOptions::default())
        .expand("root.cgen_template", &sample_params(), &scope)
        .unwrap();
    assert_eq!(out.lines, ["ADB_init();"]);
}

#[test]
fn problems_are_reported_and_expansion_continues() {
    let s = MemoryTemplateStore::new().with(
        "t.cgen_template",
        "one\n$p-line$[LED_MODE|GHOST] p#name\n$template$ missing.cgen_template\n$oops$\n$p-line$ no list\ntwo",
    );
    let out = expand(&s, "t.cgen_template", &sample_params());
    assert_eq!(out.lines, ["one", "LED_MODE", "two"]);
    assert_eq!(
        diag_codes(&out.diagnostics),
        [
            codes::UNKNOWN_PARAMETER,
            codes::TEMPLATE_NOT_FOUND,
            codes::UNKNOWN_DIRECTIVE,
            codes::MISSING_PARAM_LIST
        ]
    );
    let lines: Vec<_> = out
        .diagnostics
        .iter()
        .map(|d| d.location.as_ref().map(|l| l.line))
        .collect();
    assert_eq!(lines, [Some(2), Some(3), Some(4), Some(5)]);
}
