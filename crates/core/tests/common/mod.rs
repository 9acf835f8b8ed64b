//! Shared test helpers for `cgen_core` integration tests.

#![allow(unreachable_pub)]

use cgen_core::{
    Diagnostic, Engine, EngineOptions, Expansion, MemoryTemplateStore, Parameter, ParameterSet,
    Scope,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// Build a parameter set from `(id, name, dataType, defaultValue)` rows,
/// in the given insertion order.
#[allow(dead_code)]
pub fn param_set(rows: &[(i64, &str, &str, &str)]) -> ParameterSet {
    let mut set = ParameterSet::new();
    for &(id, name, data_type, default_value) in rows {
        set.insert(Parameter::new(id, name, data_type, default_value))
            .unwrap_or_else(|p| panic!("reserved name {}", p.name()));
    }
    set
}

/// A small three-parameter catalog, deliberately not in id order.
#[allow(dead_code)]
pub fn sample_params() -> ParameterSet {
    param_set(&[
        (30, "BEACON_PERIOD", "uint32_t", "60"),
        (10, "LED_MODE", "uint16_t", "0xCAFE"),
        (20, "FAN_SPEED", "uint8_t", "3"),
    ])
}

/// In-memory store holding the given `(name, text)` templates.
#[allow(dead_code)]
pub fn store(files: &[(&str, &str)]) -> MemoryTemplateStore {
    files
        .iter()
        .fold(MemoryTemplateStore::new(), |s, (name, text)| s.with(*name, *text))
}

// ─── Expansion helpers ───────────────────────────────────────────────────────

/// Expand `template` from `store` with default options and an empty scope.
#[allow(dead_code)]
pub fn expand(store: &MemoryTemplateStore, template: &str, params: &ParameterSet) -> Expansion {
    Engine::new(store, EngineOptions::default())
        .expand(template, params, &Scope::new())
        .unwrap_or_else(|e| panic!("expansion of {template} failed: {e}"))
}

/// Collect diagnostic codes, in order.
#[allow(dead_code)]
pub fn diag_codes(diags: &[Diagnostic]) -> Vec<String> {
    diags.iter().map(|d| d.id.to_string()).collect()
}

/// Find first diagnostic with the given code.
#[allow(dead_code)]
pub fn find_diag<'a>(diags: &'a [Diagnostic], code: &str) -> &'a Diagnostic {
    diags
        .iter()
        .find(|d| &*d.id == code)
        .unwrap_or_else(|| panic!("expected diagnostic {code}"))
}
