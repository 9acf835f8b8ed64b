use std::collections::BTreeMap;

use crate::params::Parameter;

/// Variable bindings visible while expanding one template.
///
/// Every template works on its own copy: bindings made while expanding a
/// sub-template never reach the parent. Substitution walks the variables in
/// name order, then fills the `p#` tokens of the bound parameter in
/// [`Parameter::tokens`] order, the same order `p-line` uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    vars: BTreeMap<String, String>,
    param: Option<Parameter>,
}

impl Scope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// `true` when `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Bind `name`, returning the value it shadows.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.vars.insert(name.into(), value.into())
    }

    /// Bind the `p#` tokens of `param`, replacing any parameter bound before.
    pub fn bind_parameter(&mut self, param: &Parameter) {
        self.param = Some(param.clone());
    }

    /// Copy of this scope with the `p#` tokens of `param` bound.
    pub fn with_parameter(&self, param: &Parameter) -> Self {
        let mut scope = self.clone();
        scope.bind_parameter(param);
        scope
    }

    /// Replace every occurrence of every variable in `line`, then the
    /// bound parameter's tokens.
    pub fn substitute(&self, line: &str) -> String {
        let mut out = line.to_string();
        for (name, value) in &self.vars {
            if !name.is_empty() && out.contains(name.as_str()) {
                out = out.replace(name.as_str(), value);
            }
        }
        match &self.param {
            Some(param) => param.fill(&out),
            None => out,
        }
    }

    /// Variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// `true` when no variable and no parameter is bound.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.param.is_none()
    }
}
