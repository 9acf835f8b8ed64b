//! Template expansion: directive parsing, variable scopes, template
//! sources, and the recursive expander.

/// Directive recognition and argument parsing.
pub mod directive;
mod dispatch;
/// The recursive expander and its entry point.
pub mod expand;
/// Variable scopes.
pub mod scope;
/// Template sources.
pub mod store;
