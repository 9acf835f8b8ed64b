//! Parameter model: the immutable [`Parameter`] record, its `p#` tokens, and
//! the name-keyed [`ParameterSet`] that selections are resolved against.

/// Catalog loading and per-file parameter set resolution.
pub mod catalog;
/// Stable ordering of parameters by id.
pub mod order;

use indexmap::IndexMap;
use serde::Serialize;

/// Parameter list entry that selects every parameter in the set.
pub const ALL_SELECTOR: &str = "all";

/// `p#name` token.
pub const TOKEN_NAME: &str = "p#name";
/// `p#id` token.
pub const TOKEN_ID: &str = "p#id";
/// `p#enumName` token.
pub const TOKEN_ENUM_NAME: &str = "p#enumName";
/// `p#dataType` token.
pub const TOKEN_DATA_TYPE: &str = "p#dataType";
/// `p#defaultValue` token.
pub const TOKEN_DEFAULT_VALUE: &str = "p#defaultValue";
/// `p#dType` token.
pub const TOKEN_D_TYPE: &str = "p#dType";
/// `p#hexId` token.
pub const TOKEN_HEX_ID: &str = "p#hexId";

/// One configurable parameter of the subsystem.
///
/// Derived fields (`enum_name`, `d_type`, `hex_id`) are computed once at
/// construction; a parameter never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    id: Option<i64>,
    id_text: String,
    name: String,
    data_type: String,
    default_value: String,
    enum_name: String,
    d_type: &'static str,
    hex_id: String,
}

impl Parameter {
    /// Create a parameter with a numeric id.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        data_type: impl Into<String>,
        default_value: impl Into<String>,
    ) -> Self {
        Self::build(Some(id), id.to_string(), name, data_type, default_value)
    }

    /// Create a parameter from a raw id column.
    ///
    /// When `raw_id` is not an integer the parameter keeps the raw text for
    /// `p#id` and `p#hexId` and has no numeric id.
    pub fn from_raw_id(
        raw_id: &str,
        name: impl Into<String>,
        data_type: impl Into<String>,
        default_value: impl Into<String>,
    ) -> Self {
        let raw_id = raw_id.trim();
        match raw_id.parse::<i64>() {
            Ok(id) => Self::new(id, name, data_type, default_value),
            Err(_) => Self::build(None, raw_id.to_string(), name, data_type, default_value),
        }
    }

    fn build(
        id: Option<i64>,
        id_text: String,
        name: impl Into<String>,
        data_type: impl Into<String>,
        default_value: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let data_type = data_type.into();
        let hex_id = match id {
            Some(id) => hex_id(id),
            None => id_text.clone(),
        };
        Self {
            enum_name: format!("{name}_param_id"),
            d_type: long_type_alias(&data_type),
            hex_id,
            id,
            id_text,
            name,
            data_type,
            default_value: default_value.into(),
        }
    }

    /// Numeric id, `None` when the id column did not parse.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Id as written (`p#id`).
    pub fn id_text(&self) -> &str {
        &self.id_text
    }

    /// Unique name within a set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared data type, e.g. `uint16_t`.
    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    /// Default value text.
    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    /// `<name>_param_id`.
    pub fn enum_name(&self) -> &str {
        &self.enum_name
    }

    /// Long type alias of the data type (`short`, `long`, or empty).
    pub fn d_type(&self) -> &str {
        self.d_type
    }

    /// Lowercase hex id, e.g. `0xa`.
    pub fn hex_id(&self) -> &str {
        &self.hex_id
    }

    /// Token/value pairs in the order they are substituted.
    pub fn tokens(&self) -> [(&'static str, &str); 7] {
        [
            (TOKEN_NAME, &self.name),
            (TOKEN_ID, &self.id_text),
            (TOKEN_ENUM_NAME, &self.enum_name),
            (TOKEN_DATA_TYPE, &self.data_type),
            (TOKEN_DEFAULT_VALUE, &self.default_value),
            (TOKEN_D_TYPE, self.d_type),
            (TOKEN_HEX_ID, &self.hex_id),
        ]
    }

    /// Replace every `p#` token in `line` with this parameter's values.
    ///
    /// ```
    /// use cgen_core::Parameter;
    /// let p = Parameter::new(10, "LED_MODE", "uint16_t", "0xCAFE");
    /// assert_eq!(p.fill("p#name=p#hexId"), "LED_MODE=0xa");
    /// ```
    pub fn fill(&self, line: &str) -> String {
        let mut out = line.to_string();
        for (token, value) in self.tokens() {
            if out.contains(token) {
                out = out.replace(token, value);
            }
        }
        out
    }
}

/// `uint16_t` → `short`, `uint32_t` → `long`, anything else → empty.
pub fn long_type_alias(data_type: &str) -> &'static str {
    match data_type {
        "uint16_t" => "short",
        "uint32_t" => "long",
        _ => "",
    }
}

fn hex_id(id: i64) -> String {
    if id < 0 {
        format!("-0x{:x}", id.unsigned_abs())
    } else {
        format!("0x{id:x}")
    }
}

/// Name-keyed parameter collection preserving insertion order.
///
/// The name `all` is reserved for the selector and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    params: IndexMap<String, Parameter>,
}

/// Outcome of resolving a selection list against a [`ParameterSet`].
#[derive(Debug)]
pub struct Selection<'s, 'n> {
    /// Selected parameters in emission order.
    pub params: Vec<&'s Parameter>,
    /// Names that are not in the set, in list order.
    pub unknown: Vec<&'n str>,
}

impl ParameterSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, returning the one it replaced.
    ///
    /// A parameter named `all` is handed back as `Err`.
    pub fn insert(&mut self, param: Parameter) -> Result<Option<Parameter>, Parameter> {
        if param.name == ALL_SELECTOR {
            return Err(param);
        }
        Ok(self.params.insert(param.name.clone(), param))
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// `true` when the set holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    /// Every parameter sorted ascending by id.
    pub fn sorted_by_id(&self) -> Vec<&Parameter> {
        order::sort_by_id(self.iter().collect())
    }

    /// Resolve a selection list.
    ///
    /// If any entry is `all`, every parameter is selected in id order and
    /// the other entries are ignored. Otherwise entries are resolved in list
    /// order; empty entries are skipped and names outside the set are
    /// reported in [`Selection::unknown`].
    pub fn select<'s, 'n>(&'s self, names: &[&'n str]) -> Selection<'s, 'n> {
        if names.contains(&ALL_SELECTOR) {
            return Selection {
                params: self.sorted_by_id(),
                unknown: Vec::new(),
            };
        }
        let mut selection = Selection {
            params: Vec::with_capacity(names.len()),
            unknown: Vec::new(),
        };
        for &name in names.iter().filter(|n| !n.is_empty()) {
            match self.get(name) {
                Some(p) => selection.params.push(p),
                None => selection.unknown.push(name),
            }
        }
        selection
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = indexmap::map::Values<'a, String, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.values()
    }
}
