use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use pf_core::errors::*;
use serde::{
    Deserialize,
    Serialize,
};

err_impl! {SelectorError,
    #[error("malformed label selector clause (expected key=value): {0}")]
    MalformedClause(String),

    #[error("label selector keys and values may not contain ',', '=', '!' or whitespace: {0}")]
    InvalidLabel(String),
}

// Characters that carry meaning in the rendered selector string
const RESERVED: [char; 3] = [',', '=', '!'];

fn is_reserved(c: char) -> bool {
    c.is_whitespace() || RESERVED.contains(&c)
}

/// Equality-based label filter for the pods a monitor watches.
///
/// Keys are kept sorted, so [`Selector::render`] always produces the same string for the same set
/// of labels.  An empty selector renders to the empty string, which the apiserver treats as "match
/// everything in the namespace".  Keys and values can't contain selector syntax, so every entry
/// renders to exactly one equality clause.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Selector(BTreeMap<String, String>);

impl Selector {
    pub fn new() -> Selector {
        Selector::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> anyhow::Result<Selector> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn insert(&mut self, key: &str, value: &str) -> anyhow::Result<Option<String>> {
        if key.is_empty() || key.contains(is_reserved) || value.contains(is_reserved) {
            return Err(SelectorError::invalid_label(&format!("{key}={value}")));
        }
        Ok(self.0.insert(key.into(), value.into()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as a comma-joined list of `key=value` clauses.
    pub fn render(&self) -> String {
        self.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(",")
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

// Inverse of render; whitespace around keys and values is ignored, and an empty string is the
// empty selector.  `key==value` is the same clause as `key=value`; set-based and inequality
// clauses (`key!=value`, `key in (...)`) are rejected.  Values may be empty (`tier=` matches pods
// whose `tier` label is blank).
impl FromStr for Selector {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Selector> {
        let mut sel = Selector::new();
        for clause in s.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            let Some((key, value)) = clause.split_once('=') else {
                return Err(SelectorError::malformed_clause(clause));
            };
            let value = value.strip_prefix('=').unwrap_or(value);
            if sel.insert(key.trim(), value.trim()).is_err() {
                return Err(SelectorError::malformed_clause(clause));
            }
        }
        Ok(sel)
    }
}

impl TryFrom<BTreeMap<String, String>> for Selector {
    type Error = anyhow::Error;

    fn try_from(labels: BTreeMap<String, String>) -> anyhow::Result<Selector> {
        let mut sel = Selector::new();
        for (key, value) in &labels {
            sel.insert(key, value)?;
        }
        Ok(sel)
    }
}

impl From<Selector> for BTreeMap<String, String> {
    fn from(sel: Selector) -> BTreeMap<String, String> {
        sel.0
    }
}
