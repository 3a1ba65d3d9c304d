//! Shared value types: wildcard slots, situations, severities, typed values
//! and the framework-independent actions the CLI adapter produces.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;

/// Raw config contents: section -> item -> values, in file order.
pub type RawSection = IndexMap<String, Vec<String>>;
pub type RawConfig = IndexMap<String, RawSection>;

/// A fully cast config: section -> item -> typed value.
pub type TypedConfig = IndexMap<String, IndexMap<String, Value>>;

/// Keyword that stands for "match anything" in triggers, edits and changelogs.
pub const ANY: &str = "any";

/// One slot of a condition or edit target: either a wildcard or a literal name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Any,
    Literal(String),
}

impl Slot {
    /// Parse a raw token. `any` (any case) is the wildcard; everything else is
    /// a lower-cased literal.
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        if lowered == ANY {
            Slot::Any
        } else {
            Slot::Literal(lowered)
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Slot::Any)
    }

    /// Does this slot accept `candidate`? A missing candidate only matches `Any`.
    pub fn matches(&self, candidate: Option<&str>) -> bool {
        match (self, candidate) {
            (Slot::Any, _) => true,
            (Slot::Literal(lit), Some(c)) => lit.eq_ignore_ascii_case(c),
            (Slot::Literal(_), None) => false,
        }
    }

    /// Replace the wildcard with `bound`, if one is available.
    pub fn resolve<'a>(&'a self, bound: Option<&'a str>) -> Option<&'a str> {
        match self {
            Slot::Any => bound,
            Slot::Literal(lit) => Some(lit),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Any => f.write_str(ANY),
            Slot::Literal(lit) => f.write_str(lit),
        }
    }
}

/// A concrete binding found in a user's config while matching a condition.
///
/// Empty sections bind only `section`; items without values bind no `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Situation {
    pub section: String,
    pub item: Option<String>,
    pub value: Option<String>,
}

impl Situation {
    pub fn new(section: &str, item: Option<&str>, value: Option<&str>) -> Self {
        Self {
            section: section.to_string(),
            item: item.map(str::to_string),
            value: value.map(str::to_string),
        }
    }
}

impl fmt::Display for Situation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {}]",
            self.section,
            self.item.as_deref().unwrap_or(ANY),
            self.value.as_deref().unwrap_or(ANY)
        )
    }
}

/// How seriously a checker's findings are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A value after casting by its checker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(NaiveDateTime),
    Path(PathBuf),
    List(Vec<Value>),
}

impl Value {
    /// Keep uncast raw values as strings, collapsing single values.
    pub fn from_raw(values: &[String]) -> Self {
        match values {
            [] => Value::None,
            [single] => Value::Str(single.clone()),
            many => Value::List(many.iter().cloned().map(Value::Str).collect()),
        }
    }

    /// Raw tokens that parse back to this value.
    pub fn to_raw(&self) -> Vec<String> {
        match self {
            Value::List(items) => items.iter().flat_map(Value::to_raw).collect(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            // Debug keeps the decimal point, so `1.0` reads back as a float.
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// How strictly the final cast pass treats values that fail to cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CastMode {
    /// Fail with [`InicheckError::Cast`](crate::InicheckError::Cast).
    #[default]
    Strict,
    /// Keep the raw value and leave reporting to [`check_config`](crate::check_config).
    Lenient,
}

/// A check operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckAction {
    /// Check a user config and optionally report extras.
    Check {
        config_file: PathBuf,
        /// Write the resolved config to this path.
        write: Option<PathBuf>,
        /// Include the summary of applied recipes.
        recipes: bool,
        /// Include the changelog report.
        changes: bool,
        /// Include the items whose values differ from their defaults.
        non_defaults: bool,
        /// Migrate the config with the matching changelog entries before
        /// checking and writing it.
        apply_changes: bool,
    },
    /// Compare two or more configs item by item.
    Compare { config_files: Vec<PathBuf> },
    /// Show schema details for a section, or one item of it.
    Details {
        section: String,
        item: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_parses_any_case_insensitively() {
        assert_eq!(Slot::parse(" ANY "), Slot::Any);
        assert_eq!(Slot::parse("Topo"), Slot::Literal("topo".into()));
    }

    #[test]
    fn literal_slot_never_matches_missing() {
        let slot = Slot::parse("distribution");
        assert!(slot.matches(Some("Distribution")));
        assert!(!slot.matches(None));
        assert!(Slot::Any.matches(None));
    }

    #[test]
    fn resolve_prefers_literal() {
        assert_eq!(Slot::Any.resolve(Some("precip")), Some("precip"));
        assert_eq!(Slot::Any.resolve(None), None);
        let lit = Slot::parse("topo");
        assert_eq!(lit.resolve(Some("precip")), Some("topo"));
    }

    #[test]
    fn value_display_joins_lists() {
        let v = Value::List(vec![Value::Int(1), Value::Str("b".into())]);
        assert_eq!(v.to_string(), "1, b");
        assert_eq!(v.to_raw(), vec!["1".to_string(), "b".to_string()]);
    }

    #[test]
    fn value_display_reads_back() {
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        let dt = chrono::NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_milli_opt(0, 0, 0, 200)
            .unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2019-01-01 00:00:00.200");
        let whole = chrono::NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        assert_eq!(Value::DateTime(whole).to_string(), "2019-01-01 15:00:00");
    }

    #[test]
    fn value_from_raw_collapses_single() {
        assert_eq!(Value::from_raw(&["x".into()]), Value::Str("x".into()));
        assert_eq!(Value::from_raw(&[]), Value::None);
    }

    #[test]
    fn value_serializes_untagged() {
        let v = Value::List(vec![Value::Int(2), Value::None, Value::Bool(true)]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[2,null,true]");
    }
}
