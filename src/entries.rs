//! Master schema entries: item declarations, recipe sections and triggers.
//!
//! All three are parsed from `name=value` property tokens produced by the raw
//! parser, e.g. `type=int, default=1, options=[1 2 3]`.

use std::fmt;

use indexmap::IndexMap;

use crate::checkers::parse_bool;
use crate::error::InicheckError;
use crate::settings::Settings;
use crate::types::{RawSection, Situation, Slot};

/// Properties an item declaration may use.
pub const ENTRY_PROPERTIES: &[&str] = &[
    "default",
    "type",
    "options",
    "description",
    "min",
    "max",
    "allow_none",
];

/// Properties a trigger may use. Each may repeat.
pub const TRIGGER_PROPERTIES: &[&str] = &["has_section", "has_item", "has_value"];

/// The value side of one `name=value` property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Scalar(String),
    List(Vec<String>),
}

impl PropValue {
    pub fn into_values(self) -> Vec<String> {
        match self {
            PropValue::Scalar(s) => vec![s],
            PropValue::List(l) => l,
        }
    }
}

/// Parse `name=value` tokens, keeping repeats in order.
///
/// `valid_names` restricts the accepted property names; `item` is only used
/// in error messages.
pub fn parse_entry(
    tokens: &[String],
    item: &str,
    valid_names: Option<&[&str]>,
) -> Result<Vec<(String, PropValue)>, InicheckError> {
    let mut properties = Vec::with_capacity(tokens.len());

    for token in tokens {
        let Some((name, value)) = token.split_once('=') else {
            return Err(InicheckError::MissingEquals {
                item: item.to_string(),
                entry: tokens.join(", "),
            });
        };

        let name = name.trim().to_lowercase();
        if let Some(valid) = valid_names
            && !valid.contains(&name.as_str())
        {
            return Err(InicheckError::InvalidProperty {
                item: item.to_string(),
                property: name,
            });
        }

        let value = value.replace('\t', "");
        let value = value.trim();
        let parsed = if value.contains('[') {
            if !value.contains(']') {
                return Err(InicheckError::UnterminatedList {
                    name,
                    entry: tokens.join(", "),
                });
            }
            let inner: String = value.chars().filter(|c| !matches!(c, '[' | ']')).collect();
            PropValue::List(inner.split_whitespace().map(str::to_string).collect())
        } else {
            PropValue::Scalar(value.to_string())
        };

        properties.push((name, parsed));
    }

    Ok(properties)
}

/// One declared `(section, item)` of the master schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    pub name: String,
    /// Checker key, e.g. `int` or `criticalfilename`.
    pub type_name: String,
    /// Declared default, uncast. `None` when undeclared or declared as `none`.
    pub default: Option<Vec<String>>,
    /// Closed set of permitted values; empty means unconstrained.
    pub options: Vec<String>,
    pub description: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Multiple values are expected.
    pub listed: bool,
    pub allow_none: bool,
}

impl SchemaEntry {
    /// An unconstrained, single-valued string item.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: "string".to_string(),
            default: None,
            options: Vec::new(),
            description: String::new(),
            min: None,
            max: None,
            listed: false,
            allow_none: true,
        }
    }

    /// Build an entry from its property tokens.
    pub fn parse(name: &str, tokens: &[String]) -> Result<Self, InicheckError> {
        let mut entry = Self::new(name);

        for (property, value) in parse_entry(tokens, name, Some(ENTRY_PROPERTIES))? {
            match property.as_str() {
                "default" => {
                    let values = value.into_values();
                    let is_none = matches!(values.as_slice(), [v] if v.eq_ignore_ascii_case("none"));
                    entry.default = (!is_none && !values.is_empty()).then_some(values);
                }
                "type" => entry.set_type(&value.into_values().join(" ")),
                "options" => entry.options = value.into_values(),
                "description" => entry.description = value.into_values().join(" "),
                "min" => entry.min = Some(parse_bound(name, &property, value)?),
                "max" => entry.max = Some(parse_bound(name, &property, value)?),
                "allow_none" => {
                    let raw = value.into_values().join(" ");
                    entry.allow_none =
                        parse_bool(&raw).ok_or_else(|| InicheckError::InvalidPropertyValue {
                            item: name.to_string(),
                            property: property.clone(),
                            value: raw,
                        })?;
                }
                _ => {
                    return Err(InicheckError::InvalidProperty {
                        item: name.to_string(),
                        property,
                    });
                }
            }
        }

        Ok(entry)
    }

    /// Lower-case the type and pull out the `list`/`listed` keyword.
    fn set_type(&mut self, raw: &str) {
        let lowered = raw.to_lowercase();
        let (list_words, rest): (Vec<&str>, Vec<&str>) = lowered
            .split_whitespace()
            .partition(|w| *w == "list" || *w == "listed");
        self.listed = !list_words.is_empty();
        self.type_name = if rest.is_empty() {
            "string".to_string()
        } else {
            rest.join(" ")
        };
    }

    /// Raw default values, with `none` standing in for an undeclared default.
    pub fn default_values(&self) -> Vec<String> {
        self.default
            .clone()
            .unwrap_or_else(|| vec!["none".to_string()])
    }

    pub fn has_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

fn parse_bound(item: &str, property: &str, value: PropValue) -> Result<f64, InicheckError> {
    let raw = value.into_values().join(" ");
    raw.trim()
        .parse::<f64>()
        .map_err(|_| InicheckError::InvalidPropertyValue {
            item: item.to_string(),
            property: property.to_string(),
            value: raw,
        })
}

/// One `[section item value]` condition; each slot may be a wildcard.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub section: Slot,
    pub item: Slot,
    pub value: Slot,
}

impl Condition {
    pub fn matches(&self, situation: &Situation) -> bool {
        self.section.matches(Some(&situation.section))
            && self.item.matches(situation.item.as_deref())
            && self.value.matches(situation.value.as_deref())
    }

    fn is_all_any(&self) -> bool {
        self.section.is_any() && self.item.is_any() && self.value.is_any()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.section, self.item, self.value)
    }
}

/// The condition set of one named trigger. Every condition must match for the
/// trigger to fire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriggerEntry {
    pub conditions: Vec<Condition>,
}

impl TriggerEntry {
    /// Parse `has_section=`, `has_item=` and `has_value=[s i v]` tokens.
    ///
    /// A scalar fills the slot named by its property; a bracketed list fills
    /// slots positionally. Conditions that stay all-wildcard are dropped.
    pub fn parse(recipe: &str, trigger: &str, tokens: &[String]) -> Result<Self, InicheckError> {
        const HIERARCHY: [&str; 3] = ["section", "item", "value"];
        let mut conditions = Vec::new();

        for (property, value) in parse_entry(tokens, trigger, Some(TRIGGER_PROPERTIES))? {
            let mut slots = [Slot::Any, Slot::Any, Slot::Any];
            match value {
                PropValue::List(values) => {
                    if values.len() > slots.len() {
                        return Err(InicheckError::InvalidTrigger {
                            recipe: recipe.to_string(),
                            trigger: trigger.to_string(),
                            reason: format!(
                                "{property} expects at most [section item value], got {} values",
                                values.len()
                            ),
                        });
                    }
                    for (slot, v) in slots.iter_mut().zip(&values) {
                        *slot = Slot::parse(v);
                    }
                }
                PropValue::Scalar(v) => {
                    for (slot, keyword) in slots.iter_mut().zip(HIERARCHY) {
                        if property.contains(keyword) {
                            *slot = Slot::parse(&v);
                        }
                    }
                }
            }

            let [section, item, value] = slots;
            let condition = Condition {
                section,
                item,
                value,
            };
            if !condition.is_all_any() {
                conditions.push(condition);
            }
        }

        Ok(Self { conditions })
    }
}

/// The value side of an adjustment that sets an item.
#[derive(Debug, Clone, PartialEq)]
pub enum AdjValue {
    /// The value bound by the triggering situation.
    Any,
    /// The item's schema default, unless the user set the item.
    Default,
    Literal(Vec<String>),
}

/// One edit a recipe applies to a target section.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Fill every schema default the user hasn't set.
    ApplyDefaults,
    RemoveSection,
    RemoveItem(Slot),
    /// Add the schema default of the named item if it is absent.
    DefaultItem(Slot),
    Set { item: Slot, value: AdjValue },
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::ApplyDefaults => f.write_str("apply_defaults = true"),
            Edit::RemoveSection => f.write_str("remove_section = true"),
            Edit::RemoveItem(item) => write!(f, "remove_item = {item}"),
            Edit::DefaultItem(item) => write!(f, "default_item = {item}"),
            Edit::Set { item, value } => match value {
                AdjValue::Any => write!(f, "{item} = any"),
                AdjValue::Default => write!(f, "{item} = default"),
                AdjValue::Literal(values) => write!(f, "{item} = {}", values.join(", ")),
            },
        }
    }
}

/// A conditional section of the master schema: triggers plus the edits to
/// apply when one fires.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeSection {
    pub name: String,
    pub triggers: IndexMap<String, TriggerEntry>,
    /// Target section -> edits, in declaration order.
    pub adj_config: IndexMap<Slot, Vec<Edit>>,
}

impl RecipeSection {
    /// Split a recipe section's items into triggers (names holding a trigger
    /// keyword) and adjustments (everything else, keyed by target section).
    pub fn parse(
        name: &str,
        section: &RawSection,
        settings: &Settings,
    ) -> Result<Self, InicheckError> {
        let mut triggers = IndexMap::new();
        let mut adj_config: IndexMap<Slot, Vec<Edit>> = IndexMap::new();

        for (item, tokens) in section {
            if settings.is_trigger(item) {
                triggers.insert(item.clone(), TriggerEntry::parse(name, item, tokens)?);
            } else {
                let edits = parse_edits(item, tokens)?;
                adj_config
                    .entry(Slot::parse(item))
                    .or_default()
                    .extend(edits);
            }
        }

        Ok(Self {
            name: name.to_string(),
            triggers,
            adj_config,
        })
    }
}

fn parse_edits(section: &str, tokens: &[String]) -> Result<Vec<Edit>, InicheckError> {
    let mut edits = Vec::new();

    for (property, value) in parse_entry(tokens, section, None)? {
        match property.as_str() {
            "apply_defaults" | "remove_section" => {
                let raw = value.into_values().join(" ");
                let enabled =
                    parse_bool(&raw).ok_or_else(|| InicheckError::InvalidPropertyValue {
                        item: section.to_string(),
                        property: property.clone(),
                        value: raw,
                    })?;
                if enabled {
                    edits.push(if property == "apply_defaults" {
                        Edit::ApplyDefaults
                    } else {
                        Edit::RemoveSection
                    });
                }
            }
            "remove_item" => edits.extend(
                value
                    .into_values()
                    .iter()
                    .map(|v| Edit::RemoveItem(Slot::parse(v))),
            ),
            "default_item" => edits.extend(
                value
                    .into_values()
                    .iter()
                    .map(|v| Edit::DefaultItem(Slot::parse(v))),
            ),
            _ => {
                let value = match &value {
                    PropValue::Scalar(v) if v.eq_ignore_ascii_case("any") => AdjValue::Any,
                    PropValue::Scalar(v) if v.eq_ignore_ascii_case("default") => AdjValue::Default,
                    _ => AdjValue::Literal(value.into_values()),
                };
                edits.push(Edit::Set {
                    item: Slot::parse(&property),
                    value,
                });
            }
        }
    }

    Ok(edits)
}
