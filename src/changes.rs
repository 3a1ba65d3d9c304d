//! Changelogs: declared renames, moves, removals and default changes of schema
//! items, used to spot outdated user configs and migrate them.
//!
//! ```text
//! [meta]
//! info: Renamed topo items
//! date: 2020-01-15
//!
//! [changes]
//! topo/dem -> topo/filename
//! any/old_flag -> REMOVED
//! precip/idw_power/default/1.5 -> precip/idw_power/default/2.0
//! ```
//!
//! Each side is `section/item/property/value`; missing trailing slots are
//! `any`.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::checkers::parse_datetime;
use crate::config::UserConfig;
use crate::error::InicheckError;
use crate::parse;
use crate::schema::MasterSchema;
use crate::types::{RawConfig, Slot};

const REMOVED: &str = "removed";

/// One side of a change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePath {
    pub section: Slot,
    pub item: Slot,
    pub property: Slot,
    pub value: Slot,
}

impl ChangePath {
    fn parse(raw: &str, line: &str) -> Result<Self, InicheckError> {
        let parts: Vec<&str> = raw.split('/').map(str::trim).collect();
        if parts.len() > 4 {
            return Err(InicheckError::ChangeSyntax {
                line: line.to_string(),
                reason: "expected at most section/item/property/value".to_string(),
            });
        }
        let slot = |idx: usize| {
            parts
                .get(idx)
                .filter(|p| !p.is_empty())
                .map_or(Slot::Any, |p| Slot::parse(p))
        };
        Ok(Self {
            section: slot(0),
            item: slot(1),
            property: slot(2),
            value: slot(3),
        })
    }

    fn is_default_change(&self) -> bool {
        matches!(&self.property, Slot::Literal(p) if p == "default")
    }
}

impl fmt::Display for ChangePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.section, self.item, self.property, self.value
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeTarget {
    Removed,
    Path(ChangePath),
}

impl fmt::Display for ChangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeTarget::Removed => f.write_str("REMOVED"),
            ChangeTarget::Path(p) => write!(f, "{p}"),
        }
    }
}

/// One `old -> new` line.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub old: ChangePath,
    pub new: ChangeTarget,
}

impl Change {
    pub fn parse(line: &str) -> Result<Self, InicheckError> {
        let Some((old, new)) = line.split_once("->") else {
            return Err(InicheckError::ChangeSyntax {
                line: line.to_string(),
                reason: "missing '->'".to_string(),
            });
        };
        let old = ChangePath::parse(old.trim(), line)?;
        let new = new.trim();
        let new = if new.eq_ignore_ascii_case(REMOVED) {
            ChangeTarget::Removed
        } else {
            let path = ChangePath::parse(new, line)?;
            match &path.section {
                Slot::Literal(s) if s == REMOVED => ChangeTarget::Removed,
                _ => ChangeTarget::Path(path),
            }
        };
        Ok(Self { old, new })
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.old, self.new)
    }
}

/// A change that applies to a user config.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChange {
    pub section: String,
    pub item: String,
    /// New `(section, item)`; `None` for a removal.
    pub target: Option<(String, String)>,
    /// Replacement value, for default changes.
    pub new_value: Option<String>,
}

impl fmt::Display for ActiveChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.target, &self.new_value) {
            (_, Some(value)) => write!(f, "{}/{} -> {value}", self.section, self.item),
            (Some((s, i)), None) => write!(f, "{}/{} -> {s}/{i}", self.section, self.item),
            (None, None) => write!(f, "{}/{} -> REMOVED", self.section, self.item),
        }
    }
}

/// All changes of one or more changelog files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeLog {
    pub paths: Vec<PathBuf>,
    pub info: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub changes: Vec<Change>,
}

impl ChangeLog {
    /// Read changelogs and check their targets against `schema`.
    pub fn load<P: AsRef<Path>>(paths: &[P], schema: &MasterSchema) -> Result<Self, InicheckError> {
        let mut log = Self::default();
        for path in paths {
            let path = path.as_ref();
            debug!(path = %path.display(), "Reading changelog");
            let content = parse::read_to_string(path)?;
            log.read(&content, path)?;
            log.paths.push(path.to_path_buf());
        }
        log.validate(schema)?;
        Ok(log)
    }

    /// Parse changelog text. `origin` is only used in errors.
    pub fn parse_str(content: &str, origin: &Path) -> Result<Self, InicheckError> {
        let mut log = Self::default();
        log.read(content, origin)?;
        Ok(log)
    }

    fn read(&mut self, content: &str, origin: &Path) -> Result<(), InicheckError> {
        let mut sections = parse::parse_sections(content)?;
        let Some(lines) = sections.shift_remove("changes") else {
            return Err(InicheckError::MissingChanges {
                path: origin.to_path_buf(),
            });
        };

        let meta = parse::parse_items(&sections)?;
        if let Some(meta) = meta.get("meta") {
            if let Some(info) = meta.get("info") {
                self.info = Some(info.join(", "));
            }
            if let Some(date) = meta.get("date").and_then(|d| d.first()) {
                self.date = parse_datetime(date);
            }
        }

        for (_, line) in lines {
            self.changes.push(Change::parse(&line)?);
        }
        Ok(())
    }

    /// Every new location must be `any`, `REMOVED` or declared in the schema,
    /// and a changed property must be `any` or `default`. All mismatches are
    /// reported together.
    pub fn validate(&self, schema: &MasterSchema) -> Result<(), InicheckError> {
        let mismatches: Vec<String> = self
            .changes
            .iter()
            .filter(|c| match &c.new {
                ChangeTarget::Removed => false,
                ChangeTarget::Path(new) => !target_is_valid(new, schema),
            })
            .map(Change::to_string)
            .collect();

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(InicheckError::InvalidChanges(mismatches))
        }
    }

    /// Changes matching `ucfg.cfg`, as `(potential, required)`.
    ///
    /// Required changes are renames, moves and removals of items the user
    /// has. Potential changes are default updates for items still set to an
    /// old default.
    pub fn active_changes(&self, ucfg: &UserConfig<'_>) -> (Vec<ActiveChange>, Vec<ActiveChange>) {
        let mut potential = Vec::new();
        let mut required = Vec::new();
        let schema = ucfg.mcfg;

        for change in &self.changes {
            for (section, items) in &ucfg.cfg {
                if !change.old.section.matches(Some(section.as_str())) {
                    continue;
                }
                for (item, values) in items {
                    if !change.old.item.matches(Some(item.as_str())) {
                        continue;
                    }

                    let new = match &change.new {
                        ChangeTarget::Removed => {
                            required.push(ActiveChange {
                                section: section.clone(),
                                item: item.clone(),
                                target: None,
                                new_value: None,
                            });
                            continue;
                        }
                        ChangeTarget::Path(new) => new,
                    };

                    let new_section = new.section.resolve(Some(section.as_str())).unwrap_or(section.as_str());
                    let new_item = new.item.resolve(Some(item.as_str())).unwrap_or(item.as_str());
                    let Some(entry) = schema.entry(new_section, new_item) else {
                        continue;
                    };

                    if change.old.is_default_change() {
                        let current = values.join(", ");
                        if !change.old.value.matches(Some(current.as_str())) {
                            continue;
                        }
                        let new_value = match &new.value {
                            Slot::Literal(v) => v.clone(),
                            Slot::Any => entry.default_values().join(", "),
                        };
                        potential.push(ActiveChange {
                            section: section.clone(),
                            item: item.clone(),
                            target: Some((new_section.to_string(), new_item.to_string())),
                            new_value: Some(new_value),
                        });
                    } else if new_section != section.as_str() || new_item != item.as_str() {
                        required.push(ActiveChange {
                            section: section.clone(),
                            item: item.clone(),
                            target: Some((new_section.to_string(), new_item.to_string())),
                            new_value: None,
                        });
                    }
                }
            }
        }

        debug!(
            potential = potential.len(),
            required = required.len(),
            "Detected changelog matches"
        );
        (potential, required)
    }
}

fn target_is_valid(new: &ChangePath, schema: &MasterSchema) -> bool {
    let item_known = |item: &Slot, section: Option<&str>| match item {
        Slot::Any => true,
        Slot::Literal(i) => match section {
            Some(s) => schema.entry(s, i).is_some(),
            None => schema.cfg.values().any(|items| items.contains_key(i)),
        },
    };

    let item_ok = match &new.section {
        Slot::Any => item_known(&new.item, None),
        Slot::Literal(s) => schema.section(s).is_some() && item_known(&new.item, Some(s)),
    };
    let property_ok = match &new.property {
        Slot::Any => true,
        Slot::Literal(p) => p == "default",
    };
    item_ok && property_ok
}

/// Migrate `ucfg.cfg` with the given changes.
///
/// Sections left empty by a move are dropped unless the schema declares them.
pub fn apply_changes(
    ucfg: &UserConfig<'_>,
    potential: &[ActiveChange],
    required: &[ActiveChange],
) -> RawConfig {
    let mut cfg = ucfg.cfg.clone();

    for change in potential {
        if let (Some(value), Some(section)) = (&change.new_value, cfg.get_mut(&change.section)) {
            section.insert(change.item.clone(), vec![value.clone()]);
        }
    }

    for change in required {
        let moved = cfg
            .get_mut(&change.section)
            .and_then(|section| section.shift_remove(&change.item));

        if let (Some(values), Some((new_section, new_item))) = (moved, &change.target) {
            cfg.entry(new_section.clone())
                .or_default()
                .insert(new_item.clone(), values);
        }

        let emptied = cfg.get(&change.section).is_some_and(|s| s.is_empty());
        if emptied && ucfg.mcfg.section(&change.section).is_none() {
            cfg.shift_remove(&change.section);
        }
    }

    cfg
}
