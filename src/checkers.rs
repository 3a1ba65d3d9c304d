//! Type checkers: validate and cast raw values according to their schema entry.
//!
//! A [`Checker`] only knows how to cast a single non-none token and, optionally,
//! how to inspect the cast value further (existence on disk, pair ordering,
//! reachability). The shared pipeline in [`check_item`] and [`cast_item`] runs
//! the steps every type has in common, short-circuiting on the first issue:
//!
//! 1. list shape (`listed` entries accept many values, others exactly one)
//! 2. `none` handling (`allow_none`, and no `none` when bounds are declared)
//! 3. options membership, case-insensitive or by cast value
//! 4. the type-specific cast
//! 5. bounds, for numeric types
//! 6. the checker's own post-cast check
//!
//! Casting runs steps 1, 2 and 4 only.
//!
//! Type names map to checkers through an explicit [`CheckerRegistry`].

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;

use crate::entries::SchemaEntry;
use crate::error::ValueIssue;
use crate::settings::Settings;
use crate::types::{RawConfig, Severity, Value};

/// Everything a checker may look at besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub section: &'a str,
    pub item: &'a str,
    pub entry: &'a SchemaEntry,
    /// Location of the user's config file. Relative paths resolve against its
    /// directory.
    pub config_path: Option<&'a Path>,
    /// The config being checked, for checkers that compare sibling items.
    pub config: Option<&'a RawConfig>,
    pub settings: &'a Settings,
}

/// A validator/caster for one schema type.
pub trait Checker: fmt::Debug + Send + Sync {
    /// Cast one non-none token.
    fn cast_value(&self, raw: &str, ctx: &CheckContext<'_>) -> Result<Value, ValueIssue>;

    /// Inspect a successfully cast value.
    fn check_value(&self, _value: &Value, _ctx: &CheckContext<'_>) -> Result<(), ValueIssue> {
        Ok(())
    }

    /// How issues from this checker are reported.
    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn allows_none(&self, entry: &SchemaEntry) -> bool {
        entry.allow_none
    }

    /// Whether `min`/`max` apply.
    fn bounded(&self) -> bool {
        false
    }

    /// Whether checking needs a user config (file location or sibling items).
    /// Defaults of such types are not validated at schema load.
    fn needs_context(&self) -> bool {
        false
    }
}

/// Explicit type name -> checker registry.
#[derive(Debug, Clone, Default)]
pub struct CheckerRegistry {
    checkers: IndexMap<String, Arc<dyn Checker>>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in type.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register("string", StringChecker { lower: true })
            .register("password", StringChecker { lower: false })
            .register("int", IntChecker)
            .register("float", FloatChecker)
            .register("bool", BoolChecker)
            .register("datetime", DateTimeChecker)
            .register("datetimeorderedpair", DateTimeOrderedPairChecker)
            .register("path", PathChecker::new(PathKind::Any, Severity::Warning))
            .register("filename", PathChecker::new(PathKind::File, Severity::Warning))
            .register("directory", PathChecker::new(PathKind::Dir, Severity::Warning))
            .register(
                "criticalfilename",
                PathChecker::new(PathKind::File, Severity::Error).none(NonePolicy::Never),
            )
            .register(
                "criticaldirectory",
                PathChecker::new(PathKind::Dir, Severity::Error).none(NonePolicy::Never),
            )
            .register(
                "discretionarycriticalfilename",
                PathChecker::new(PathKind::File, Severity::Error).none(NonePolicy::Always),
            );
        #[cfg(feature = "url")]
        registry.register("url", UrlChecker);
        registry
    }

    /// Register (or replace) the checker for `name`. Names are case-insensitive.
    pub fn register(&mut self, name: &str, checker: impl Checker + 'static) -> &mut Self {
        self.register_arc(name, Arc::new(checker))
    }

    pub fn register_arc(&mut self, name: &str, checker: Arc<dyn Checker>) -> &mut Self {
        self.checkers.insert(name.to_lowercase(), checker);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Checker>> {
        self.checkers.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checkers.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checkers.keys().map(String::as_str)
    }

    /// Add every checker of `other`, replacing same-named ones.
    pub fn extend(&mut self, other: &CheckerRegistry) {
        for (name, checker) in &other.checkers {
            self.checkers.insert(name.clone(), Arc::clone(checker));
        }
    }
}

/// An item with no values stands for its schema default.
fn effective_values(values: &[String], entry: &SchemaEntry) -> Vec<String> {
    if values.is_empty() {
        entry.default_values()
    } else {
        values.to_vec()
    }
}

fn is_none(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("none")
}

/// Run the full pipeline over an item's values.
///
/// Returns one slot per value (`None` = valid). A shape failure yields a single
/// issue for the whole item.
pub fn check_item(
    checker: &dyn Checker,
    values: &[String],
    ctx: &CheckContext<'_>,
) -> Vec<Option<ValueIssue>> {
    let values = effective_values(values, ctx.entry);
    if !ctx.entry.listed && values.len() > 1 {
        return vec![Some(ValueIssue::ExpectedSingle)];
    }
    values
        .iter()
        .map(|raw| check_one(checker, raw, ctx).err())
        .collect()
}

fn check_one(checker: &dyn Checker, raw: &str, ctx: &CheckContext<'_>) -> Result<(), ValueIssue> {
    let entry = ctx.entry;
    let raw = raw.trim();

    if is_none(raw) {
        if !checker.allows_none(entry) {
            return Err(ValueIssue::NoneNotAllowed);
        }
        if checker.bounded() && entry.has_bounds() {
            return Err(ValueIssue::NoneWithBounds);
        }
        return Ok(());
    }

    let value = checker.cast_value(raw, ctx);
    if !entry.options.is_empty() && !is_option(checker, raw, value.as_ref().ok(), ctx) {
        return Err(ValueIssue::NotAnOption);
    }

    let value = value?;
    if checker.bounded() {
        check_bounds(&value, entry)?;
    }
    checker.check_value(&value, ctx)
}

/// Options match by name, case-insensitively, or by cast value, so `1.0`
/// matches an option written `1`.
fn is_option(
    checker: &dyn Checker,
    raw: &str,
    value: Option<&Value>,
    ctx: &CheckContext<'_>,
) -> bool {
    ctx.entry.options.iter().any(|option| {
        option.eq_ignore_ascii_case(raw)
            || value.is_some_and(|v| checker.cast_value(option, ctx).is_ok_and(|o| o == *v))
    })
}

fn check_bounds(value: &Value, entry: &SchemaEntry) -> Result<(), ValueIssue> {
    let number = match value {
        Value::Int(i) => *i as f64,
        Value::Float(x) => *x,
        _ => return Ok(()),
    };
    if let Some(min) = entry.min
        && number < min
    {
        return Err(ValueIssue::BelowMin { value: number, min });
    }
    if let Some(max) = entry.max
        && number > max
    {
        return Err(ValueIssue::AboveMax { value: number, max });
    }
    Ok(())
}

/// Cast an item's values. Listed entries always produce a [`Value::List`].
pub fn cast_item(
    checker: &dyn Checker,
    values: &[String],
    ctx: &CheckContext<'_>,
) -> Result<Value, ValueIssue> {
    let values = effective_values(values, ctx.entry);
    if !ctx.entry.listed && values.len() > 1 {
        return Err(ValueIssue::ExpectedSingle);
    }

    let mut cast = Vec::with_capacity(values.len());
    for raw in &values {
        let raw = raw.trim();
        if is_none(raw) {
            if !checker.allows_none(ctx.entry) {
                return Err(ValueIssue::NoneNotAllowed);
            }
            cast.push(Value::None);
        } else {
            cast.push(checker.cast_value(raw, ctx)?);
        }
    }

    if ctx.entry.listed {
        Ok(Value::List(cast))
    } else {
        Ok(cast.pop().unwrap_or(Value::None))
    }
}

/// `y`/`yes`/`true` and `n`/`no`/`false`, any case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" => Some(true),
        "n" | "no" | "false" => Some(false),
        _ => None,
    }
}

fn wrong_type(expected: &str, raw: &str) -> ValueIssue {
    ValueIssue::WrongType {
        expected: expected.to_string(),
        received: raw.to_string(),
    }
}

#[derive(Debug)]
pub struct StringChecker {
    pub lower: bool,
}

impl Checker for StringChecker {
    fn cast_value(&self, raw: &str, _ctx: &CheckContext<'_>) -> Result<Value, ValueIssue> {
        Ok(Value::Str(if self.lower {
            raw.to_lowercase()
        } else {
            raw.to_string()
        }))
    }
}

/// Accepts floats with a zero fractional part (`6.0` -> `6`).
#[derive(Debug)]
pub struct IntChecker;

impl Checker for IntChecker {
    fn cast_value(&self, raw: &str, _ctx: &CheckContext<'_>) -> Result<Value, ValueIssue> {
        if let Ok(i) = raw.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        let x = raw
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .ok_or_else(|| wrong_type("int", raw))?;
        if x.fract() != 0.0 {
            return Err(ValueIssue::NonIntegral);
        }
        if x < i64::MIN as f64 || x > i64::MAX as f64 {
            return Err(wrong_type("int", raw));
        }
        Ok(Value::Int(x as i64))
    }

    fn bounded(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct FloatChecker;

impl Checker for FloatChecker {
    fn cast_value(&self, raw: &str, _ctx: &CheckContext<'_>) -> Result<Value, ValueIssue> {
        raw.parse::<f64>()
            .ok()
            .filter(|x| !x.is_nan())
            .map(Value::Float)
            .ok_or_else(|| wrong_type("float", raw))
    }

    fn bounded(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct BoolChecker;

impl Checker for BoolChecker {
    fn cast_value(&self, raw: &str, _ctx: &CheckContext<'_>) -> Result<Value, ValueIssue> {
        parse_bool(raw)
            .map(Value::Bool)
            .ok_or_else(|| wrong_type("bool", raw))
    }
}

#[derive(Debug)]
pub struct DateTimeChecker;

impl Checker for DateTimeChecker {
    fn cast_value(&self, raw: &str, _ctx: &CheckContext<'_>) -> Result<Value, ValueIssue> {
        parse_datetime(raw)
            .map(Value::DateTime)
            .ok_or_else(|| wrong_type("datetime", raw))
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d %Y", "%d %b %Y", "%b %d %Y",
];

/// Hour offsets of the zone abbreviations accepted as a trailing word.
const ZONES: &[(&str, i64)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
];

/// Parse a date or datetime in one of many common layouts.
///
/// Zoned input (an RFC 3339/2822 offset or a trailing zone abbreviation) is
/// converted to UTC; everything else is taken as-is. The result never
/// depends on the host timezone.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M %z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_utc());
        }
    }

    let (body, offset_hours) = match s.rsplit_once(' ') {
        Some((body, zone)) => match ZONES.iter().find(|(name, _)| zone.eq_ignore_ascii_case(name)) {
            Some((_, hours)) => (body.trim(), *hours),
            None => (s, 0),
        },
        None => (s, 0),
    };

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(body, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(body, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    naive.checked_sub_signed(Duration::hours(offset_hours))
}

/// Which end of an ordered pair an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRole {
    Start,
    End,
}

/// Find the sibling of a paired datetime item among `candidates`.
///
/// The item name must contain a keyword from exactly one of the start/end
/// keyword sets; the sibling is the name obtained by swapping that keyword
/// for one of the other set.
pub fn find_pair<'a>(
    item: &str,
    candidates: impl IntoIterator<Item = &'a str> + Clone,
    settings: &Settings,
) -> Result<(PairRole, String), String> {
    let start = settings
        .pair_start_keywords
        .iter()
        .find(|kw| item.contains(kw.as_str()));
    let end = settings
        .pair_end_keywords
        .iter()
        .find(|kw| item.contains(kw.as_str()));

    let (role, keyword, others) = match (start, end) {
        (Some(kw), None) => (PairRole::Start, kw, &settings.pair_end_keywords),
        (None, Some(kw)) => (PairRole::End, kw, &settings.pair_start_keywords),
        (Some(_), Some(_)) => {
            return Err("name contains both a start and an end keyword".to_string());
        }
        (None, None) => {
            return Err(format!(
                "name must contain one of {} or one of {}",
                settings.pair_start_keywords.join("/"),
                settings.pair_end_keywords.join("/")
            ));
        }
    };

    others
        .iter()
        .map(|other| item.replacen(keyword.as_str(), other, 1))
        .find(|sibling| candidates.clone().into_iter().any(|c| c == sibling))
        .map(|sibling| (role, sibling))
        .ok_or_else(|| format!("no sibling item found for keyword '{keyword}'"))
}

/// A datetime that must come strictly before (or after) its sibling.
#[derive(Debug)]
pub struct DateTimeOrderedPairChecker;

impl Checker for DateTimeOrderedPairChecker {
    fn cast_value(&self, raw: &str, _ctx: &CheckContext<'_>) -> Result<Value, ValueIssue> {
        parse_datetime(raw)
            .map(Value::DateTime)
            .ok_or_else(|| wrong_type("datetime", raw))
    }

    /// Ordering is skipped when the sibling is absent or not a valid datetime;
    /// the sibling reports its own issues.
    fn check_value(&self, value: &Value, ctx: &CheckContext<'_>) -> Result<(), ValueIssue> {
        let (Value::DateTime(this), Some(section)) =
            (value, ctx.config.and_then(|c| c.get(ctx.section)))
        else {
            return Ok(());
        };
        let Ok((role, sibling)) = find_pair(ctx.item, section.keys().map(String::as_str), ctx.settings)
        else {
            return Ok(());
        };
        let Some(other) = section
            .get(&sibling)
            .and_then(|values| values.first())
            .and_then(|raw| parse_datetime(raw))
        else {
            return Ok(());
        };

        match role {
            _ if *this == other => Err(ValueIssue::DateEqual { other: sibling }),
            PairRole::Start if *this > other => Err(ValueIssue::DateAfter { other: sibling }),
            PairRole::End if *this < other => Err(ValueIssue::DateBefore { other: sibling }),
            _ => Ok(()),
        }
    }

    fn needs_context(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Resolved only; existence is not required.
    Any,
    File,
    Dir,
}

/// Overrides the entry's `allow_none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonePolicy {
    Entry,
    Never,
    Always,
}

/// Paths, resolved against the config file's directory.
#[derive(Debug, Clone)]
pub struct PathChecker {
    kind: PathKind,
    severity: Severity,
    none: NonePolicy,
}

impl PathChecker {
    pub fn new(kind: PathKind, severity: Severity) -> Self {
        Self {
            kind,
            severity,
            none: NonePolicy::Entry,
        }
    }

    pub fn none(mut self, policy: NonePolicy) -> Self {
        self.none = policy;
        self
    }
}

impl Checker for PathChecker {
    fn cast_value(&self, raw: &str, ctx: &CheckContext<'_>) -> Result<Value, ValueIssue> {
        Ok(Value::Path(resolve_path(raw, ctx.config_path)))
    }

    fn check_value(&self, value: &Value, _ctx: &CheckContext<'_>) -> Result<(), ValueIssue> {
        let Value::Path(path) = value else {
            return Ok(());
        };
        match self.kind {
            PathKind::Any => Ok(()),
            PathKind::File if !path.is_file() => Err(ValueIssue::FileMissing),
            PathKind::Dir if !path.is_dir() => Err(ValueIssue::DirectoryMissing),
            _ => Ok(()),
        }
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn allows_none(&self, entry: &SchemaEntry) -> bool {
        match self.none {
            NonePolicy::Entry => entry.allow_none,
            NonePolicy::Never => false,
            NonePolicy::Always => true,
        }
    }

    fn needs_context(&self) -> bool {
        true
    }
}

/// Expand `~`, anchor relative paths at the config file's directory (or the
/// working directory when there is no file) and normalize `.`/`..` lexically.
pub fn resolve_path(raw: &str, config_path: Option<&Path>) -> PathBuf {
    let expanded = expand_home(raw.trim());
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        match config_path.and_then(Path::parent) {
            Some(dir) => dir.join(expanded),
            None => expanded,
        }
    };
    let absolute = std::path::absolute(&joined).unwrap_or(joined);
    normalize(&absolute)
}

fn expand_home(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(raw),
    };
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => PathBuf::from(raw),
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// A URL answering `200` to a GET within the configured timeout.
#[cfg(feature = "url")]
#[derive(Debug)]
pub struct UrlChecker;

#[cfg(feature = "url")]
impl Checker for UrlChecker {
    fn cast_value(&self, raw: &str, _ctx: &CheckContext<'_>) -> Result<Value, ValueIssue> {
        Ok(Value::Str(raw.to_string()))
    }

    fn check_value(&self, value: &Value, ctx: &CheckContext<'_>) -> Result<(), ValueIssue> {
        let Value::Str(url) = value else {
            return Ok(());
        };
        let timeout = std::time::Duration::from_secs(ctx.settings.url_timeout_secs);
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        tracing::debug!(url = %url, ?timeout, "Probing URL");
        match agent.get(url.as_str()).call() {
            Ok(response) if response.status() == 200 => Ok(()),
            Ok(response) => Err(ValueIssue::UrlUnreachable {
                reason: format!("status {}", response.status()),
            }),
            Err(e) => Err(ValueIssue::UrlUnreachable {
                reason: e.to_string(),
            }),
        }
    }
}
