//! Human-readable output: the status report, recipe and changelog summaries,
//! non-default values, config comparison, schema details and the resolved
//! config written back out as INI text.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::changes::ActiveChange;
use crate::config::UserConfig;
use crate::entries::{RecipeSection, SchemaEntry};
use crate::error::InicheckError;
use crate::schema::MasterSchema;
use crate::validate::Issue;

const RULE_WIDTH: usize = 80;

fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

/// Warnings and errors of one check, ready for display or JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckReport {
    pub warnings: Vec<Issue>,
    pub errors: Vec<Issue>,
}

impl CheckReport {
    pub fn new((warnings, errors): (Vec<Issue>, Vec<Issue>)) -> Self {
        Self { warnings, errors }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nConfiguration File Status Report:")?;
        writeln!(f, "{}", rule('='))?;

        if self.is_clean() {
            return write!(f, "No errors or warnings were reported with the config file.");
        }

        for (title, issues) in [("WARNINGS", &self.warnings), ("ERRORS", &self.errors)] {
            if issues.is_empty() {
                continue;
            }
            writeln!(f, "{title}:\n")?;
            writeln!(f, "{:<20} {:<30} {}", "Section", "Item", "Message")?;
            writeln!(f, "{}", rule('-'))?;
            for issue in issues {
                writeln!(f, "{issue}")?;
            }
            writeln!(f)?;
        }

        write!(
            f,
            "Warnings: {}  Errors: {}",
            self.warnings.len(),
            self.errors.len()
        )
    }
}

/// The recipes that fired, with their conditions and edits.
pub fn recipe_summary(recipes: &[&RecipeSection]) -> String {
    let mut out = String::from("\nRecipes Summary:\n");
    out.push_str(&rule('='));
    out.push('\n');

    if recipes.is_empty() {
        out.push_str("No recipes were applied.\n");
        return out;
    }

    for recipe in recipes {
        out.push_str(&format!("{}\n{}\n", recipe.name, rule('-')));
        out.push_str("    Conditionals:\n");
        for (name, trigger) in &recipe.triggers {
            for condition in &trigger.conditions {
                out.push_str(&format!("        {name:<30} {condition}\n"));
            }
        }
        out.push_str("    Edits:\n");
        for (section, edits) in &recipe.adj_config {
            for edit in edits {
                out.push_str(&format!("        {:<30} {edit}\n", section.to_string()));
            }
        }
        out.push('\n');
    }
    out
}

/// Changelog matches, as suggestions and required migrations.
pub fn change_report(potential: &[ActiveChange], required: &[ActiveChange]) -> String {
    if potential.is_empty() && required.is_empty() {
        return "No changes from the changelog apply to this config.\n".to_string();
    }

    let mut out = String::from("\nChangelog Summary:\n");
    out.push_str(&rule('='));
    out.push('\n');
    for (title, changes) in [
        ("Default values that have since changed", potential),
        ("Required changes", required),
    ] {
        if changes.is_empty() {
            continue;
        }
        out.push_str(&format!("{title}:\n"));
        for change in changes {
            out.push_str(&format!("    {change}\n"));
        }
        out.push('\n');
    }
    out
}

/// An item whose value differs from its schema default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NonDefault {
    pub section: String,
    pub item: String,
    pub value: String,
    pub default: String,
}

/// The schema default of `entry` as one string, or `None` when it has none.
fn default_text(entry: &SchemaEntry) -> Option<String> {
    let values = entry.default.as_ref()?;
    if values.is_empty() || values.iter().all(|v| v.eq_ignore_ascii_case("none")) {
        return None;
    }
    Some(values.join(", "))
}

/// Declared items of `ucfg.cfg` set to something other than their default,
/// in schema order. Items without a default, or left empty, are skipped.
pub fn non_defaults(ucfg: &UserConfig<'_>) -> Vec<NonDefault> {
    let mut found = Vec::new();
    for (section, entries) in &ucfg.mcfg.cfg {
        let Some(items) = ucfg.cfg.get(section) else {
            continue;
        };
        for (item, entry) in entries {
            let (Some(values), Some(default)) = (items.get(item), default_text(entry)) else {
                continue;
            };
            if values.is_empty() {
                continue;
            }
            let value = values.join(", ");
            if !value.eq_ignore_ascii_case(&default) {
                found.push(NonDefault {
                    section: section.clone(),
                    item: item.clone(),
                    value,
                    default,
                });
            }
        }
    }
    found
}

pub fn non_defaults_report(found: &[NonDefault]) -> String {
    let header = format!("{:<20} {:<30} {:<25} {}", "Section", "Item", "Value", "Default");
    let mut out = String::from("\nConfiguration File Non-Defaults Report:\n");
    out.push_str("The following are all the items that had non-default values specified.\n");
    out.push_str(&format!("{}\n{header}\n{}\n", rule('='), rule('-')));

    if found.is_empty() {
        out.push_str("Every item is set to its default.\n");
    }
    for nd in found {
        out.push_str(&format!(
            "{:<20} {:<30} {:<25} {}\n",
            nd.section, nd.item, nd.value, nd.default
        ));
    }
    out
}

/// One schema item as seen by several configs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRow {
    pub section: String,
    pub item: String,
    /// One value per config; `None` where the item is missing.
    pub values: Vec<Option<String>>,
    pub default: Option<String>,
}

impl DiffRow {
    /// Whether the configs disagree with each other.
    pub fn differs(&self) -> bool {
        let mut values = self.values.iter().map(|v| v.as_deref().map(str::to_lowercase));
        match values.next() {
            Some(first) => values.any(|v| v != first),
            None => false,
        }
    }
}

/// Compare configs item by item over every item `schema` declares.
///
/// A row is kept when the configs disagree, or when they agree on a value
/// that isn't the default. Items missing from every config are skipped.
pub fn compare(schema: &MasterSchema, configs: &[UserConfig<'_>]) -> Vec<DiffRow> {
    let mut rows = Vec::new();
    for (section, entries) in &schema.cfg {
        for (item, entry) in entries {
            let values: Vec<Option<String>> = configs
                .iter()
                .map(|ucfg| {
                    ucfg.cfg
                        .get(section)
                        .and_then(|items| items.get(item))
                        .map(|values| values.join(", "))
                })
                .collect();
            if values.iter().all(Option::is_none) {
                continue;
            }

            let row = DiffRow {
                section: section.clone(),
                item: item.clone(),
                values,
                default: default_text(entry),
            };
            let off_default = row.default.as_ref().is_some_and(|d| {
                row.values
                    .iter()
                    .flatten()
                    .any(|v| !v.eq_ignore_ascii_case(d))
            });
            if row.differs() || off_default {
                rows.push(row);
            }
        }
    }
    rows
}

/// Columns are `Section`, `Item`, one `CFG n` per file and `Default`.
pub fn diff_report(files: &[PathBuf], rows: &[DiffRow]) -> String {
    let mut out = String::from("\nChecking the differences...\n\n");
    for (idx, file) in files.iter().enumerate() {
        let label = if idx == 0 { "Base File:" } else { "Compare File:" };
        out.push_str(&format!("{label:<20}{}\n", file.display()));
    }
    out.push('\n');

    let mut header = format!("{:<20}{:<30}", "Section", "Item");
    for idx in 1..=files.len() {
        header.push_str(&format!("{:<30}", format!("CFG {idx}")));
    }
    header.push_str("Default");
    out.push_str(&format!("{header}\n{}\n", rule('=')));

    if rows.is_empty() {
        out.push_str("No differences found.\n");
    }
    for row in rows {
        let mut line = format!("{:<20}{:<30}", row.section, row.item);
        for value in &row.values {
            line.push_str(&format!("{:<30}", value.as_deref().unwrap_or("Not Found")));
        }
        line.push_str(row.default.as_deref().unwrap_or("None"));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Schema details for a whole section, or one item of it.
pub fn describe(
    schema: &MasterSchema,
    section: &str,
    item: Option<&str>,
) -> Result<String, InicheckError> {
    let section = section.to_lowercase();
    let entries = schema
        .section(&section)
        .ok_or_else(|| InicheckError::UnknownSection {
            section: section.clone(),
        })?;

    let selected: Vec<&SchemaEntry> = match item {
        Some(item) => {
            let item = item.to_lowercase();
            let entry = entries
                .get(&item)
                .ok_or_else(|| InicheckError::UnknownItem {
                    section: section.clone(),
                    item,
                })?;
            vec![entry]
        }
        None => entries.values().collect(),
    };

    let mut out = format!(
        "{:<20} {:<30} {:<25} {:<25} {}\n{}\n",
        "Section",
        "Item",
        "Default",
        "Options",
        "Description",
        rule('=')
    );
    for entry in selected {
        let default = entry
            .default
            .as_ref()
            .map_or_else(|| "None".to_string(), |d| d.join(", "));
        let options = if entry.options.is_empty() {
            String::new()
        } else {
            format!("[{}]", entry.options.join(" "))
        };
        out.push_str(&format!(
            "{section:<20} {:<30} {default:<25} {options:<25} {}\n",
            entry.name, entry.description
        ));
    }
    Ok(out)
}

/// The resolved config as INI text.
///
/// Declared sections come first in schema order, each under a title banner,
/// followed by anything the schema doesn't know.
pub fn generate_config(ucfg: &UserConfig<'_>, generated: NaiveDateTime) -> String {
    let schema = ucfg.mcfg;
    let banner = rule('#');
    let mut out = String::new();

    out.push_str(&format!("{banner}\n#\n"));
    if let Some(header) = &schema.header {
        for line in header.lines() {
            out.push_str(&format!("# {line}\n"));
        }
        out.push_str("#\n");
    }
    out.push_str(&format!(
        "# Date generated: {}\n#\n# Generated using: inicheck v{}\n#\n{banner}\n",
        generated.format("%Y-%m-%d"),
        env!("CARGO_PKG_VERSION"),
    ));

    let declared = schema.cfg.keys().filter(|s| ucfg.cfg.contains_key(*s));
    let undeclared = ucfg.cfg.keys().filter(|s| !schema.cfg.contains_key(*s));

    for section in declared.chain(undeclared) {
        let Some(items) = ucfg.cfg.get(section) else {
            continue;
        };
        let title = schema
            .titles
            .get(section)
            .cloned()
            .unwrap_or_else(|| format!("Configurations for {} section", section.to_uppercase()));

        out.push_str(&format!("\n\n{banner}\n# {title}\n{banner}\n\n[{section}]\n"));
        for (item, values) in items {
            out.push_str(&format!("{:<30} {}\n", format!("{item}:"), values.join(", ")));
        }
    }
    out
}

/// Write [`generate_config`] output to `path`.
pub fn write_config(
    ucfg: &UserConfig<'_>,
    path: &Path,
    generated: NaiveDateTime,
) -> Result<(), InicheckError> {
    fs::write(path, generate_config(ucfg, generated)).map_err(|source| InicheckError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{FULL_CONFIG, core_schema, write_config as write_user};
    use crate::parse;
    use crate::types::Severity;
    use chrono::NaiveDate;

    fn generated() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn clean_report_says_so() {
        let report = CheckReport::default();
        assert!(
            report
                .to_string()
                .contains("No errors or warnings were reported with the config file.")
        );
    }

    #[test]
    fn report_lists_sections_and_counts() {
        let report = CheckReport::new((
            vec![Issue::new("csv", "extra", "Not a registered option.", Severity::Warning)],
            vec![Issue::new("precip", "dk_ncores", "Expecting int received x", Severity::Error)],
        ));
        let text = report.to_string();
        assert!(text.contains("WARNINGS:"));
        assert!(text.contains("ERRORS:"));
        assert!(text.find("WARNINGS:") < text.find("ERRORS:"));
        assert!(text.ends_with("Warnings: 1  Errors: 1"));
        assert!(report.has_errors());
    }

    #[test]
    fn report_renders_json() {
        let report = CheckReport::new((
            Vec::new(),
            vec![Issue::new("time", "time_step", "Bad", Severity::Error)],
        ));
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["errors"][0]["item"], "time_step");
        assert_eq!(json["errors"][0]["severity"], "error");
        assert_eq!(json["warnings"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn recipe_summary_shows_conditions_and_edits() {
        let schema = core_schema();
        let (_dir, path) = write_user(FULL_CONFIG);
        let mut ucfg = UserConfig::from_file(&path, &schema).unwrap();
        ucfg.apply_recipes().unwrap();

        let summary = recipe_summary(&ucfg.recipes);
        assert!(summary.contains("idw_recipe"));
        assert!(summary.contains("[any distribution idw]"));
        assert!(summary.contains("remove_item = dk_ncores"));
        assert!(!summary.contains("krig_recipe"));
    }

    #[test]
    fn empty_change_report() {
        assert!(change_report(&[], &[]).starts_with("No changes"));
    }

    fn resolved<'s>(schema: &'s MasterSchema, content: &str) -> UserConfig<'s> {
        let raw = parse::parse_str(content).unwrap();
        let mut ucfg = UserConfig::from_raw(raw, schema);
        ucfg.apply_recipes().unwrap();
        ucfg
    }

    #[test]
    fn non_defaults_skip_defaulted_items() {
        let schema = core_schema();
        let ucfg = resolved(
            &schema,
            "[precip]\ndistribution: IDW\ndetrend: true\n[output]\nfrequency: 2\n",
        );
        let found = non_defaults(&ucfg);
        let items: Vec<_> = found
            .iter()
            .map(|nd| (nd.section.as_str(), nd.item.as_str()))
            .collect();
        assert_eq!(items, vec![("precip", "distribution"), ("output", "frequency")]);
        assert_eq!(found[0].value, "IDW");
        assert_eq!(found[0].default, "dk");

        let text = non_defaults_report(&found);
        assert!(text.contains("Non-Defaults Report"));
        assert!(text.contains(&format!("{:<20} {:<30} {:<25} {}", "output", "frequency", "2", "1")));
    }

    #[test]
    fn non_defaults_of_defaulted_config_is_empty() {
        let schema = core_schema();
        let ucfg = resolved(&schema, "[output]\n");
        assert!(non_defaults(&ucfg).is_empty());
        assert!(non_defaults_report(&[]).contains("Every item is set to its default."));
    }

    #[test]
    fn compare_keeps_differences_and_off_default_values() {
        let schema = core_schema();
        let base = resolved(
            &schema,
            "[time]\ntime_step: 60\nstart_date: 2019-10-01\n\
             [precip]\ndistribution: dk\n[output]\nfrequency: 2\n",
        );
        let other = resolved(
            &schema,
            "[time]\ntime_step: 30\nstart_date: 2019-10-01\n\
             [precip]\ndistribution: DK\n[output]\nfrequency: 2\n",
        );
        let rows = compare(&schema, &[base, other]);

        let time_step = rows.iter().find(|r| r.item == "time_step").unwrap();
        assert!(time_step.differs());
        assert_eq!(time_step.values, vec![Some("60".into()), Some("30".into())]);
        assert_eq!(time_step.default.as_deref(), Some("60"));

        // Identical, but off the default.
        let frequency = rows.iter().find(|r| r.item == "frequency").unwrap();
        assert!(!frequency.differs());
        assert_eq!(frequency.default.as_deref(), Some("1"));

        // Identical and at the default, or with no default to differ from.
        for item in ["distribution", "time_zone", "out_location", "start_date"] {
            assert!(!rows.iter().any(|r| r.item == item), "{item}");
        }
        // Missing everywhere.
        assert!(!rows.iter().any(|r| r.section == "topo"));
    }

    #[test]
    fn compare_marks_missing_items() {
        let schema = core_schema();
        let base = resolved(&schema, "[precip]\ndistribution: dk\n[thermal]\ncorrect_cloud: false\n");
        let other = resolved(&schema, "[precip]\ndistribution: dk\n");
        let rows = compare(&schema, &[base, other]);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.item, "correct_cloud");
        assert_eq!(row.values, vec![Some("false".into()), None]);
        assert!(row.differs());

        let files = [PathBuf::from("a.ini"), PathBuf::from("b.ini")];
        let text = diff_report(&files, &rows);
        assert!(text.contains(&format!("{:<20}a.ini", "Base File:")));
        assert!(text.contains(&format!("{:<20}b.ini", "Compare File:")));
        assert!(text.contains(&format!("{:<30}{:<30}Default", "CFG 1", "CFG 2")));
        assert!(text.contains("Not Found"));
    }

    #[test]
    fn describe_section_and_item() {
        let schema = core_schema();
        let section = describe(&schema, "precip", None).unwrap();
        assert!(section.contains("krig_variogram_model"));
        assert!(section.contains("[linear power gaussian]"));

        let item = describe(&schema, "Precip", Some("idw_power")).unwrap();
        assert!(item.contains("IDW power"));
        assert!(!item.contains("dk_ncores"));

        assert!(matches!(
            describe(&schema, "snow", None),
            Err(InicheckError::UnknownSection { .. })
        ));
        assert!(matches!(
            describe(&schema, "precip", Some("nope")),
            Err(InicheckError::UnknownItem { .. })
        ));
    }

    #[test]
    fn generated_config_reads_back_identically() {
        let schema = core_schema();
        let (dir, path) = write_user(FULL_CONFIG);
        let mut ucfg = UserConfig::from_file(&path, &schema).unwrap();
        ucfg.apply_recipes().unwrap();

        let out = dir.path().join("out.ini");
        write_config(&ucfg, &out, generated()).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();

        assert!(text.contains("# Test model configuration"));
        assert!(text.contains("# Date generated: 2020-01-15"));
        assert!(text.contains("# Topographic Data"));
        assert!(text.contains("# Configurations for PRECIP section"));
        assert_eq!(parse::parse_str(&text).unwrap(), ucfg.cfg);
    }

    #[test]
    fn generated_config_orders_by_schema() {
        let schema = core_schema();
        let raw = parse::parse_str("[output]\nfrequency: 2\n[snow]\ndepth: 1\n[topo]\ntype: ipw\n")
            .unwrap();
        let ucfg = UserConfig::from_raw(raw, &schema);
        let text = generate_config(&ucfg, generated());

        let topo = text.find("[topo]").unwrap();
        let output = text.find("[output]").unwrap();
        let snow = text.find("[snow]").unwrap();
        assert!(topo < output && output < snow);
        assert!(text.contains(&format!("{:<30} ipw", "type:")));
    }
}
