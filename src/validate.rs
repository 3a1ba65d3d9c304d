//! Validation of a resolved user config against its schema.
//!
//! Problems with the user's values never fail the call. They come back as
//! [`Issue`]s, split into warnings and errors by the severity of the checker
//! that found them.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::checkers::check_item;
use crate::config::UserConfig;
use crate::types::Severity;

/// One reported problem, located by section and item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub section: String,
    /// Item name, with a 1-based `[n]` suffix when the item holds several values.
    pub item: String,
    pub message: String,
    pub severity: Severity,
}

impl Issue {
    pub fn new(section: &str, item: &str, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            section: section.to_string(),
            item: item.to_string(),
            message: message.into(),
            severity,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20} {:<30} {}", self.section, self.item, self.message)
    }
}

/// Check every value of `ucfg.cfg`, returning `(warnings, errors)`.
pub fn check_config(ucfg: &UserConfig<'_>) -> (Vec<Issue>, Vec<Issue>) {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    let schema = ucfg.mcfg;

    for (section, items) in &ucfg.cfg {
        let Some(declared) = schema.section(section) else {
            errors.push(Issue::new(section, "", "Not a valid section.", Severity::Error));
            continue;
        };

        for (item, values) in items {
            let Some(entry) = declared.get(item) else {
                warnings.push(Issue::new(
                    section,
                    item,
                    "Not a registered option.",
                    Severity::Warning,
                ));
                continue;
            };
            let Some(checker) = schema.checker_for(entry) else {
                errors.push(Issue::new(
                    section,
                    item,
                    format!("No checker for type {}", entry.type_name),
                    Severity::Error,
                ));
                continue;
            };

            let ctx = ucfg.context(section, item, entry);
            let issues = check_item(checker.as_ref(), values, &ctx);
            let indexed = issues.len() > 1;
            let severity = checker.severity();

            for (idx, issue) in issues.into_iter().enumerate() {
                let Some(issue) = issue else { continue };
                let name = if indexed {
                    format!("{item} [{}]", idx + 1)
                } else {
                    item.clone()
                };
                let found = Issue::new(section, &name, issue.to_string(), severity);
                match severity {
                    Severity::Warning => warnings.push(found),
                    Severity::Error => errors.push(found),
                }
            }
        }
    }

    debug!(
        warnings = warnings.len(),
        errors = errors.len(),
        "Checked user config"
    );
    (warnings, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{FULL_CONFIG, core_schema, write_config};
    use std::fs;

    fn checked(content: &str) -> (Vec<Issue>, Vec<Issue>) {
        let schema = core_schema();
        let (dir, path) = write_config(content);
        fs::create_dir(dir.path().join("output")).unwrap();
        let mut ucfg = UserConfig::from_file(&path, &schema).unwrap();
        ucfg.apply_recipes().unwrap();
        check_config(&ucfg)
    }

    #[test]
    fn full_config_is_clean() {
        let (warnings, errors) = checked(FULL_CONFIG);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn unknown_item_is_one_warning() {
        let (warnings, errors) = checked(&format!("{FULL_CONFIG}\n[thermal]\nbogus_item: 5\n"));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item, "bogus_item");
        assert!(warnings[0].message.contains("Not a registered option"));
        assert!(errors.is_empty());
    }

    #[test]
    fn spaced_item_name_is_unregistered() {
        let schema = crate::schema::MasterSchema::parse_str(crate::fixtures::test::BASIC_SCHEMA).unwrap();
        let raw = crate::parse::parse_str("[basic]\nlogin: guest\nnum users: 4\n").unwrap();
        let ucfg = UserConfig::from_raw(raw, &schema);
        let (warnings, errors) = check_config(&ucfg);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item, "num users");
        assert_eq!(warnings[0].message, "Not a registered option.");
    }

    #[test]
    fn unknown_section_is_an_error() {
        let (_, errors) = checked("[snow]\ndepth: 5\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].section, "snow");
        assert_eq!(errors[0].message, "Not a valid section.");
    }

    #[test]
    fn type_and_option_errors() {
        let (_, errors) =
            checked("[precip]\ndistribution: spline\ndk_ncores: tough\ndetrend: maybe\n");
        let messages: Vec<_> = errors
            .iter()
            .map(|e| (e.item.as_str(), e.message.as_str()))
            .collect();
        assert!(messages.contains(&("distribution", "Not a valid option")));
        assert!(messages.contains(&("dk_ncores", "Expecting int received tough")));
        assert!(messages.contains(&("detrend", "Expecting bool received maybe")));
    }

    #[test]
    fn list_issues_are_indexed() {
        let (_, errors) = checked("[output]\nfrequency: 1, 2\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Expected single value received list");

        let schema = crate::schema::MasterSchema::parse_str(
            "[time]\nepochs: type=datetime list\n",
        )
        .unwrap();
        let raw = crate::parse::parse_str("[time]\nepochs: 2019-01-01, nope, 2019-02-01\n").unwrap();
        let ucfg = UserConfig::from_raw(raw, &schema);
        let (_, errors) = check_config(&ucfg);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].item, "epochs [2]");
    }

    #[test]
    fn datetime_list_is_clean() {
        let schema = crate::schema::MasterSchema::parse_str(
            "[time]\nepochs: type=datetime list\n",
        )
        .unwrap();
        let raw = crate::parse::parse_str("[time]\nepochs: 2019-01-01, 2019-02-01\n").unwrap();
        let ucfg = UserConfig::from_raw(raw, &schema);
        let (warnings, errors) = check_config(&ucfg);
        assert!(warnings.is_empty() && errors.is_empty());
    }

    #[test]
    fn missing_files_by_criticality() {
        let (warnings, errors) = checked(
            "[topo]\ntype: netcdf\nfilename: gone.nc\n[csv]\nstations: a\nwind_speed: wind.csv\n",
        );
        assert!(errors.iter().any(|e| e.item == "filename" && e.message == "File does not exist."));
        assert!(
            warnings
                .iter()
                .any(|w| w.item == "wind_speed" && w.message == "File does not exist.")
        );
    }

    #[test]
    fn bounds_are_errors() {
        let (_, errors) = checked("[time]\ntime_step: 0\nstart_date: 2019-01-01\nend_date: 2019-01-02\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].item, "time_step");
        assert!(errors[0].message.contains("minimum"));
    }

    #[test]
    fn pair_order_is_checked() {
        let (_, errors) = checked("[time]\nstart_date: 2019-01-02\nend_date: 2019-01-01\n");
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert!(messages.contains(&"Date occurs after end_date"));
        assert!(messages.contains(&"Date occurs before start_date"));
    }

    #[test]
    fn cast_values_check_clean() {
        let schema = core_schema();
        let (_dir, path) = write_config(FULL_CONFIG);
        let (ucfg, typed) =
            crate::config::load_user_config(&path, &schema, crate::types::CastMode::Strict).unwrap();

        let mut recast = ucfg.clone();
        for (section, items) in &typed {
            for (item, value) in items {
                recast.cfg[section][item] = value.to_raw();
            }
        }
        let (_, errors) = check_config(&recast);
        assert!(errors.is_empty(), "{errors:?}");
    }

    /// Check, cast, write the typed values back and check again.
    fn recheck(schema_text: &str, config_text: &str) -> (Vec<Issue>, Vec<Issue>) {
        let schema = crate::schema::MasterSchema::parse_str(schema_text).unwrap();
        let raw = crate::parse::parse_str(config_text).unwrap();
        let ucfg = UserConfig::from_raw(raw, &schema);
        let (warnings, errors) = check_config(&ucfg);
        assert!(warnings.is_empty() && errors.is_empty(), "{errors:?}");

        let typed = ucfg.cast_all(crate::types::CastMode::Strict).unwrap();
        let mut recast = ucfg.clone();
        for (section, items) in &typed {
            for (item, value) in items {
                recast.cfg[section][item] = value.to_raw();
            }
        }
        check_config(&recast)
    }

    #[test]
    fn cast_float_options_check_clean() {
        let (_, errors) = recheck(
            "[model]\nratio: type=float, options=[0.5 1.0]\nsteps: type=int, options=[1 2]\n",
            "[model]\nratio: 1.0\nsteps: 2.0\n",
        );
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn cast_subsecond_pair_checks_clean() {
        let (_, errors) = recheck(
            "[time]\nstart_date: type=datetimeorderedpair\nend_date: type=datetimeorderedpair\n",
            "[time]\nstart_date: 2019-01-01 00:00:00.2\nend_date: 2019-01-01 00:00:00.7\n",
        );
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn issue_display_is_columnar() {
        let issue = Issue::new("precip", "dk_ncores", "Bad", Severity::Error);
        let line = issue.to_string();
        assert!(line.starts_with("precip "));
        assert_eq!(line.find("dk_ncores"), Some(21));
        assert!(line.ends_with("Bad"));
    }
}
