//! Check operations and their result type.
//!
//! [`handle`] runs a [`CheckAction`] against a loaded schema and returns a
//! [`CheckOutcome`] for the caller to display.

use std::fmt;
use std::path::PathBuf;

use chrono::Local;
use tracing::{debug, info};

use crate::changes::{self, ChangeLog};
use crate::config::UserConfig;
use crate::error::InicheckError;
use crate::report::{self, CheckReport, DiffRow};
use crate::schema::MasterSchema;
use crate::types::CheckAction;
use crate::validate::check_config;

/// Result of a check operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Checked {
        report: CheckReport,
        /// Recipe summary, when requested.
        recipes: Option<String>,
        /// Changelog report, when requested and the schema has changelogs.
        changes: Option<String>,
        /// Non-defaults report, when requested.
        non_defaults: Option<String>,
        /// Number of changelog entries applied, when migration was requested.
        applied: Option<usize>,
        /// Where the resolved config was written.
        written: Option<PathBuf>,
    },
    Compared {
        files: Vec<PathBuf>,
        rows: Vec<DiffRow>,
    },
    Details(String),
}

impl CheckOutcome {
    /// Whether the checked config has errors. Comparisons and details never do.
    pub fn has_errors(&self) -> bool {
        matches!(self, CheckOutcome::Checked { report, .. } if report.has_errors())
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Checked {
                report,
                recipes,
                changes,
                non_defaults,
                applied,
                written,
            } => {
                if let Some(recipes) = recipes {
                    writeln!(f, "{recipes}")?;
                }
                if let Some(changes) = changes {
                    writeln!(f, "{changes}")?;
                }
                if let Some(non_defaults) = non_defaults {
                    writeln!(f, "{non_defaults}")?;
                }
                write!(f, "{report}")?;
                if let Some(applied) = applied {
                    write!(f, "\n\nApplied {applied} changelog entries")?;
                }
                if let Some(path) = written {
                    write!(f, "\n\nResolved config written to {}", path.display())?;
                }
                Ok(())
            }
            CheckOutcome::Compared { files, rows } => {
                write!(f, "{}", report::diff_report(files, rows))
            }
            CheckOutcome::Details(text) => write!(f, "{text}"),
        }
    }
}

/// Migrate what the user wrote, then resolve again so recipes see the new
/// names. Returns the number of changes applied.
fn migrate_raw(ucfg: &mut UserConfig<'_>, log: &ChangeLog) -> Result<usize, InicheckError> {
    let raw = UserConfig::from_raw(ucfg.raw_cfg.clone(), ucfg.mcfg);
    let (potential, required) = log.active_changes(&raw);
    let applied = potential.len() + required.len();
    if applied > 0 {
        ucfg.raw_cfg = changes::apply_changes(&raw, &potential, &required);
        ucfg.apply_recipes()?;
        info!(applied, "Migrated user config with changelog");
    }
    Ok(applied)
}

/// Execute `action` against `schema`.
pub fn handle(action: CheckAction, schema: &MasterSchema) -> Result<CheckOutcome, InicheckError> {
    match action {
        CheckAction::Check {
            config_file,
            write,
            recipes,
            changes: show_changes,
            non_defaults,
            apply_changes: migrate,
        } => {
            let mut ucfg = UserConfig::from_file(&config_file, schema)?;
            ucfg.apply_recipes()?;
            debug!(recipes = ?ucfg.recipe_names(), "Resolved user config");

            let log = if (show_changes || migrate) && !schema.changelogs.is_empty() {
                Some(ChangeLog::load(&schema.changelogs, schema)?)
            } else {
                None
            };

            let changes = match &log {
                Some(log) if show_changes => {
                    let (potential, required) = log.active_changes(&ucfg);
                    Some(report::change_report(&potential, &required))
                }
                _ => None,
            };

            let applied = if migrate {
                Some(match &log {
                    Some(log) => migrate_raw(&mut ucfg, log)?,
                    None => 0,
                })
            } else {
                None
            };

            let report = CheckReport::new(check_config(&ucfg));
            let recipes = recipes.then(|| report::recipe_summary(&ucfg.recipes));
            let non_defaults =
                non_defaults.then(|| report::non_defaults_report(&report::non_defaults(&ucfg)));

            if let Some(path) = &write {
                report::write_config(&ucfg, path, Local::now().naive_local())?;
            }

            Ok(CheckOutcome::Checked {
                report,
                recipes,
                changes,
                non_defaults,
                applied,
                written: write,
            })
        }
        CheckAction::Compare { config_files } => {
            let mut configs = Vec::with_capacity(config_files.len());
            for path in &config_files {
                let mut ucfg = UserConfig::from_file(path, schema)?;
                ucfg.apply_recipes()?;
                configs.push(ucfg);
            }
            let rows = report::compare(schema, &configs);
            Ok(CheckOutcome::Compared {
                files: config_files,
                rows,
            })
        }
        CheckAction::Details { section, item } => Ok(CheckOutcome::Details(report::describe(
            schema,
            &section,
            item.as_deref(),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{CORE_RECIPES, CORE_SCHEMA, FULL_CONFIG, core_schema, write_config};
    use std::fs;

    fn check(config_file: PathBuf) -> CheckAction {
        CheckAction::Check {
            config_file,
            write: None,
            recipes: false,
            changes: false,
            non_defaults: false,
            apply_changes: false,
        }
    }

    #[test]
    fn check_reports_errors() {
        let schema = core_schema();
        let (_dir, path) = write_config("[time]\ntime_step: soon\n");
        let outcome = handle(check(path), &schema).unwrap();
        assert!(outcome.has_errors());
        assert!(outcome.to_string().contains("Expecting int received soon"));
    }

    #[test]
    fn check_with_extras() {
        let schema = core_schema();
        let (dir, path) = write_config(FULL_CONFIG);
        fs::create_dir(dir.path().join("output")).unwrap();
        let out = dir.path().join("resolved.ini");

        let outcome = handle(
            CheckAction::Check {
                config_file: path,
                write: Some(out.clone()),
                recipes: true,
                changes: true,
                non_defaults: true,
                apply_changes: false,
            },
            &schema,
        )
        .unwrap();

        match &outcome {
            CheckOutcome::Checked {
                report,
                recipes,
                changes,
                non_defaults,
                applied,
                written,
            } => {
                assert!(report.is_clean(), "{report}");
                assert!(recipes.as_deref().unwrap().contains("csv_recipe"));
                // No changelogs registered.
                assert!(changes.is_none());
                assert!(applied.is_none());
                assert!(non_defaults.as_deref().unwrap().contains("frequency"));
                assert_eq!(written.as_deref(), Some(out.as_path()));
            }
            other => panic!("Expected Checked, got: {other:?}"),
        }
        assert!(out.exists());
        assert!(outcome.to_string().contains("Resolved config written to"));
    }

    #[test]
    fn check_reports_changelog_matches() {
        let (dir, path) = write_config("[topo]\ndem: topo.nc\n");
        let changelog = dir.path().join("changelog.ini");
        fs::write(&changelog, "[changes]\ntopo/dem -> topo/filename\n").unwrap();
        let schema = MasterSchema::builder()
            .text(CORE_SCHEMA)
            .text(CORE_RECIPES)
            .changelog(&changelog)
            .load()
            .unwrap();

        let mut action = check(path);
        if let CheckAction::Check { changes, .. } = &mut action {
            *changes = true;
        }
        let outcome = handle(action, &schema).unwrap();
        assert!(outcome.to_string().contains("topo/dem -> topo/filename"));
    }

    fn with_changelog(dir: &std::path::Path, changelog: &str) -> MasterSchema {
        let path = dir.join("changelog.ini");
        fs::write(&path, changelog).unwrap();
        MasterSchema::builder()
            .text(CORE_SCHEMA)
            .text(CORE_RECIPES)
            .changelog(&path)
            .load()
            .unwrap()
    }

    #[test]
    fn apply_changes_migrates_before_checking() {
        let (dir, path) = write_config("[topo]\ntype: ipw\ndem: topo.nc\n[precip]\nidw_power: 1.5\n");
        let schema = with_changelog(
            dir.path(),
            "[changes]\ntopo/dem -> topo/filename\n\
             precip/idw_power/default/1.5 -> precip/idw_power/default/2.0\n",
        );
        let out = dir.path().join("migrated.ini");

        let mut action = check(path);
        if let CheckAction::Check {
            write,
            apply_changes,
            ..
        } = &mut action
        {
            *write = Some(out.clone());
            *apply_changes = true;
        }
        let outcome = handle(action, &schema).unwrap();

        match &outcome {
            CheckOutcome::Checked {
                report, applied, ..
            } => {
                assert_eq!(*applied, Some(2));
                assert!(!report.warnings.iter().any(|w| w.item == "dem"), "{report}");
            }
            other => panic!("Expected Checked, got: {other:?}"),
        }
        let migrated = crate::parse::read_file(&out).unwrap();
        assert_eq!(migrated["topo"]["filename"], vec!["topo.nc"]);
        assert!(migrated["topo"].get("dem").is_none());
        assert_eq!(migrated["precip"]["idw_power"], vec!["2.0"]);
        assert!(outcome.to_string().contains("Applied 2 changelog entries"));
    }

    #[test]
    fn unchanged_config_applies_nothing() {
        let (dir, path) = write_config("[topo]\ntype: ipw\nfilename: topo.nc\n");
        let schema = with_changelog(dir.path(), "[changes]\ntopo/dem -> topo/filename\n");
        let mut action = check(path);
        if let CheckAction::Check { apply_changes, .. } = &mut action {
            *apply_changes = true;
        }
        match handle(action, &schema).unwrap() {
            CheckOutcome::Checked { applied, .. } => assert_eq!(applied, Some(0)),
            other => panic!("Expected Checked, got: {other:?}"),
        }
    }

    #[test]
    fn compare_action() {
        let schema = core_schema();
        let (_a, first) = write_config("[time]\ntime_step: 60\n[thermal]\ncorrect_cloud: true\n");
        let (_b, second) = write_config("[time]\ntime_step: 15\n[thermal]\ncorrect_cloud: true\n");

        let outcome = handle(
            CheckAction::Compare {
                config_files: vec![first.clone(), second],
            },
            &schema,
        )
        .unwrap();
        assert!(!outcome.has_errors());
        match &outcome {
            CheckOutcome::Compared { files, rows } => {
                assert_eq!(files[0], first);
                assert!(rows.iter().any(|r| r.item == "time_step"));
                assert!(!rows.iter().any(|r| r.item == "correct_cloud"));
            }
            other => panic!("Expected Compared, got: {other:?}"),
        }
        assert!(outcome.to_string().contains("Base File:"));
    }

    #[test]
    fn missing_config_is_fatal() {
        let schema = core_schema();
        let err = handle(check(PathBuf::from("/nonexistent/config.ini")), &schema).unwrap_err();
        assert!(matches!(err, InicheckError::Io { .. }));
    }

    #[test]
    fn details_action() {
        let schema = core_schema();
        let outcome = handle(
            CheckAction::Details {
                section: "time".into(),
                item: Some("time_step".into()),
            },
            &schema,
        )
        .unwrap();
        assert!(!outcome.has_errors());
        assert!(outcome.to_string().contains("Model time step in minutes"));
    }
}
