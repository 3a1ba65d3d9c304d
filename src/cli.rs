//! Clap adapter for inicheck.
//!
//! Compiled only with the `clap` Cargo feature (on by default). [`CheckArgs`]
//! can be flattened into an application's own `#[derive(Parser)]` struct; the
//! only bridge to the core is [`CheckArgs::into_action()`], which turns the
//! parsed flags into a framework-independent [`CheckAction`].

use std::path::PathBuf;

use clap::{ArgGroup, Args};

use crate::types::CheckAction;

/// Flags for checking a config file or showing schema details.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     check: CheckArgs,
/// }
/// ```
#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["config_file", "details", "compare"])
))]
pub struct CheckArgs {
    /// Config file to check.
    #[arg(short = 'f', long = "config")]
    pub config_file: Option<PathBuf>,

    /// Write the resolved config to this file.
    #[arg(short, long, requires = "config_file")]
    pub write: Option<PathBuf>,

    /// Show the recipes applied to the config.
    #[arg(short, long)]
    pub recipes: bool,

    /// Show changelog entries that apply to the config.
    #[arg(short, long)]
    pub changes: bool,

    /// Show the items set to something other than their default.
    #[arg(short, long, requires = "config_file")]
    pub non_defaults: bool,

    /// Migrate the config with the matching changelog entries.
    #[arg(short, long, requires = "config_file")]
    pub apply_changes: bool,

    /// Compare two or more config files item by item.
    #[arg(long, num_args = 2.., value_name = "FILE")]
    pub compare: Option<Vec<PathBuf>>,

    /// Show schema details for a section, optionally narrowed to one item.
    #[arg(short, long, num_args = 1..=2, value_names = ["SECTION", "ITEM"])]
    pub details: Option<Vec<String>>,
}

impl CheckArgs {
    /// Convert parsed args into a framework-independent `CheckAction`.
    ///
    /// `--details` wins over `--compare`, which wins over `--config`. Returns
    /// `None` only when none was given, which clap rejects during parsing.
    pub fn into_action(self) -> Option<CheckAction> {
        if let Some(details) = self.details {
            let mut details = details.into_iter();
            let section = details.next()?;
            return Some(CheckAction::Details {
                section,
                item: details.next(),
            });
        }
        if let Some(config_files) = self.compare {
            return Some(CheckAction::Compare { config_files });
        }

        Some(CheckAction::Check {
            config_file: self.config_file?,
            write: self.write,
            recipes: self.recipes,
            changes: self.changes,
            non_defaults: self.non_defaults,
            apply_changes: self.apply_changes,
        })
    }
}
