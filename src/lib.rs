//! Schema-driven checking, normalizing and migration of INI-style config
//! files.
//!
//! A developer describes what a config may hold in a *master config*: every
//! section and item with its type, default, bounds, options and description.
//! The same files may hold *recipes*, conditional rules that fill in defaults,
//! remove sections or set items depending on what the user wrote elsewhere.
//! Inicheck reads a user's config, resolves the recipes over it, then checks
//! and casts every value.
//!
//! ```ignore
//! let schema = MasterSchema::builder()
//!     .path("master.ini")
//!     .path("recipes.ini")
//!     .load()?;
//!
//! let (ucfg, typed) = load_user_config(Path::new("run.ini"), &schema, CastMode::Strict)?;
//! let (warnings, errors) = check_config(&ucfg);
//! ```
//!
//! # Master config syntax
//!
//! ```text
//! [precip]
//! distribution: default=dk, options=[dk idw kriging],
//!               description=Interpolation method
//! idw_power:    type=float, default=2.0, min=0
//! stations:     type=string list
//! ```
//!
//! Entries are comma-separated `property=value` pairs. Lists are written in
//! brackets with spaces. An item without a `type` is a string; appending
//! `list` to the type allows several values. Properties are `type`,
//! `default`, `options`, `description`, `min`, `max` and `allow_none`.
//!
//! # Recipes
//!
//! A section whose name holds a recipe keyword (`recipe` by default) is a
//! recipe. Items whose name holds a trigger keyword are triggers; everything
//! else names a target section and the edits to apply to it:
//!
//! ```text
//! [idw_recipe]
//! idw_trigger: has_value=[any distribution idw]
//! any:         idw_power=default, remove_item=dk_ncores
//! ```
//!
//! Conditions match `[section item value]` triples of the user's config and
//! any slot may be `any`. When a trigger fires, `any` in the edits binds to
//! what the condition matched, so the recipe above only touches the sections
//! that chose `idw`. Recipes run in declaration order over the output of the
//! previous one, and resolution always starts again from the raw config, so
//! applying recipes twice gives the same result.
//!
//! # Checking and casting
//!
//! Every type name maps to a [`Checker`] in the schema's [`CheckerRegistry`].
//! Checking never fails: problems with a user's values come back as
//! [`Issue`]s, split by severity. Missing plain files are warnings, missing
//! critical files are errors. Fatal problems with the tool's own inputs
//! (unreadable files, broken master configs, malformed changelogs) are
//! [`InicheckError`]s.
//!
//! Custom types implement [`Checker`] and are registered on the builder:
//!
//! ```ignore
//! MasterSchema::builder()
//!     .path("master.ini")
//!     .checker("colour", ColourChecker)
//!     .load()?;
//! ```
//!
//! # Changelogs
//!
//! A [`ChangeLog`] records renames, moves, removals and default changes
//! between schema versions. [`ChangeLog::active_changes`] finds the entries
//! that apply to a user config and [`apply_changes`] migrates it. The
//! `apply_changes` flag of [`CheckAction::Check`] migrates before checking.
//!
//! # Reports
//!
//! Besides the status report, [`report`] lists the items set away from their
//! defaults ([`report::non_defaults`]) and compares several configs item by
//! item ([`report::compare`]).
//!
//! # Engine settings
//!
//! The keywords that drive recipe and pair detection come from [`Settings`],
//! which layers compiled defaults, an optional TOML file and `INICHECK_*`
//! environment variables.
//!
//! # CLI adapter
//!
//! With the `clap` feature (on by default), [`CheckArgs`] provides ready-made
//! flags. [`CheckArgs::into_action`] produces a [`CheckAction`], which
//! [`ops::handle`] executes. Nothing else in the crate depends on clap:
//!
//! ```toml
//! inicheck = { version = "...", default-features = false }
//! ```
//!
//! The `url` feature (also default) adds the `url` type, which probes URLs
//! with a blocking HTTP request.

pub mod changes;
pub mod checkers;
pub mod config;
pub mod entries;
pub mod error;
pub mod observe;
pub mod ops;
pub mod parse;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod settings;
pub mod types;
pub mod validate;

#[cfg(feature = "clap")]
mod cli;

#[cfg(test)]
mod fixtures;

pub use changes::{ChangeLog, apply_changes};
pub use checkers::{CheckContext, Checker, CheckerRegistry};
#[cfg(feature = "clap")]
pub use cli::CheckArgs;
pub use config::{UserConfig, load_user_config};
pub use entries::{RecipeSection, SchemaEntry};
pub use error::{InicheckError, ValueIssue};
pub use observe::{NoopObserver, RecipeObserver, TracingObserver};
pub use ops::CheckOutcome;
pub use report::{CheckReport, DiffRow, NonDefault};
pub use schema::{MasterSchema, MasterSchemaBuilder, SchemaModule};
pub use settings::Settings;
pub use types::{CastMode, CheckAction, RawConfig, Severity, Slot, TypedConfig, Value};
pub use validate::{Issue, check_config};
