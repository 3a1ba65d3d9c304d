//! Error types.
//!
//! Two kinds of failure are kept apart on purpose:
//!
//! - [`InicheckError`] is fatal. It is returned for broken schema files, broken
//!   recipes, unreadable files and malformed changelogs. These point at the
//!   tool's own configuration and always propagate to the caller.
//! - [`ValueIssue`] describes a problem with a single value in a user's config.
//!   The validation layer turns issues into warning/error lines and never
//!   propagates them.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InicheckError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Non-section like syntax before any sections were identified at line {line}. \
         Please use bracketed sections or use # or ; to write comments."
    )]
    ContentBeforeSection { line: usize },

    #[error("Missing closing bracket at line {line}: \"{text}\"")]
    UnterminatedBracket { line: usize, text: String },

    #[error("Value without an item name at line {line}: \"{text}\"")]
    OrphanValue { line: usize, text: String },

    #[error("Section [{section}] is declared more than once (line {line})")]
    DuplicateSection { section: String, line: usize },

    #[error(
        "Missing bracket or commas used in a list instead of spaces under '{name}' in the entry \"{entry}\""
    )]
    UnterminatedList { name: String, entry: String },

    #[error(
        "Master config file missing an equals sign in entry or missing a comma right before \
         the item \"{item}\" in the entry \"{entry}\""
    )]
    MissingEquals { item: String, entry: String },

    #[error(
        "Invalid property '{property}' set in the master config for item '{item}'. \
         If this section is meant to be a recipe, its name must contain a recipe keyword."
    )]
    InvalidProperty { item: String, property: String },

    #[error("Invalid value '{value}' for property '{property}' of item '{item}'")]
    InvalidPropertyValue {
        item: String,
        property: String,
        value: String,
    },

    #[error("Type '{type_name}' of {section}.{item} is undefined and has no checker associated")]
    UnknownType {
        section: String,
        item: String,
        type_name: String,
    },

    #[error("Default for {section}.{item} does not pass its own check: {issue}")]
    InvalidDefault {
        section: String,
        item: String,
        issue: ValueIssue,
    },

    #[error("Cannot pair datetime item {section}.{item}: {reason}")]
    AmbiguousPair {
        section: String,
        item: String,
        reason: String,
    },

    #[error("Invalid trigger '{trigger}' in recipe '{recipe}': {reason}")]
    InvalidTrigger {
        recipe: String,
        trigger: String,
        reason: String,
    },

    #[error("Recipe '{recipe}' edits section '{section}' which is not in the master config")]
    UnknownRecipeSection { recipe: String, section: String },

    #[error(
        "Recipe '{recipe}' requests a default for '{item}' in section '{section}' which is not \
         in the master config (triggered by {situation})"
    )]
    UnknownRecipeItem {
        recipe: String,
        section: String,
        item: String,
        situation: String,
    },

    #[error("Section '{section}' is not in the master config")]
    UnknownSection { section: String },

    #[error("Item '{item}' is not in section '{section}' of the master config")]
    UnknownItem { section: String, item: String },

    #[error("No file was either provided or found when initiating a master config")]
    NoSchemaSource,

    #[error("Changelog {path} is missing the [changes] section")]
    MissingChanges { path: PathBuf },

    #[error("Changelog syntax error on line \"{line}\": {reason}")]
    ChangeSyntax { line: String, reason: String },

    #[error(
        "Changelog states a change that doesn't match the core config. For a change to be \
         valid the new changes must be in the master config file. Mismatches are:{}",
        format_mismatches(.0)
    )]
    InvalidChanges(Vec<String>),

    #[error("Unable to cast {section}.{item}: {issue}")]
    Cast {
        section: String,
        item: String,
        issue: ValueIssue,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] confique::Error),
}

fn format_mismatches(mismatches: &[String]) -> String {
    mismatches.iter().map(|m| format!("\n * {m}")).collect()
}

/// A problem with one value of a user's config.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueIssue {
    #[error("Expected single value received list")]
    ExpectedSingle,

    #[error("Value cannot be None")]
    NoneNotAllowed,

    #[error("Not a valid option")]
    NotAnOption,

    #[error("Expecting {expected} received {received}")]
    WrongType { expected: String, received: String },

    #[error("Expecting integer and received float with non-zero decimal")]
    NonIntegral,

    #[error("Value cannot be None when bounds are declared")]
    NoneWithBounds,

    #[error("Value {value} is less than the minimum of {min}")]
    BelowMin { value: f64, min: f64 },

    #[error("Value {value} is greater than the maximum of {max}")]
    AboveMax { value: f64, max: f64 },

    #[error("File does not exist.")]
    FileMissing,

    #[error("Directory does not exist.")]
    DirectoryMissing,

    #[error("Invalid URL or URL is unreachable: {reason}")]
    UrlUnreachable { reason: String },

    #[error("Date is equal to {other}")]
    DateEqual { other: String },

    #[error("Date occurs after {other}")]
    DateAfter { other: String },

    #[error("Date occurs before {other}")]
    DateBefore { other: String },
}
