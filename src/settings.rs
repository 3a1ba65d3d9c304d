//! Engine settings: the keywords that drive recipe and pair detection, and the
//! URL probe timeout.
//!
//! Settings come from compiled defaults, an optional TOML file and
//! `INICHECK_*` environment variables, layered by confique.

use std::path::Path;

use confique::Config;
use serde::Serialize;

use crate::error::InicheckError;

#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Words that mark an item of a recipe section as a trigger.
    #[config(
        env = "INICHECK_TRIGGER_KEYWORDS",
        parse_env = confique::env::parse::list_by_comma,
        default = ["trigger", "triggers", "condition"]
    )]
    pub trigger_keywords: Vec<String>,

    /// Words that mark a master config section as a recipe.
    #[config(
        env = "INICHECK_RECIPE_KEYWORDS",
        parse_env = confique::env::parse::list_by_comma,
        default = ["recipe"]
    )]
    pub recipe_keywords: Vec<String>,

    /// Words that mark the first item of an ordered datetime pair.
    #[config(
        env = "INICHECK_PAIR_START_KEYWORDS",
        parse_env = confique::env::parse::list_by_comma,
        default = ["start", "begin"]
    )]
    pub pair_start_keywords: Vec<String>,

    /// Words that mark the second item of an ordered datetime pair.
    #[config(
        env = "INICHECK_PAIR_END_KEYWORDS",
        parse_env = confique::env::parse::list_by_comma,
        default = ["stop", "end"]
    )]
    pub pair_end_keywords: Vec<String>,

    /// Seconds to wait for a URL before reporting it unreachable.
    #[config(env = "INICHECK_URL_TIMEOUT", default = 3)]
    pub url_timeout_secs: u64,
}

impl Settings {
    /// Compiled defaults with environment overrides.
    pub fn defaults() -> Result<Self, InicheckError> {
        Ok(Self::builder().env().load()?)
    }

    /// Defaults, overridden by `path` (if it exists), overridden by the environment.
    pub fn load_from(path: &Path) -> Result<Self, InicheckError> {
        Ok(Self::builder().env().file(path).load()?)
    }

    /// A commented TOML template of every setting.
    pub fn template() -> String {
        confique::toml::template::<Self>(confique::toml::FormatOptions::default())
    }

    pub fn is_trigger(&self, item: &str) -> bool {
        contains_any(item, &self.trigger_keywords)
    }

    pub fn is_recipe(&self, section: &str) -> bool {
        contains_any(section, &self.recipe_keywords)
    }
}

fn contains_any(name: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|kw| name.contains(kw.as_str()))
}
