//! A user's config, tied to the schema it is resolved and checked against.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::checkers::{CheckContext, cast_item};
use crate::entries::{RecipeSection, SchemaEntry};
use crate::error::InicheckError;
use crate::observe::{RecipeObserver, TracingObserver};
use crate::parse;
use crate::resolve;
use crate::schema::MasterSchema;
use crate::types::{CastMode, RawConfig, TypedConfig, Value};

/// Raw and resolved views of one user config.
///
/// `raw_cfg` is what the file said and never changes. `cfg` is rebuilt from it
/// by every [`apply_recipes`](Self::apply_recipes) call.
#[derive(Debug, Clone)]
pub struct UserConfig<'s> {
    /// The file this config was read from. Relative paths resolve against it.
    pub path: Option<PathBuf>,
    pub raw_cfg: RawConfig,
    pub cfg: RawConfig,
    /// Recipes that fired on the last resolution.
    pub recipes: Vec<&'s RecipeSection>,
    pub mcfg: &'s MasterSchema,
}

impl<'s> UserConfig<'s> {
    /// Read a config file. Recipes are not applied yet.
    pub fn from_file(path: &Path, mcfg: &'s MasterSchema) -> Result<Self, InicheckError> {
        debug!(path = %path.display(), "Reading user config");
        let raw = parse::read_file(path)?;
        Ok(Self::from_raw(raw, mcfg).with_path(path))
    }

    pub fn from_raw(raw_cfg: RawConfig, mcfg: &'s MasterSchema) -> Self {
        Self {
            path: None,
            cfg: raw_cfg.clone(),
            raw_cfg,
            recipes: Vec::new(),
            mcfg,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Rebuild `cfg` from `raw_cfg` and run every recipe over it.
    pub fn apply_recipes(&mut self) -> Result<(), InicheckError> {
        self.apply_recipes_with(&mut TracingObserver)
    }

    pub fn apply_recipes_with(
        &mut self,
        observer: &mut dyn RecipeObserver,
    ) -> Result<(), InicheckError> {
        self.recipes.clear();
        let (cfg, recipes) = resolve::apply_recipes(&self.raw_cfg, self.mcfg, observer)?;
        self.cfg = cfg;
        self.recipes = recipes;
        Ok(())
    }

    pub fn recipe_names(&self) -> Vec<&str> {
        self.recipes.iter().map(|r| r.name.as_str()).collect()
    }

    /// The context checkers see for one item of this config.
    pub fn context<'a>(
        &'a self,
        section: &'a str,
        item: &'a str,
        entry: &'a SchemaEntry,
    ) -> CheckContext<'a> {
        CheckContext {
            section,
            item,
            entry,
            config_path: self.path.as_deref(),
            config: Some(&self.cfg),
            settings: &self.mcfg.settings,
        }
    }

    /// Cast every value of `cfg` with its checker.
    ///
    /// Sections and items the schema doesn't declare are kept as strings.
    pub fn cast_all(&self, mode: CastMode) -> Result<TypedConfig, InicheckError> {
        let mut typed = TypedConfig::new();

        for (section, items) in &self.cfg {
            let out = typed.entry(section.clone()).or_default();
            for (item, values) in items {
                let declared = self
                    .mcfg
                    .entry(section, item)
                    .and_then(|entry| self.mcfg.checker_for(entry).map(|c| (entry, c)));
                let Some((entry, checker)) = declared else {
                    out.insert(item.clone(), Value::from_raw(values));
                    continue;
                };

                let ctx = self.context(section, item, entry);
                let value = match cast_item(checker.as_ref(), values, &ctx) {
                    Ok(value) => value,
                    Err(issue) if mode == CastMode::Lenient => {
                        warn!(section = %section, item = %item, %issue, "Keeping uncastable value");
                        Value::from_raw(values)
                    }
                    Err(issue) => {
                        return Err(InicheckError::Cast {
                            section: section.clone(),
                            item: item.clone(),
                            issue,
                        });
                    }
                };
                out.insert(item.clone(), value);
            }
        }

        Ok(typed)
    }
}

/// Read, resolve and cast a user config in one go.
pub fn load_user_config<'s>(
    path: &Path,
    mcfg: &'s MasterSchema,
    mode: CastMode,
) -> Result<(UserConfig<'s>, TypedConfig), InicheckError> {
    let mut ucfg = UserConfig::from_file(path, mcfg)?;
    ucfg.apply_recipes()?;
    let typed = ucfg.cast_all(mode)?;
    Ok((ucfg, typed))
}
