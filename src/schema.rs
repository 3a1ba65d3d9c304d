//! The master schema: every declared item, the recipes and the checker registry.
//!
//! Schemas are assembled with [`MasterSchema::builder()`] from files, inline
//! text and [`SchemaModule`]s. Loading is additive: later sources replace
//! earlier sections and recipes of the same name. Once loaded, the schema is
//! read-only and may be shared by any number of [`UserConfig`](crate::UserConfig)s.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::checkers::{CheckContext, Checker, CheckerRegistry, check_item, find_pair};
use crate::entries::{RecipeSection, SchemaEntry};
use crate::error::InicheckError;
use crate::parse;
use crate::settings::Settings;
use crate::types::RawConfig;

/// Declared items of one section.
pub type SchemaSection = IndexMap<String, SchemaEntry>;

/// A packaged schema: master files plus optional companions.
///
/// Implement this for a tool that ships its schema so callers can load it with
/// [`MasterSchemaBuilder::module`] instead of spelling out paths.
pub trait SchemaModule {
    fn name(&self) -> &str;

    fn master_files(&self) -> Vec<PathBuf>;

    /// Files holding only recipe sections, loaded after the master files.
    fn recipe_files(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Human titles for sections, used when writing configs.
    fn titles(&self) -> IndexMap<String, String> {
        IndexMap::new()
    }

    /// Header text for generated configs.
    fn header(&self) -> Option<String> {
        None
    }

    fn changelogs(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Add the module's custom types.
    fn register_checkers(&self, _registry: &mut CheckerRegistry) {}
}

#[derive(Debug, Clone)]
pub struct MasterSchema {
    /// section -> item -> entry.
    pub cfg: IndexMap<String, SchemaSection>,
    /// In registration order, which is the order they are applied in.
    pub recipes: Vec<RecipeSection>,
    pub titles: IndexMap<String, String>,
    pub header: Option<String>,
    pub changelogs: Vec<PathBuf>,
    /// Files the schema was read from.
    pub paths: Vec<PathBuf>,
    pub checkers: CheckerRegistry,
    pub settings: Settings,
}

impl MasterSchema {
    pub fn builder() -> MasterSchemaBuilder {
        MasterSchemaBuilder::default()
    }

    /// An empty schema with the built-in checkers.
    pub fn empty(settings: Settings) -> Self {
        Self {
            cfg: IndexMap::new(),
            recipes: Vec::new(),
            titles: IndexMap::new(),
            header: None,
            changelogs: Vec::new(),
            paths: Vec::new(),
            checkers: CheckerRegistry::builtin(),
            settings,
        }
    }

    /// Parse a schema from inline text with default settings.
    pub fn parse_str(content: &str) -> Result<Self, InicheckError> {
        Self::builder().text(content).load()
    }

    /// Read more schema files into this one, then re-validate.
    pub fn add_files<P: AsRef<Path>>(&mut self, files: &[P]) -> Result<(), InicheckError> {
        for file in files {
            let file = file.as_ref();
            debug!(path = %file.display(), "Reading master config");
            let raw = parse::read_file(file)?;
            self.read(raw)?;
            self.paths.push(file.to_path_buf());
        }
        self.validate()
    }

    /// Sort raw sections into recipes and item declarations.
    fn read(&mut self, raw: RawConfig) -> Result<(), InicheckError> {
        for (section, items) in raw {
            if self.settings.is_recipe(&section) {
                let recipe = RecipeSection::parse(&section, &items, &self.settings)?;
                self.insert_recipe(recipe);
                continue;
            }

            let mut entries = SchemaSection::new();
            for (item, tokens) in &items {
                entries.insert(item.clone(), SchemaEntry::parse(item, tokens)?);
            }
            self.cfg.insert(section, entries);
        }
        Ok(())
    }

    fn insert_recipe(&mut self, recipe: RecipeSection) {
        match self.recipes.iter_mut().find(|r| r.name == recipe.name) {
            Some(existing) => *existing = recipe,
            None => self.recipes.push(recipe),
        }
    }

    /// Check the invariants that make a schema usable: every type has a
    /// checker, every context-free default passes its own check, and every
    /// ordered datetime has exactly one sibling.
    pub fn validate(&self) -> Result<(), InicheckError> {
        for (section, entries) in &self.cfg {
            for (item, entry) in entries {
                let checker =
                    self.checkers
                        .get(&entry.type_name)
                        .ok_or_else(|| InicheckError::UnknownType {
                            section: section.clone(),
                            item: item.clone(),
                            type_name: entry.type_name.clone(),
                        })?;

                if entry.type_name == "datetimeorderedpair" {
                    find_pair(item, entries.keys().map(String::as_str), &self.settings).map_err(
                        |reason| InicheckError::AmbiguousPair {
                            section: section.clone(),
                            item: item.clone(),
                            reason,
                        },
                    )?;
                }

                if let Some(default) = &entry.default
                    && !checker.needs_context()
                {
                    let ctx = CheckContext {
                        section,
                        item,
                        entry,
                        config_path: None,
                        config: None,
                        settings: &self.settings,
                    };
                    if let Some(issue) = check_item(checker.as_ref(), default, &ctx)
                        .into_iter()
                        .flatten()
                        .next()
                    {
                        return Err(InicheckError::InvalidDefault {
                            section: section.clone(),
                            item: item.clone(),
                            issue,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Fold another schema into this one. Items, recipes and titles of
    /// `other` win over same-named ones here.
    pub fn merge(&mut self, other: &MasterSchema) {
        for (section, entries) in &other.cfg {
            self.cfg
                .entry(section.clone())
                .or_default()
                .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        for recipe in &other.recipes {
            self.insert_recipe(recipe.clone());
        }
        self.checkers.extend(&other.checkers);
        self.titles
            .extend(other.titles.iter().map(|(k, v)| (k.clone(), v.clone())));
        for path in &other.changelogs {
            if !self.changelogs.contains(path) {
                self.changelogs.push(path.clone());
            }
        }
        self.paths.extend(other.paths.iter().cloned());
        if self.header.is_none() {
            self.header.clone_from(&other.header);
        }
    }

    pub fn section(&self, section: &str) -> Option<&SchemaSection> {
        self.cfg.get(section)
    }

    pub fn entry(&self, section: &str, item: &str) -> Option<&SchemaEntry> {
        self.cfg.get(section).and_then(|s| s.get(item))
    }

    pub fn checker_for(&self, entry: &SchemaEntry) -> Option<&Arc<dyn Checker>> {
        self.checkers.get(&entry.type_name)
    }

    pub fn recipe(&self, name: &str) -> Option<&RecipeSection> {
        self.recipes.iter().find(|r| r.name == name)
    }
}

/// Where schema text comes from.
#[derive(Debug, Clone)]
enum Source {
    Path(PathBuf),
    Text(String),
}

/// Builder for [`MasterSchema`].
#[derive(Default)]
pub struct MasterSchemaBuilder {
    sources: Vec<Source>,
    modules: Vec<Box<dyn SchemaModule>>,
    settings: Option<Settings>,
    titles: IndexMap<String, String>,
    header: Option<String>,
    changelogs: Vec<PathBuf>,
    checkers: CheckerRegistry,
}

impl MasterSchemaBuilder {
    /// Add a schema file.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::Path(path.into()));
        self
    }

    pub fn paths<P: Into<PathBuf>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.sources
            .extend(paths.into_iter().map(|p| Source::Path(p.into())));
        self
    }

    /// Add inline schema text.
    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.sources.push(Source::Text(content.into()));
        self
    }

    /// Add a packaged schema. Its files load after explicit paths.
    pub fn module(mut self, module: impl SchemaModule + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Override the default [`Settings`].
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn title(mut self, section: &str, title: &str) -> Self {
        self.titles.insert(section.to_lowercase(), title.to_string());
        self
    }

    pub fn header(mut self, header: &str) -> Self {
        self.header = Some(header.to_string());
        self
    }

    pub fn changelog(mut self, path: impl Into<PathBuf>) -> Self {
        self.changelogs.push(path.into());
        self
    }

    /// Register a custom type.
    pub fn checker(mut self, name: &str, checker: impl Checker + 'static) -> Self {
        self.checkers.register(name, checker);
        self
    }

    pub fn load(self) -> Result<MasterSchema, InicheckError> {
        if self.sources.is_empty() && self.modules.is_empty() {
            return Err(InicheckError::NoSchemaSource);
        }

        let settings = match self.settings {
            Some(settings) => settings,
            None => Settings::defaults()?,
        };
        let mut schema = MasterSchema::empty(settings);
        schema.checkers.extend(&self.checkers);

        let mut sources = self.sources;
        for module in &self.modules {
            debug!(module = module.name(), "Loading schema module");
            sources.extend(module.master_files().into_iter().map(Source::Path));
            sources.extend(module.recipe_files().into_iter().map(Source::Path));
            for (section, title) in module.titles() {
                schema.titles.entry(section).or_insert(title);
            }
            if schema.header.is_none() {
                schema.header = module.header();
            }
            schema.changelogs.extend(module.changelogs());
            module.register_checkers(&mut schema.checkers);
        }
        if sources.is_empty() {
            return Err(InicheckError::NoSchemaSource);
        }

        // Explicit builder values win over module ones.
        schema.titles.extend(self.titles);
        if self.header.is_some() {
            schema.header = self.header;
        }
        schema.changelogs.extend(self.changelogs);

        for source in sources {
            match source {
                Source::Path(path) => {
                    debug!(path = %path.display(), "Reading master config");
                    let raw = parse::read_file(&path)?;
                    schema.read(raw)?;
                    schema.paths.push(path);
                }
                Source::Text(text) => schema.read(parse::parse_str(&text)?)?,
            }
        }

        schema.validate()?;
        debug!(
            sections = schema.cfg.len(),
            recipes = schema.recipes.len(),
            "Master config loaded"
        );
        Ok(schema)
    }
}
