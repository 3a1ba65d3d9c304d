//! Recipe resolution: match triggers against a config and apply recipe edits.
//!
//! One pass walks the recipes in registration order, and each recipe's
//! triggers in declaration order. A trigger fires when every one of its
//! conditions matches at least one [`Situation`] in the *current* working
//! config, so edits made by earlier recipes are visible to later ones. When a
//! trigger fires, the recipe's edits are applied once per situation collected
//! while matching, with wildcards bound to that situation.
//!
//! Only sections and items declared in the schema take part in matching.

use tracing::debug;

use crate::entries::{AdjValue, Edit, RecipeSection, TriggerEntry};
use crate::error::InicheckError;
use crate::observe::RecipeObserver;
use crate::schema::MasterSchema;
use crate::types::{RawConfig, Situation};

/// Resolve `raw` against every recipe of `schema`.
///
/// Returns the resolved config and the recipes that fired, in order. `raw` is
/// never modified, so calling this twice on the same input gives the same
/// result.
pub fn apply_recipes<'s>(
    raw: &RawConfig,
    schema: &'s MasterSchema,
    observer: &mut dyn RecipeObserver,
) -> Result<(RawConfig, Vec<&'s RecipeSection>), InicheckError> {
    let mut cfg = raw.clone();
    let mut applied = Vec::new();

    for recipe in &schema.recipes {
        let mut fired = false;

        for (trigger_name, trigger) in &recipe.triggers {
            let Some(situations) = evaluate(&cfg, schema, recipe, trigger_name, trigger, observer)
            else {
                continue;
            };
            observer.trigger_fired(&recipe.name, trigger_name, &situations);

            for situation in &situations {
                cfg = apply_recipe(&cfg, recipe, situation, schema, observer)?;
            }
            fired = true;
        }

        if fired {
            debug!(recipe = %recipe.name, "Applied recipe");
            applied.push(recipe);
        }
    }

    Ok((cfg, applied))
}

/// Every situation the config offers for matching. Sections with no
/// declared items present contribute a section-only situation; items without
/// values an item-only one.
pub fn situations(cfg: &RawConfig, schema: &MasterSchema) -> Vec<Situation> {
    let mut found = Vec::new();

    for (section, items) in cfg {
        let Some(declared) = schema.section(section) else {
            continue;
        };
        let before = found.len();

        for (item, values) in items {
            if !declared.contains_key(item) {
                continue;
            }
            if values.is_empty() {
                found.push(Situation::new(section, Some(item), None));
            }
            for value in values {
                found.push(Situation::new(section, Some(item), Some(value)));
            }
        }

        if found.len() == before {
            found.push(Situation::new(section, None, None));
        }
    }

    found
}

/// Match a trigger. `Some` holds the de-duplicated situations of all its
/// conditions when every condition matched; an empty trigger never fires.
fn evaluate(
    cfg: &RawConfig,
    schema: &MasterSchema,
    recipe: &RecipeSection,
    trigger_name: &str,
    trigger: &TriggerEntry,
    observer: &mut dyn RecipeObserver,
) -> Option<Vec<Situation>> {
    if trigger.conditions.is_empty() {
        return None;
    }

    let available = situations(cfg, schema);
    let mut collected: Vec<Situation> = Vec::new();

    for condition in &trigger.conditions {
        let matched: Vec<Situation> = available
            .iter()
            .filter(|s| condition.matches(s))
            .cloned()
            .collect();
        observer.condition_evaluated(&recipe.name, trigger_name, condition, &matched);

        if matched.is_empty() {
            return None;
        }
        for situation in matched {
            if !collected.contains(&situation) {
                collected.push(situation);
            }
        }
    }

    Some(collected)
}

/// Apply one recipe's edits for one situation, returning the updated copy.
pub fn apply_recipe(
    cfg: &RawConfig,
    recipe: &RecipeSection,
    situation: &Situation,
    schema: &MasterSchema,
    observer: &mut dyn RecipeObserver,
) -> Result<RawConfig, InicheckError> {
    let mut result = cfg.clone();

    for (target, edits) in &recipe.adj_config {
        let section = target
            .resolve(Some(situation.section.as_str()))
            .unwrap_or(situation.section.as_str())
            .to_string();
        if schema.section(&section).is_none() {
            return Err(InicheckError::UnknownRecipeSection {
                recipe: recipe.name.clone(),
                section,
            });
        }

        for edit in edits {
            apply_edit(&mut result, &section, edit, situation, recipe, schema)?;
            observer.edit_applied(&recipe.name, &section, edit, situation);
        }
    }

    Ok(result)
}

fn apply_edit(
    cfg: &mut RawConfig,
    section: &str,
    edit: &Edit,
    situation: &Situation,
    recipe: &RecipeSection,
    schema: &MasterSchema,
) -> Result<(), InicheckError> {
    let default_of = |item: &str| {
        schema
            .entry(section, item)
            .map(|e| e.default_values())
            .ok_or_else(|| InicheckError::UnknownRecipeItem {
                recipe: recipe.name.clone(),
                section: section.to_string(),
                item: item.to_string(),
                situation: situation.to_string(),
            })
    };

    match edit {
        Edit::ApplyDefaults => {
            let target = cfg.entry(section.to_string()).or_default();
            for (item, entry) in schema.section(section).into_iter().flatten() {
                target
                    .entry(item.clone())
                    .or_insert_with(|| entry.default_values());
            }
        }
        Edit::RemoveSection => {
            cfg.shift_remove(section);
        }
        Edit::RemoveItem(slot) => {
            if let Some(item) = slot.resolve(situation.item.as_deref())
                && let Some(target) = cfg.get_mut(section)
            {
                target.shift_remove(item);
            }
        }
        Edit::DefaultItem(slot) => {
            if let Some(item) = slot.resolve(situation.item.as_deref()) {
                let default = default_of(item)?;
                cfg.entry(section.to_string())
                    .or_default()
                    .entry(item.to_string())
                    .or_insert(default);
            }
        }
        Edit::Set { item, value } => {
            let Some(item) = item.resolve(situation.item.as_deref()) else {
                return Ok(());
            };
            match value {
                AdjValue::Any => {
                    let bound = situation.value.iter().cloned().collect();
                    cfg.entry(section.to_string())
                        .or_default()
                        .insert(item.to_string(), bound);
                }
                AdjValue::Default => {
                    let default = default_of(item)?;
                    cfg.entry(section.to_string())
                        .or_default()
                        .entry(item.to_string())
                        .or_insert(default);
                }
                AdjValue::Literal(values) => {
                    cfg.entry(section.to_string())
                        .or_default()
                        .insert(item.to_string(), values.clone());
                }
            }
        }
    }

    Ok(())
}
