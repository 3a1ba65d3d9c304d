//! Trace hooks for the recipe engine.
//!
//! [`resolve`](crate::resolve) reports what it evaluates and changes through a
//! [`RecipeObserver`]. Every method has a no-op default, so an observer only
//! implements the events it cares about.

use crate::entries::{Condition, Edit};
use crate::types::Situation;

pub trait RecipeObserver {
    /// A trigger condition was matched against the config.
    fn condition_evaluated(
        &mut self,
        _recipe: &str,
        _trigger: &str,
        _condition: &Condition,
        _situations: &[Situation],
    ) {
    }

    /// Every condition of a trigger matched.
    fn trigger_fired(&mut self, _recipe: &str, _trigger: &str, _situations: &[Situation]) {}

    /// An edit was applied to `section` for `situation`.
    fn edit_applied(&mut self, _recipe: &str, _section: &str, _edit: &Edit, _situation: &Situation) {
    }
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RecipeObserver for NoopObserver {}

/// Forwards events to `tracing` at debug/trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RecipeObserver for TracingObserver {
    fn condition_evaluated(
        &mut self,
        recipe: &str,
        trigger: &str,
        condition: &Condition,
        situations: &[Situation],
    ) {
        tracing::trace!(
            recipe,
            trigger,
            condition = %condition,
            matches = situations.len(),
            "Evaluated condition"
        );
    }

    fn trigger_fired(&mut self, recipe: &str, trigger: &str, situations: &[Situation]) {
        tracing::debug!(recipe, trigger, situations = situations.len(), "Trigger fired");
    }

    fn edit_applied(&mut self, recipe: &str, section: &str, edit: &Edit, situation: &Situation) {
        tracing::debug!(recipe, section, edit = %edit, situation = %situation, "Applied edit");
    }
}

/// One captured engine event.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Condition {
        recipe: String,
        trigger: String,
        matches: usize,
    },
    Fired {
        recipe: String,
        trigger: String,
    },
    Edit {
        recipe: String,
        section: String,
        edit: String,
    },
}

/// Captures events for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    pub events: Vec<Event>,
}

#[cfg(test)]
impl RecordingObserver {
    pub fn fired(&self) -> Vec<(&str, &str)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Fired { recipe, trigger } => Some((recipe.as_str(), trigger.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<(&str, &str)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Edit { section, edit, .. } => Some((section.as_str(), edit.as_str())),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl RecipeObserver for RecordingObserver {
    fn condition_evaluated(
        &mut self,
        recipe: &str,
        trigger: &str,
        _condition: &Condition,
        situations: &[Situation],
    ) {
        self.events.push(Event::Condition {
            recipe: recipe.into(),
            trigger: trigger.into(),
            matches: situations.len(),
        });
    }

    fn trigger_fired(&mut self, recipe: &str, trigger: &str, _situations: &[Situation]) {
        self.events.push(Event::Fired {
            recipe: recipe.into(),
            trigger: trigger.into(),
        });
    }

    fn edit_applied(&mut self, recipe: &str, section: &str, edit: &Edit, _situation: &Situation) {
        self.events.push(Event::Edit {
            recipe: recipe.into(),
            section: section.into(),
            edit: edit.to_string(),
        });
    }
}
