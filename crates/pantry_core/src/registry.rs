//! Registry of named recipes and staples.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{PantryError, Result};
use crate::recipe::Recipe;

/// A registered name.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A recipe, usable as an ingredient.
    Recipe(Rc<Recipe>),
    /// A plain value. It can be read back but never folded into a build.
    Staple(Value),
}

impl Entry {
    /// Whether this entry can generate values.
    #[must_use]
    pub const fn is_callable(&self) -> bool {
        matches!(self, Self::Recipe(_))
    }
}

/// Name to entry mapping owned by one pantry.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning whatever was previously registered under `name`.
    pub fn insert(&mut self, name: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(name.into(), entry)
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolve `name` to a recipe.
    ///
    /// # Errors
    ///
    /// [`PantryError::UnknownIngredient`] if nothing is registered under
    /// `name`, [`PantryError::NotCallable`] if it is a staple.
    pub fn resolve(&self, name: &str) -> Result<Rc<Recipe>> {
        match self.entries.get(name) {
            Some(Entry::Recipe(recipe)) => Ok(Rc::clone(recipe)),
            Some(Entry::Staple(_)) => Err(PantryError::NotCallable(name.to_string())),
            None => Err(PantryError::UnknownIngredient(name.to_string())),
        }
    }

    /// Read a staple value.
    #[must_use]
    pub fn staple(&self, name: &str) -> Option<&Value> {
        match self.entries.get(name) {
            Some(Entry::Staple(value)) => Some(value),
            _ => None,
        }
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
