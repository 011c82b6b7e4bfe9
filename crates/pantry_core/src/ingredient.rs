//! Ingredients: the units folded into a build.
//!
//! An ingredient is one of:
//! - [`Ingredient::TraitRef`] - the name of another registered recipe
//! - [`Ingredient::Override`] - a literal mapping, whose values may be lazy
//! - [`Ingredient::Producer`] - a generator whose result is merged for it
//! - [`Ingredient::Transformer`] - a generator that merges by itself
//!
//! Producer and transformer are separate constructors; nothing inspects a
//! closure's signature to decide how its result is combined.

use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::random::Context;

/// Zero-input generator: its result is merged over the accumulator.
pub type ProducerFn = Rc<dyn Fn(&mut Context<'_>) -> Result<Value>>;

/// Generator receiving the accumulator; its result replaces it unmodified.
pub type TransformerFn = Rc<dyn Fn(Value, &mut Context<'_>) -> Result<Value>>;

/// Lazily evaluated value inside an [`Overrides`] mapping.
pub type LazyFn = Rc<dyn Fn(&mut Context<'_>) -> Result<Value>>;

/// One value of an override mapping.
#[derive(Clone)]
pub enum OverrideValue {
    /// Used as-is.
    Literal(Value),
    /// Evaluated against the build context each time the mapping is applied.
    Lazy(LazyFn),
}

impl fmt::Debug for OverrideValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Ordered key/value overrides applied with shallow merge semantics.
///
/// Entries are kept in insertion order so lazy values draw randomness in a
/// stable order. A key set twice keeps its last value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    entries: Vec<(String, OverrideValue)>,
}

impl Overrides {
    /// Empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to a literal value.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries
            .push((key.into(), OverrideValue::Literal(value.into())));
        self
    }

    /// Set `key` to a value computed from the build context.
    #[must_use]
    pub fn lazy<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<Value> + 'static,
    {
        self.entries
            .push((key.into(), OverrideValue::Lazy(Rc::new(f))));
        self
    }

    /// Number of entries, counting repeated keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OverrideValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<Map<String, Value>> for Overrides {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(k, v)| (k, OverrideValue::Literal(v)))
                .collect(),
        }
    }
}

/// Anything that can be folded into a build.
#[derive(Clone)]
pub enum Ingredient {
    /// Name of a registered recipe or trait.
    TraitRef(String),
    /// Literal overrides.
    Override(Overrides),
    /// Zero-input generator; see [`ProducerFn`].
    Producer(ProducerFn),
    /// Accumulator-consuming generator; see [`TransformerFn`].
    Transformer(TransformerFn),
}

impl Ingredient {
    /// Reference a registered recipe or trait by name.
    #[must_use]
    pub fn trait_ref(name: impl Into<String>) -> Self {
        Self::TraitRef(name.into())
    }

    /// Wrap a producer.
    #[must_use]
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<Value> + 'static,
    {
        Self::Producer(Rc::new(f))
    }

    /// Wrap a transformer.
    #[must_use]
    pub fn transformer<F>(f: F) -> Self
    where
        F: Fn(Value, &mut Context<'_>) -> Result<Value> + 'static,
    {
        Self::Transformer(Rc::new(f))
    }

    /// The referenced name, for trait references.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::TraitRef(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Debug for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TraitRef(name) => f.debug_tuple("TraitRef").field(name).finish(),
            Self::Override(overrides) => f.debug_tuple("Override").field(overrides).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
            Self::Transformer(_) => f.write_str("Transformer(..)"),
        }
    }
}

impl From<&str> for Ingredient {
    fn from(name: &str) -> Self {
        Self::TraitRef(name.to_string())
    }
}

impl From<String> for Ingredient {
    fn from(name: String) -> Self {
        Self::TraitRef(name)
    }
}

impl From<Overrides> for Ingredient {
    fn from(overrides: Overrides) -> Self {
        Self::Override(overrides)
    }
}

impl From<Map<String, Value>> for Ingredient {
    fn from(map: Map<String, Value>) -> Self {
        Self::Override(map.into())
    }
}
