//! Merge engine.
//!
//! Every ingredient is normalized once, when it is resolved, into a
//! [`Step`]: a function from the accumulated value to the next one. Builds
//! then only fold steps; ingredient kinds are never re-inspected.
//!
//! Merging is always shallow: keys of the newer mapping replace keys of the
//! accumulator, nested values are never combined.

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::builder::build_object;
use crate::error::{PantryError, Result};
use crate::ingredient::{Ingredient, Overrides, ProducerFn, TransformerFn};
use crate::random::Context;
use crate::recipe::Recipe;
use crate::registry::Registry;

/// How a recipe referenced by name is folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitMode {
    /// Inside a recipe pipeline: the trait runs over the accumulator.
    Layer,
    /// At the dispatcher: the recipe builds from `{}` and its result is
    /// merged like a producer's.
    Merge,
}

/// A normalized ingredient.
#[derive(Clone)]
pub enum Step {
    /// Resolve overrides against the context and merge them.
    Build(Overrides),
    /// Run another recipe with the accumulator as its initial values.
    Layer(Rc<Recipe>),
    /// Run another recipe from scratch and merge its result.
    Merge(Rc<Recipe>),
    /// Call a producer and merge its result.
    Produce(ProducerFn),
    /// Hand the accumulator to a transformer.
    Transform(TransformerFn),
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build(overrides) => f.debug_tuple("Build").field(overrides).finish(),
            Self::Layer(recipe) => f.debug_tuple("Layer").field(&recipe.name()).finish(),
            Self::Merge(recipe) => f.debug_tuple("Merge").field(&recipe.name()).finish(),
            Self::Produce(_) => f.write_str("Produce(..)"),
            Self::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

impl Step {
    /// Normalize an ingredient, resolving trait references immediately.
    ///
    /// # Errors
    ///
    /// [`PantryError::UnknownIngredient`] or [`PantryError::NotCallable`]
    /// when a referenced name does not resolve to a recipe.
    pub fn resolve(ingredient: Ingredient, registry: &Registry, mode: TraitMode) -> Result<Self> {
        Ok(match ingredient {
            Ingredient::TraitRef(name) => {
                let recipe = registry.resolve(&name)?;
                match mode {
                    TraitMode::Layer => Self::Layer(recipe),
                    TraitMode::Merge => Self::Merge(recipe),
                }
            }
            Ingredient::Override(overrides) => Self::Build(overrides),
            Ingredient::Producer(f) => Self::Produce(f),
            Ingredient::Transformer(f) => Self::Transform(f),
        })
    }

    /// Apply this step to the accumulated value.
    pub fn apply(&self, acc: Value, ctx: &mut Context<'_>) -> Result<Value> {
        match self {
            Self::Build(overrides) => build_object(acc, overrides, ctx),
            Self::Layer(recipe) => recipe.generate(acc),
            Self::Merge(recipe) => {
                let values = recipe.generate(Value::Object(Map::new()))?;
                merge_produced(acc, values)
            }
            Self::Produce(f) => {
                let values = f(ctx)?;
                merge_produced(acc, values)
            }
            Self::Transform(f) => f(acc, ctx),
        }
    }
}

/// Combine a producer's result with the accumulator.
///
/// A mapping is merged over the accumulator. Anything else replaces it, but
/// only when the accumulator is still an empty mapping.
pub fn merge_produced(acc: Value, values: Value) -> Result<Value> {
    match values {
        Value::Object(map) => merge_mapping(acc, map),
        other if is_empty_mapping(&acc) => Ok(other),
        other => Err(mismatch(&other, &acc)),
    }
}

/// Shallow-merge `map` over the accumulator.
///
/// An empty `map` leaves any accumulator untouched; a non-empty one cannot
/// be merged over a non-mapping accumulator.
pub fn merge_mapping(acc: Value, map: Map<String, Value>) -> Result<Value> {
    match acc {
        Value::Object(mut base) => {
            base.extend(map);
            Ok(Value::Object(base))
        }
        other if map.is_empty() => Ok(other),
        other => Err(mismatch(&Value::Object(map), &other)),
    }
}

/// Whether `value` is a mapping with no keys.
#[must_use]
pub fn is_empty_mapping(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

/// Name of a value's kind, as used in error messages.
#[must_use]
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(found: &Value, acc: &Value) -> PantryError {
    PantryError::MergeTypeMismatch {
        found: kind_of(found).to_string(),
        accumulated: acc.to_string(),
    }
}
