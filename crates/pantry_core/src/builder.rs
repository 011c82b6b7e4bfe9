//! Object builder for override mappings.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::ingredient::{OverrideValue, Overrides};
use crate::merge::merge_mapping;
use crate::random::Context;

/// Evaluate every lazy entry of `overrides` against `ctx`.
///
/// Lazy entries run in insertion order; literal entries are cloned as-is.
pub fn resolve_overrides(overrides: &Overrides, ctx: &mut Context<'_>) -> Result<Map<String, Value>> {
    let mut resolved = Map::new();
    for (key, value) in overrides.iter() {
        let value = match value {
            OverrideValue::Literal(value) => value.clone(),
            OverrideValue::Lazy(f) => f(ctx)?,
        };
        resolved.insert(key.to_string(), value);
    }
    Ok(resolved)
}

/// Resolve `overrides` and shallow-merge the result over `initial`.
pub fn build_object(initial: Value, overrides: &Overrides, ctx: &mut Context<'_>) -> Result<Value> {
    let resolved = resolve_overrides(overrides, ctx)?;
    merge_mapping(initial, resolved)
}
