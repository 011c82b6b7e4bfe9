//! # Pantry Core
//!
//! Deterministic test-fixture builder: plain data objects cooked from
//! named, composable recipes.
//!
//! This crate is a pure, synchronous, in-memory builder:
//! - No persistence
//! - No IO
//! - No schema validation of produced objects
//! - No system randomness (every recipe draws from its own seeded source)
//!
//! ## Crate Structure
//!
//! - [`random`] - Seeded random source, per-recipe state and build context
//! - [`ingredient`] - Trait references, overrides, producers, transformers
//! - [`merge`] - Normalization of ingredients and shallow merge rules
//! - [`builder`] - Resolution of override mappings with lazy values
//! - [`registry`] - Named recipes and staples
//! - [`recipe`] - Recipes and their handles
//! - [`pantry`] - Recipe definition and the invocation dispatcher

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod builder;
pub mod config;
pub mod error;
pub mod ingredient;
pub mod merge;
pub mod pantry;
pub mod random;
pub mod recipe;
pub mod registry;

pub use config::PantryConfig;
pub use error::{PantryError, Result};
pub use ingredient::{Ingredient, Overrides};
pub use pantry::{Arg, Pantry, Serving};
pub use random::Context;
pub use recipe::RecipeHandle;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::PantryConfig;
    pub use crate::error::{PantryError, Result};
    pub use crate::ingredient::{Ingredient, OverrideValue, Overrides};
    pub use crate::pantry::{Arg, Pantry, Serving};
    pub use crate::random::{Context, RandomSource};
    pub use crate::recipe::RecipeHandle;
}
