//! Error types for the pantry.

use thiserror::Error;

/// Result type alias using [`PantryError`].
pub type Result<T> = std::result::Result<T, PantryError>;

/// Top-level error type for recipe definition and builds.
///
/// Every error is fatal to the call that raised it: no partial object is
/// ever returned alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PantryError {
    /// A named ingredient does not resolve to any registered entry.
    #[error("Unknown factory/trait '{0}'")]
    UnknownIngredient(String),

    /// A named ingredient resolves to an entry that cannot generate values.
    #[error("Factory/trait '{0}' not a function")]
    NotCallable(String),

    /// A producer returned a value that cannot be combined with the accumulator.
    #[error("Unable to combine '{found}' with input '{accumulated}'")]
    MergeTypeMismatch {
        /// Kind of the value that was produced.
        found: String,
        /// The accumulated value, rendered as JSON.
        accumulated: String,
    },

    /// `random_int` was asked for an empty integer range.
    #[error("Empty random range: [{min}, {max})")]
    InvalidRange {
        /// Lower bound after rounding up.
        min: i64,
        /// Upper bound after rounding down.
        max: i64,
    },

    /// A recipe with this name is already registered.
    #[error("Factory/trait '{0}' is already defined")]
    DuplicateRecipe(String),
}
