//! Determinism testing utilities.
//!
//! Provides a harness for verifying that recipes produce identical
//! sequences of objects given identical seeds.
//!
//! # Testing Strategy
//!
//! A recipe must be reproducible from its seed alone. Sources of
//! non-determinism include:
//!
//! - **Build history**: counters and random sources advance on every build.
//!   Reset the recipe (or use a fresh pantry) before comparing runs.
//!
//! - **HashMap iteration order**: object keys are stored sorted, and
//!   override entries are evaluated in insertion order.
//!
//! - **System randomness**: generators must draw only from their
//!   [`Context`](pantry_core::Context).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use pantry_core::{Pantry, RecipeHandle, Result};
use serde_json::Value;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of builds per run.
    pub builds: usize,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic recipe).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Recipe is non-deterministic!\n\
                 Runs: {}\n\
                 Builds: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.builds,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Build a sequence from a fresh setup several times and compare hashes.
///
/// # Arguments
///
/// * `runs` - Number of independent runs
/// * `builds` - Number of objects built per run
/// * `setup` - Creates the state for one run
/// * `build` - Builds one object from that state
///
/// # Example
///
/// ```ignore
/// use pantry_test_utils::determinism::verify_determinism;
/// use pantry_test_utils::fixtures::kitchen;
///
/// let result = verify_determinism(
///     5,
///     20,
///     || kitchen(),
///     |pantry| pantry.build(["widget"]),
/// )?;
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Build>(
    runs: usize,
    builds: usize,
    setup: Setup,
    build: Build,
) -> Result<DeterminismResult>
where
    Setup: Fn() -> S,
    Build: Fn(&S) -> Result<Value>,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let state = setup();
        let sequence = (0..builds)
            .map(|_| build(&state))
            .collect::<Result<Vec<_>>>()?;
        hashes.push(hash_sequence(&sequence));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    Ok(DeterminismResult {
        is_deterministic,
        hashes,
        builds,
    })
}

/// Verify that resetting a recipe replays exactly what a fresh pantry builds.
///
/// `setup` must define the recipe called `name` on a new pantry. The first
/// pantry is warmed up with `builds` extra builds before the reset so that
/// stale counters or random state would show up as a mismatch.
pub fn verify_reset_determinism<F>(setup: F, name: &str, seed: &str, builds: usize) -> Result<bool>
where
    F: Fn() -> Pantry,
{
    let warmed = handle(&setup(), name)?;
    warmed.build_many(builds)?;
    warmed.reset_with(seed);
    let replayed = warmed.build_many(builds)?;

    let fresh = handle(&setup(), name)?;
    fresh.reset_with(seed);
    let expected = fresh.build_many(builds)?;

    Ok(replayed == expected)
}

/// Compare two fresh pantries build-by-build, finding the first divergence.
///
/// # Returns
///
/// `None` if the recipe is deterministic, `Some(n)` if the `n`th build
/// (one-based) differs.
pub fn find_first_divergence<F>(setup: F, name: &str, builds: usize) -> Result<Option<usize>>
where
    F: Fn() -> Pantry,
{
    let first = handle(&setup(), name)?;
    let second = handle(&setup(), name)?;

    for n in 1..=builds {
        if first.build()? != second.build()? {
            return Ok(Some(n));
        }
    }

    Ok(None)
}

/// Compute a simple hash for a sequence of built objects.
///
/// Objects are hashed through their canonical JSON rendering, whose keys
/// are always sorted.
#[must_use]
pub fn hash_sequence(values: &[Value]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for value in values {
        value.to_string().hash(&mut hasher);
    }
    hasher.finish()
}

fn handle(pantry: &Pantry, name: &str) -> Result<RecipeHandle> {
    pantry
        .recipe(name)
        .ok_or_else(|| pantry_core::PantryError::UnknownIngredient(name.to_string()))
}

/// Proptest strategies for recipe testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of pantry builds.
pub mod strategies {
    use proptest::prelude::*;
    use serde_json::{Map, Value};

    /// Generate a seed string.
    pub fn arb_seed() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_/-]{0,24}"
    }

    /// Generate a property key.
    pub fn arb_key() -> impl Strategy<Value = String> {
        "[a-z]{1,6}"
    }

    /// Generate a JSON scalar.
    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[ -~]{0,12}".prop_map(Value::from),
        ]
    }

    /// Generate a flat mapping of scalar values.
    pub fn arb_mapping(max_len: usize) -> impl Strategy<Value = Map<String, Value>> {
        proptest::collection::btree_map(arb_key(), arb_scalar(), 0..max_len)
            .prop_map(|entries| entries.into_iter().collect())
    }

    /// Generate a sequence of mappings to fold as overrides.
    pub fn arb_override_sequence(
        max_overrides: usize,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<Map<String, Value>>> {
        proptest::collection::vec(arb_mapping(max_len), 1..max_overrides)
    }

    /// Generate a non-empty integer range `(min, max)` with `min < max`.
    pub fn arb_int_range() -> impl Strategy<Value = (i64, i64)> {
        (-10_000i64..10_000i64, 1i64..5_000i64).prop_map(|(min, width)| (min, min + width))
    }
}
