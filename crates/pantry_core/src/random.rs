//! Seeded randomness and the per-build context.
//!
//! Every recipe owns a [`RecipeState`]: a build counter and a
//! [`RandomSource`] derived from a seed string (the recipe name unless
//! reset with another seed). Each build advances the counter and hands
//! producers a [`Context`] that draws from that state.
//!
//! The generator is ChaCha8 keyed from a 64-bit FNV-1a digest of the seed,
//! so a seed string yields the same sequence on every platform and run.

use std::cell::RefCell;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{PantryError, Result};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Fold a seed string into the 64-bit key used to seed the generator.
#[must_use]
pub fn seed_digest(seed: &str) -> u64 {
    seed.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Deterministic pseudo-random source created from a seed string.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: String,
    rng: ChaCha8Rng,
}

impl RandomSource {
    /// Create a source deterministically derived from `seed`.
    #[must_use]
    pub fn seed(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        let rng = ChaCha8Rng::seed_from_u64(seed_digest(&seed));
        Self { seed, rng }
    }

    /// The seed string this source was created from.
    #[must_use]
    pub fn seed_str(&self) -> &str {
        &self.seed
    }

    /// Uniform float in `[0, 1)`.
    pub fn random(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Uniform integer in `[min, max)`.
    ///
    /// The float is scaled then floored, never rounded, so every integer in
    /// the range is equally likely. An empty range (`min >= max`) is an
    /// error and does not consume any randomness.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn random_int(&mut self, min: i64, max: i64) -> Result<i64> {
        if min >= max {
            return Err(PantryError::InvalidRange { min, max });
        }
        // Offsets stay unsigned so ranges wider than `i64::MAX` keep both halves.
        let width = max.abs_diff(min);
        let offset = ((self.random() * width as f64) as u64).min(width - 1);
        Ok(min.wrapping_add_unsigned(offset))
    }

    /// Single-bound form of [`random_int`](Self::random_int): `[0, max)`.
    pub fn random_below(&mut self, max: i64) -> Result<i64> {
        self.random_int(0, max)
    }

    /// `true` with probability of about one half.
    pub fn flip_coin(&mut self) -> bool {
        self.random() > 0.5
    }
}

/// Mutable state private to one recipe.
#[derive(Debug, Clone)]
pub struct RecipeState {
    counter: u64,
    source: RandomSource,
}

impl RecipeState {
    /// Fresh state: counter at zero, source seeded from `seed`.
    #[must_use]
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            counter: 0,
            source: RandomSource::seed(seed),
        }
    }

    /// Restart the counter and reseed the source.
    ///
    /// Builds after a reset reproduce the sequence of a freshly created
    /// state with the same seed.
    pub fn reset(&mut self, seed: impl Into<String>) {
        *self = Self::new(seed);
    }

    /// Number of builds since creation or the last reset.
    #[must_use]
    pub const fn counter(&self) -> u64 {
        self.counter
    }

    /// Seed the current source was created from.
    #[must_use]
    pub fn seed(&self) -> &str {
        self.source.seed_str()
    }

    /// Count one more build and return its one-based index.
    pub fn advance(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// The random source builds draw from.
    pub fn source_mut(&mut self) -> &mut RandomSource {
        &mut self.source
    }
}

/// Per-build bundle of the counter and seeded helpers.
///
/// Producers and lazy override values receive this explicitly. The count is
/// fixed when the build starts; every draw borrows the owning state only for
/// that draw, so a build that starts another build of the same recipe (or
/// calls back into the dispatcher) shares its counter and random source.
#[derive(Debug)]
pub struct Context<'a> {
    count: u64,
    state: &'a RefCell<RecipeState>,
}

impl<'a> Context<'a> {
    /// Advance the counter of `state` and open the context for that build.
    pub fn begin(state: &'a RefCell<RecipeState>) -> Self {
        let count = state.borrow_mut().advance();
        Self { count, state }
    }

    fn draw<T>(&self, f: impl FnOnce(&mut RandomSource) -> T) -> T {
        f(self.state.borrow_mut().source_mut())
    }

    /// One-based index of the current build for this recipe.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Uniform float in `[0, 1)`.
    pub fn random(&self) -> f64 {
        self.draw(RandomSource::random)
    }

    /// Uniform integer in `[min, max)`; see [`RandomSource::random_int`].
    pub fn random_int(&self, min: i64, max: i64) -> Result<i64> {
        self.draw(|source| source.random_int(min, max))
    }

    /// Uniform integer in `[0, max)`.
    pub fn random_below(&self, max: i64) -> Result<i64> {
        self.draw(|source| source.random_below(max))
    }

    /// Alias of [`random_int`](Self::random_int) that reads better in dice-like recipes.
    pub fn roll_die(&self, min: i64, max: i64) -> Result<i64> {
        self.random_int(min, max)
    }

    /// Single-bound form of [`roll_die`](Self::roll_die): `[0, max)`.
    pub fn roll_below(&self, max: i64) -> Result<i64> {
        self.random_below(max)
    }

    /// `true` with probability of about one half.
    pub fn flip_coin(&self) -> bool {
        self.draw(RandomSource::flip_coin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_digest_is_stable() {
        assert_eq!(seed_digest(""), FNV_OFFSET_BASIS);
        assert_eq!(seed_digest("widget"), seed_digest("widget"));
        assert_ne!(seed_digest("widget"), seed_digest("gadget"));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomSource::seed("widget");
        let mut b = RandomSource::seed("widget");

        let first: Vec<f64> = (0..16).map(|_| a.random()).collect();
        let second: Vec<f64> = (0..16).map(|_| b.random()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = RandomSource::seed("widget");
        let mut b = RandomSource::seed("gadget");

        let first: Vec<f64> = (0..8).map(|_| a.random()).collect();
        let second: Vec<f64> = (0..8).map(|_| b.random()).collect();
        assert_ne!(first, second);
    }

    #[test]
    fn test_random_in_unit_interval() {
        let mut source = RandomSource::seed("unit");
        for _ in 0..1000 {
            let value = source.random();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_random_below_excludes_max() {
        let mut source = RandomSource::seed("dice");
        let mut seen = [false; 5];
        for _ in 0..1000 {
            let value = source.random_below(5).unwrap();
            assert!((0..5).contains(&value));
            seen[value as usize] = true;
        }
        assert!(seen.iter().all(|s| *s), "every value in [0, 5) should appear");
    }

    #[test]
    fn test_random_int_negative_range() {
        let mut source = RandomSource::seed("negative");
        for _ in 0..500 {
            let value = source.random_int(-3, 2).unwrap();
            assert!((-3..2).contains(&value));
        }
    }

    #[test]
    fn test_empty_range_is_error_and_consumes_nothing() {
        let mut source = RandomSource::seed("empty");
        let mut control = RandomSource::seed("empty");

        assert_eq!(
            source.random_int(2, 2),
            Err(PantryError::InvalidRange { min: 2, max: 2 })
        );
        assert_eq!(
            source.random_int(5, 1),
            Err(PantryError::InvalidRange { min: 5, max: 1 })
        );
        assert_eq!(source.random(), control.random());
    }

    #[test]
    fn test_single_value_range() {
        let mut source = RandomSource::seed("single");
        for _ in 0..50 {
            assert_eq!(source.random_int(7, 8).unwrap(), 7);
        }
    }

    #[test]
    fn test_flip_coin_is_roughly_fair() {
        let mut source = RandomSource::seed("coin");
        let heads = (0..2000).filter(|_| source.flip_coin()).count();
        assert!((800..1200).contains(&heads), "heads = {heads}");
    }

    #[test]
    fn test_full_width_range_reaches_both_halves() {
        let mut source = RandomSource::seed("wide");
        let draws: Vec<i64> = (0..1000)
            .map(|_| source.random_int(i64::MIN, i64::MAX).unwrap())
            .collect();

        let non_negative = draws.iter().filter(|v| **v >= 0).count();
        assert!((400..600).contains(&non_negative), "non-negative = {non_negative}");
        assert!(draws.iter().all(|v| *v < i64::MAX));
    }

    #[test]
    fn test_state_counter_and_reset() {
        let state = RefCell::new(RecipeState::new("widget"));
        assert_eq!(state.borrow().counter(), 0);

        let first = {
            let ctx = Context::begin(&state);
            assert_eq!(ctx.count(), 1);
            ctx.random()
        };
        assert_eq!(Context::begin(&state).count(), 2);

        state.borrow_mut().reset("widget");
        assert_eq!(state.borrow().counter(), 0);
        let ctx = Context::begin(&state);
        assert_eq!(ctx.count(), 1);
        assert_eq!(ctx.random(), first);
    }

    #[test]
    fn test_reset_with_other_seed() {
        let state = RefCell::new(RecipeState::new("widget"));
        state.borrow_mut().reset("other");
        assert_eq!(state.borrow().seed(), "other");

        let mut fresh = RandomSource::seed("other");
        assert_eq!(Context::begin(&state).random(), fresh.random());
    }

    #[test]
    fn test_nested_contexts_share_counter_and_source() {
        let state = RefCell::new(RecipeState::new("nested"));
        let mut control = RandomSource::seed("nested");

        let outer = Context::begin(&state);
        assert_eq!(outer.random(), control.random());
        {
            let inner = Context::begin(&state);
            assert_eq!(inner.count(), 2);
            assert_eq!(inner.random(), control.random());
        }
        assert_eq!(outer.count(), 1);
        assert_eq!(outer.random(), control.random());
        assert_eq!(state.borrow().counter(), 2);
    }

    #[test]
    fn test_roll_die_matches_random_int() {
        let a = RefCell::new(RecipeState::new("die"));
        let b = RefCell::new(RecipeState::new("die"));
        let ctx_a = Context::begin(&a);
        let ctx_b = Context::begin(&b);
        for _ in 0..20 {
            assert_eq!(ctx_a.roll_die(1, 7), ctx_b.random_int(1, 7));
            assert_eq!(ctx_a.roll_below(6), ctx_b.random_below(6));
        }
        assert_eq!(
            ctx_a.roll_below(0),
            Err(PantryError::InvalidRange { min: 0, max: 0 })
        );
    }
}
