//! Recipes and the handles returned when defining them.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::ingredient::Ingredient;
use crate::merge::Step;
use crate::pantry::Pantry;
use crate::random::{Context, RecipeState};

/// A named pipeline of resolved steps plus its private counter and random source.
#[derive(Debug)]
pub struct Recipe {
    name: String,
    default_seed: String,
    pipeline: Vec<Step>,
    state: RefCell<RecipeState>,
}

impl Recipe {
    /// Create a recipe whose state is seeded with `default_seed`.
    #[must_use]
    pub fn new(name: impl Into<String>, pipeline: Vec<Step>, default_seed: impl Into<String>) -> Self {
        let default_seed = default_seed.into();
        Self {
            name: name.into(),
            state: RefCell::new(RecipeState::new(default_seed.clone())),
            default_seed,
            pipeline,
        }
    }

    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seed used when reset without an explicit one.
    #[must_use]
    pub fn default_seed(&self) -> &str {
        &self.default_seed
    }

    /// Number of builds since definition or the last reset.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.state.borrow().counter()
    }

    /// Seed of the current random source.
    #[must_use]
    pub fn seed(&self) -> String {
        self.state.borrow().seed().to_string()
    }

    /// Number of steps in the pipeline.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipeline.len()
    }

    /// Whether the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipeline.is_empty()
    }

    /// Run one build: advance the counter, then fold the pipeline over `initial`.
    ///
    /// A step may start another build of this same recipe; the nested build
    /// takes the next count and continues the same random sequence.
    pub fn generate(&self, initial: Value) -> Result<Value> {
        let mut ctx = Context::begin(&self.state);
        tracing::trace!(recipe = %self.name, count = ctx.count(), "Building");
        self.pipeline
            .iter()
            .try_fold(initial, |acc, step| step.apply(acc, &mut ctx))
    }

    /// Reset the counter and reseed; `None` uses the default seed.
    pub fn reset(&self, seed: Option<&str>) {
        let seed = seed.unwrap_or(&self.default_seed);
        tracing::debug!(recipe = %self.name, seed, "Resetting recipe");
        self.state.borrow_mut().reset(seed);
    }
}

/// Handle to a defined recipe.
///
/// Builds through the handle go through the owning pantry's dispatcher with
/// this recipe first, so extra ingredients layer on top of it. The handle
/// keeps the recipe it was created for even if the name is later redefined.
#[derive(Debug, Clone)]
pub struct RecipeHandle {
    recipe: Rc<Recipe>,
    pantry: Pantry,
}

impl RecipeHandle {
    pub(crate) fn new(recipe: Rc<Recipe>, pantry: Pantry) -> Self {
        Self { recipe, pantry }
    }

    /// Name the recipe was defined under.
    #[must_use]
    pub fn name(&self) -> &str {
        self.recipe.name()
    }

    /// Builds since definition or the last reset.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.recipe.count()
    }

    /// Seed of the current random source.
    #[must_use]
    pub fn seed(&self) -> String {
        self.recipe.seed()
    }

    /// Restart the counter and reseed from the default seed.
    pub fn reset(&self) {
        self.recipe.reset(None);
    }

    /// Restart the counter and reseed from `seed`.
    pub fn reset_with(&self, seed: &str) {
        self.recipe.reset(Some(seed));
    }

    /// Build one object.
    pub fn build(&self) -> Result<Value> {
        self.build_with(Vec::<Ingredient>::new())
    }

    /// Build one object with extra ingredients applied after the recipe.
    pub fn build_with<I, T>(&self, extra: I) -> Result<Value>
    where
        I: IntoIterator<Item = T>,
        T: Into<Ingredient>,
    {
        let steps = self.steps(extra)?;
        self.pantry.cook(&steps)
    }

    /// Build `count` independent objects; zero yields an empty batch.
    pub fn build_many(&self, count: usize) -> Result<Vec<Value>> {
        self.build_many_with(count, Vec::<Ingredient>::new())
    }

    /// Build `count` independent objects with extra ingredients.
    pub fn build_many_with<I, T>(&self, count: usize, extra: I) -> Result<Vec<Value>>
    where
        I: IntoIterator<Item = T>,
        T: Into<Ingredient>,
    {
        let steps = self.steps(extra)?;
        self.pantry.cook_batch(count, &steps)
    }

    /// Run the recipe directly over caller-supplied initial values.
    pub fn build_from(&self, initial: Map<String, Value>) -> Result<Value> {
        self.recipe.generate(Value::Object(initial))
    }

    fn steps<I, T>(&self, extra: I) -> Result<Vec<Step>>
    where
        I: IntoIterator<Item = T>,
        T: Into<Ingredient>,
    {
        let mut steps = vec![Step::Merge(Rc::clone(&self.recipe))];
        steps.extend(self.pantry.prepare(extra.into_iter().map(Into::into).collect())?);
        Ok(steps)
    }
}
