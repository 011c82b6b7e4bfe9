//! The pantry: recipe definition and the invocation dispatcher.
//!
//! A [`Pantry`] owns its registry and a dispatcher-level context. Cloning a
//! pantry yields another handle to the same registry.
//!
//! Pantries are single-threaded (`!Send`): the registry, every recipe's
//! counter and random source are shared mutable state for one test run.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::config::PantryConfig;
use crate::error::{PantryError, Result};
use crate::ingredient::{Ingredient, Overrides};
use crate::merge::{Step, TraitMode};
use crate::random::{Context, RecipeState};
use crate::recipe::{Recipe, RecipeHandle};
use crate::registry::{Entry, Registry};

/// One argument to [`Pantry::call`].
#[derive(Debug, Clone)]
pub enum Arg {
    /// Number of objects to build; only meaningful in first position.
    Count(usize),
    /// An ingredient.
    Ingredient(Ingredient),
}

impl From<usize> for Arg {
    fn from(count: usize) -> Self {
        Self::Count(count)
    }
}

impl From<Ingredient> for Arg {
    fn from(ingredient: Ingredient) -> Self {
        Self::Ingredient(ingredient)
    }
}

impl From<&str> for Arg {
    fn from(name: &str) -> Self {
        Self::Ingredient(name.into())
    }
}

impl From<String> for Arg {
    fn from(name: String) -> Self {
        Self::Ingredient(name.into())
    }
}

impl From<Overrides> for Arg {
    fn from(overrides: Overrides) -> Self {
        Self::Ingredient(overrides.into())
    }
}

impl From<Map<String, Value>> for Arg {
    fn from(map: Map<String, Value>) -> Self {
        Self::Ingredient(map.into())
    }
}

/// Result of [`Pantry::call`].
#[derive(Debug, Clone, PartialEq)]
pub enum Serving {
    /// No count (or a zero count) was given.
    One(Value),
    /// A positive count was given.
    Many(Vec<Value>),
}

impl Serving {
    /// The single object, if this is not a batch.
    #[must_use]
    pub fn into_one(self) -> Option<Value> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(_) => None,
        }
    }

    /// All objects; a single object becomes a batch of one.
    #[must_use]
    pub fn into_many(self) -> Vec<Value> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug)]
struct Shared {
    config: PantryConfig,
    registry: RefCell<Registry>,
    dispatch: RefCell<RecipeState>,
}

/// Registry of recipes plus the public build surface.
///
/// # Example
///
/// ```
/// use pantry_core::prelude::*;
/// use serde_json::json;
///
/// let pantry = Pantry::new();
/// pantry
///     .define_recipe(
///         "widget",
///         [Ingredient::producer(|ctx| Ok(json!({"id": ctx.count(), "price": 10})))],
///     )
///     .unwrap();
/// pantry
///     .define_recipe("free", [Overrides::new().set("price", 0)])
///     .unwrap();
///
/// let widget = pantry.build(["widget", "free"]).unwrap();
/// assert_eq!(widget, json!({"id": 1, "price": 0}));
/// ```
#[derive(Debug, Clone)]
pub struct Pantry {
    shared: Rc<Shared>,
}

impl Default for Pantry {
    fn default() -> Self {
        Self::new()
    }
}

impl Pantry {
    /// Create an empty pantry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PantryConfig::default())
    }

    /// Create an empty pantry.
    #[must_use]
    pub fn with_config(config: PantryConfig) -> Self {
        let dispatch = RecipeState::new(config.dispatcher_seed.clone());
        Self {
            shared: Rc::new(Shared {
                config,
                registry: RefCell::new(Registry::new()),
                dispatch: RefCell::new(dispatch),
            }),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &PantryConfig {
        &self.shared.config
    }

    /// Define a recipe from an ordered list of ingredients.
    ///
    /// Trait references are resolved now, so an unknown name fails here
    /// rather than on the first build.
    ///
    /// # Errors
    ///
    /// [`PantryError::DuplicateRecipe`] if the name is taken and
    /// redefinition is disabled; [`PantryError::UnknownIngredient`] or
    /// [`PantryError::NotCallable`] for a bad trait reference.
    pub fn define_recipe<I, T>(&self, name: impl Into<String>, ingredients: I) -> Result<RecipeHandle>
    where
        I: IntoIterator<Item = T>,
        T: Into<Ingredient>,
    {
        let name = name.into();
        self.check_redefinition(&name)?;

        let pipeline = {
            let registry = self.shared.registry.borrow();
            ingredients
                .into_iter()
                .map(|ingredient| Step::resolve(ingredient.into(), &registry, TraitMode::Layer))
                .collect::<Result<Vec<_>>>()?
        };

        let seed = self.shared.config.recipe_seed(&name);
        tracing::debug!(recipe = %name, steps = pipeline.len(), seed = %seed, "Defined recipe");
        let recipe = Rc::new(Recipe::new(name.clone(), pipeline, seed));
        self.shared
            .registry
            .borrow_mut()
            .insert(name, Entry::Recipe(Rc::clone(&recipe)));

        Ok(RecipeHandle::new(recipe, self.clone()))
    }

    /// Register a plain named value.
    ///
    /// Staples can be read back with [`staple`](Self::staple) but naming one
    /// as an ingredient fails with [`PantryError::NotCallable`].
    pub fn stock(&self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        self.check_redefinition(&name)?;
        tracing::debug!(staple = %name, "Stocked staple");
        self.shared
            .registry
            .borrow_mut()
            .insert(name, Entry::Staple(value.into()));
        Ok(())
    }

    /// Read a staple.
    #[must_use]
    pub fn staple(&self, name: &str) -> Option<Value> {
        self.shared.registry.borrow().staple(name).cloned()
    }

    /// Handle for an already defined recipe.
    #[must_use]
    pub fn recipe(&self, name: &str) -> Option<RecipeHandle> {
        let recipe = self.shared.registry.borrow().resolve(name).ok()?;
        Some(RecipeHandle::new(recipe, self.clone()))
    }

    /// Whether `name` is registered, as a recipe or a staple.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.shared.registry.borrow().contains(name)
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn recipe_names(&self) -> Vec<String> {
        self.shared.registry.borrow().names()
    }

    /// Dispatch a variadic call.
    ///
    /// A leading [`Arg::Count`] asks for a batch; without one (or with a
    /// zero count) a single object is returned. Every named ingredient is
    /// validated before anything is built.
    ///
    /// # Errors
    ///
    /// [`PantryError::UnknownIngredient`] for names that are not registered
    /// (a count anywhere but first is reported the same way),
    /// [`PantryError::NotCallable`] for staples, and any error raised while
    /// folding.
    pub fn call<I, A>(&self, args: I) -> Result<Serving>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let mut args = args.into_iter().map(Into::<Arg>::into).peekable();
        let count = match args.next_if(|arg| matches!(arg, Arg::Count(_))) {
            Some(Arg::Count(count)) => count,
            _ => 0,
        };

        let ingredients = args
            .map(|arg| match arg {
                Arg::Ingredient(ingredient) => ingredient,
                Arg::Count(stray) => Ingredient::TraitRef(stray.to_string()),
            })
            .collect();
        let steps = self.prepare(ingredients)?;
        self.serve(count, &steps)
    }

    /// Build one object from `ingredients`.
    pub fn build<I, T>(&self, ingredients: I) -> Result<Value>
    where
        I: IntoIterator<Item = T>,
        T: Into<Ingredient>,
    {
        let steps = self.prepare(ingredients.into_iter().map(Into::into).collect())?;
        self.cook(&steps)
    }

    /// Build `count` independent objects; zero yields an empty batch.
    pub fn build_many<I, T>(&self, count: usize, ingredients: I) -> Result<Vec<Value>>
    where
        I: IntoIterator<Item = T>,
        T: Into<Ingredient>,
    {
        let steps = self.prepare(ingredients.into_iter().map(Into::into).collect())?;
        self.cook_batch(count, &steps)
    }

    /// Validate and normalize top-level ingredients.
    ///
    /// All names are checked for existence first, then for callability, so
    /// the reported error does not depend on ingredient order within a kind.
    pub(crate) fn prepare(&self, ingredients: Vec<Ingredient>) -> Result<Vec<Step>> {
        let registry = self.shared.registry.borrow();
        let names = || ingredients.iter().filter_map(Ingredient::name);

        if let Some(unknown) = names().find(|name| !registry.contains(name)) {
            return Err(PantryError::UnknownIngredient(unknown.to_string()));
        }
        if let Some(inert) = names().find(|name| {
            registry
                .get(name)
                .is_some_and(|entry| !entry.is_callable())
        }) {
            return Err(PantryError::NotCallable(inert.to_string()));
        }

        ingredients
            .into_iter()
            .map(|ingredient| Step::resolve(ingredient, &registry, TraitMode::Merge))
            .collect()
    }

    fn serve(&self, count: usize, steps: &[Step]) -> Result<Serving> {
        if count == 0 {
            self.cook(steps).map(Serving::One)
        } else {
            self.cook_batch(count, steps).map(Serving::Many)
        }
    }

    pub(crate) fn cook_batch(&self, count: usize, steps: &[Step]) -> Result<Vec<Value>> {
        (0..count).map(|_| self.cook(steps)).collect()
    }

    /// Fold `steps` over a fresh `{}` with the dispatcher context.
    pub(crate) fn cook(&self, steps: &[Step]) -> Result<Value> {
        let mut ctx = Context::begin(&self.shared.dispatch);
        let result = steps
            .iter()
            .try_fold(Value::Object(Map::new()), |acc, step| step.apply(acc, &mut ctx));

        if let Err(error) = &result {
            tracing::debug!(%error, "Build failed");
        }
        result
    }

    fn check_redefinition(&self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Ok(());
        }
        if !self.shared.config.allow_redefinition {
            return Err(PantryError::DuplicateRecipe(name.to_string()));
        }
        tracing::warn!(recipe = %name, "Redefining existing recipe");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widget_pantry() -> Pantry {
        let pantry = Pantry::new();
        pantry
            .define_recipe(
                "widget",
                [Ingredient::producer(|ctx| {
                    Ok(json!({"id": ctx.count(), "name": "widget", "price": 10}))
                })],
            )
            .unwrap();
        pantry
    }

    #[test]
    fn test_single_build_is_not_wrapped() {
        let pantry = widget_pantry();
        let serving = pantry.call(["widget"]).unwrap();
        assert_eq!(
            serving,
            Serving::One(json!({"id": 1, "name": "widget", "price": 10}))
        );
    }

    #[test]
    fn test_count_builds_batch() {
        let pantry = widget_pantry();
        let serving = pantry
            .call([Arg::Count(3), Arg::from("widget")])
            .unwrap();

        let Serving::Many(values) = serving else {
            panic!("expected a batch");
        };
        let ids: Vec<_> = values.iter().map(|v| v["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_zero_count_returns_one() {
        let pantry = widget_pantry();
        let serving = pantry.call([Arg::Count(0), Arg::from("widget")]).unwrap();
        assert!(serving.into_one().is_some());
    }

    #[test]
    fn test_stray_count_is_unknown_ingredient() {
        let pantry = widget_pantry();
        let err = pantry
            .call([Arg::from("widget"), Arg::Count(2)])
            .unwrap_err();
        assert_eq!(err, PantryError::UnknownIngredient("2".to_string()));
    }

    #[test]
    fn test_unknown_name_builds_nothing() {
        let pantry = widget_pantry();
        let err = pantry.build(["widget", "doesNotExist"]).unwrap_err();
        assert_eq!(err, PantryError::UnknownIngredient("doesNotExist".to_string()));

        // Validation failed before the widget recipe ran.
        assert_eq!(pantry.recipe("widget").unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_reported_before_not_callable() {
        let pantry = widget_pantry();
        pantry.stock("colors", json!(["red"])).unwrap();

        let err = pantry.build(["colors", "ghost"]).unwrap_err();
        assert_eq!(err, PantryError::UnknownIngredient("ghost".to_string()));

        let err = pantry.build(["widget", "colors"]).unwrap_err();
        assert_eq!(err, PantryError::NotCallable("colors".to_string()));
    }

    #[test]
    fn test_definition_resolves_traits_eagerly() {
        let pantry = Pantry::new();
        let err = pantry
            .define_recipe("gadget", ["missing"])
            .unwrap_err();
        assert_eq!(err, PantryError::UnknownIngredient("missing".to_string()));
        assert!(!pantry.contains("gadget"));
    }

    #[test]
    fn test_duplicate_definition_rejected_by_default() {
        let pantry = widget_pantry();
        let err = pantry
            .define_recipe("widget", [Overrides::new()])
            .unwrap_err();
        assert_eq!(err, PantryError::DuplicateRecipe("widget".to_string()));
    }

    #[test]
    fn test_redefinition_when_allowed() {
        let pantry = Pantry::with_config(PantryConfig::default().with_redefinition(true));
        let old = pantry
            .define_recipe("thing", [Overrides::new().set("v", 1)])
            .unwrap();
        pantry
            .define_recipe("thing", [Overrides::new().set("v", 2)])
            .unwrap();

        assert_eq!(pantry.build(["thing"]).unwrap(), json!({"v": 2}));
        assert_eq!(old.build().unwrap(), json!({"v": 1}));
    }

    #[test]
    fn test_top_level_override_and_producer() {
        let pantry = widget_pantry();
        let value = pantry
            .build([
                Ingredient::from("widget"),
                Overrides::new().set("price", 0).into(),
                Ingredient::producer(|ctx| Ok(json!({"batch": ctx.count()}))),
            ])
            .unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "name": "widget", "price": 0, "batch": 1})
        );
    }

    #[test]
    fn test_scalar_producer_at_top_level() {
        let pantry = Pantry::new();
        let value = pantry
            .build([Ingredient::producer(|_| Ok(json!(42)))])
            .unwrap();
        assert_eq!(value, json!(42));
    }

    #[test]
    fn test_scalar_recipe_over_object_fails() {
        let pantry = widget_pantry();
        pantry
            .define_recipe("answer", [Ingredient::producer(|_| Ok(json!(42)))])
            .unwrap();

        let err = pantry.build(["widget", "answer"]).unwrap_err();
        assert!(matches!(err, PantryError::MergeTypeMismatch { .. }));
    }

    #[test]
    fn test_generator_may_call_back_into_pantry() {
        let pantry = widget_pantry();
        let inner = pantry.clone();
        let value = pantry
            .build([Ingredient::producer(move |_| {
                Ok(json!({"part": inner.build(["widget"])?}))
            })])
            .unwrap();
        assert_eq!(value["part"]["name"], json!("widget"));
    }

    #[test]
    fn test_recipe_may_build_itself_recursively() {
        let pantry = Pantry::new();
        let inner = pantry.clone();
        pantry
            .define_recipe(
                "node",
                [Ingredient::producer(move |ctx| {
                    let depth = ctx.count();
                    if depth < 3 {
                        Ok(json!({"depth": depth, "child": inner.build(["node"])?}))
                    } else {
                        Ok(json!({"depth": depth}))
                    }
                })],
            )
            .unwrap();

        let tree = pantry.build(["node"]).unwrap();
        assert_eq!(
            tree,
            json!({"depth": 1, "child": {"depth": 2, "child": {"depth": 3}}})
        );
        assert_eq!(pantry.recipe("node").unwrap().count(), 3);
    }

    #[test]
    fn test_dispatcher_counter_advances_per_build() {
        let pantry = Pantry::new();
        let counted = || Overrides::new().lazy("n", |ctx| Ok(json!(ctx.count())));

        let counts: Vec<_> = (0..3)
            .map(|_| pantry.build([counted()]).unwrap()["n"].clone())
            .collect();
        assert_eq!(counts, vec![json!(1), json!(2), json!(3)]);

        let batch = pantry.build_many(2, [counted()]).unwrap();
        assert_eq!(batch, vec![json!({"n": 4}), json!({"n": 5})]);
    }

    #[test]
    fn test_nested_dispatcher_calls_keep_progress() {
        let pantry = Pantry::new();
        let inner = pantry.clone();
        let wrapped = move || {
            let inner = inner.clone();
            Ingredient::producer(move |_| {
                let nested = inner.build([Overrides::new()
                    .lazy("n", |ctx| Ok(json!(ctx.count())))
                    .lazy("r", |ctx| Ok(json!(ctx.random())))])?;
                Ok(json!({"nested": nested}))
            })
        };

        let builds: Vec<Value> = (0..3)
            .map(|_| pantry.build([wrapped()]).unwrap()["nested"].clone())
            .collect();

        let counts: Vec<_> = builds.iter().map(|b| b["n"].clone()).collect();
        assert_eq!(counts, vec![json!(2), json!(4), json!(6)]);
        assert_ne!(builds[0]["r"], builds[1]["r"]);
        assert_ne!(builds[1]["r"], builds[2]["r"]);
    }

    #[test]
    fn test_staples_round_trip() {
        let pantry = Pantry::new();
        pantry.stock("colors", json!(["red", "blue"])).unwrap();
        assert_eq!(pantry.staple("colors"), Some(json!(["red", "blue"])));
        assert!(pantry.recipe("colors").is_none());
        assert_eq!(pantry.recipe_names(), vec!["colors"]);
    }

    #[test]
    fn test_build_many_zero_is_empty() {
        let pantry = widget_pantry();
        assert!(pantry.build_many(0, ["widget"]).unwrap().is_empty());
    }
}
