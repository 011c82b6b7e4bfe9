//! Test fixtures and helpers.
//!
//! A pre-stocked pantry with a small recipe book used across test suites.

use pantry_core::{Ingredient, Overrides, Pantry, PantryConfig, Result};
use serde_json::{json, Map, Value};

/// Names of the recipes defined by [`kitchen`], in definition order.
pub const KITCHEN_RECIPES: [&str; 6] = ["widget", "discounted", "free", "gadget", "order", "answer"];

/// Create a pantry stocked with the sample recipe book.
///
/// - `widget`: `id` from the build count, random `price` in `[5, 50)` and
///   a coin-flip `in_stock`
/// - `discounted`: trait halving an existing `price`
/// - `free`: trait forcing `price` to zero
/// - `gadget`: `widget` then `discounted`, plus a lazy `sku`
/// - `order`: a die-rolled `quantity` and a lazily numbered `reference`
/// - `answer`: a scalar producer returning `42`
#[must_use]
pub fn kitchen() -> Pantry {
    kitchen_with(PantryConfig::default())
}

/// Like [`kitchen`] with an explicit configuration.
///
/// # Panics
///
/// Panics if the recipe book fails to define, which would be a bug in
/// this fixture.
#[must_use]
pub fn kitchen_with(config: PantryConfig) -> Pantry {
    let pantry = Pantry::with_config(config);
    stock_recipe_book(&pantry).expect("sample recipe book should define");
    pantry
}

fn stock_recipe_book(pantry: &Pantry) -> Result<()> {
    pantry.define_recipe(
        "widget",
        [Ingredient::producer(|ctx| {
            Ok(json!({
                "id": ctx.count(),
                "name": "widget",
                "price": ctx.random_int(5, 50)?,
                "in_stock": ctx.flip_coin(),
            }))
        })],
    )?;

    pantry.define_recipe("discounted", [Ingredient::transformer(|acc, _| halve_price(acc))])?;

    pantry.define_recipe("free", [Overrides::new().set("price", 0)])?;

    pantry.define_recipe(
        "gadget",
        [
            Ingredient::from("widget"),
            Ingredient::from("discounted"),
            Overrides::new()
                .set("name", "gadget")
                .lazy("sku", |ctx| Ok(json!(format!("G-{:04}", ctx.count()))))
                .into(),
        ],
    )?;

    pantry.define_recipe(
        "order",
        [Overrides::new()
            .lazy("reference", |ctx| Ok(json!(format!("ORD-{}", ctx.count()))))
            .lazy("quantity", |ctx| Ok(json!(ctx.roll_die(1, 7)?)))],
    )?;

    pantry.define_recipe("answer", [Ingredient::producer(|_| Ok(json!(42)))])?;

    Ok(())
}

fn halve_price(acc: Value) -> Result<Value> {
    let mut map = match acc {
        Value::Object(map) => map,
        other => return Ok(other),
    };
    if let Some(price) = map.get("price").and_then(Value::as_i64) {
        map.insert("price".to_string(), json!(price / 2));
    }
    Ok(Value::Object(map))
}

/// Build a mapping from a `json!` object literal.
///
/// # Panics
///
/// Panics if `value` is not an object.
#[must_use]
pub fn mapping(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
