//! Pantry configuration.

use serde::{Deserialize, Serialize};

/// Default seed of the dispatcher-level context.
pub const DEFAULT_DISPATCHER_SEED: &str = "pantry";

/// Configuration for a [`Pantry`](crate::Pantry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PantryConfig {
    /// Prefix for default recipe seeds (`"{namespace}/{name}"`).
    pub seed_namespace: Option<String>,
    /// Whether defining an existing name replaces it instead of failing.
    pub allow_redefinition: bool,
    /// Seed for overrides and generators passed straight to the dispatcher.
    pub dispatcher_seed: String,
}

impl Default for PantryConfig {
    fn default() -> Self {
        Self {
            seed_namespace: None,
            allow_redefinition: false,
            dispatcher_seed: DEFAULT_DISPATCHER_SEED.to_string(),
        }
    }
}

impl PantryConfig {
    /// Set the seed namespace.
    #[must_use]
    pub fn with_seed_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.seed_namespace = Some(namespace.into());
        self
    }

    /// Allow or forbid redefining names.
    #[must_use]
    pub fn with_redefinition(mut self, allow: bool) -> Self {
        self.allow_redefinition = allow;
        self
    }

    /// Set the dispatcher seed.
    #[must_use]
    pub fn with_dispatcher_seed(mut self, seed: impl Into<String>) -> Self {
        self.dispatcher_seed = seed.into();
        self
    }

    /// Default seed for the recipe called `name`.
    #[must_use]
    pub fn recipe_seed(&self, name: &str) -> String {
        match &self.seed_namespace {
            Some(namespace) => format!("{namespace}/{name}"),
            None => name.to_string(),
        }
    }
}
