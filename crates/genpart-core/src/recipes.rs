//! Generation recipes
//!
//! A recipe is the base instruction set for one kind of section. Placeholders
//! name a recipe through `recipeId`; otherwise the section kind of the
//! resolution context picks one, and `default` covers the rest.

use std::collections::HashMap;
use tracing::debug;

/// Key of the fallback recipe
pub const DEFAULT_RECIPE: &str = "default";

/// Base instructions for one section kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// Registry key
    pub key: String,
    /// Human title
    pub title: String,
    /// Base instructions
    pub instructions: String,
    /// Output format override
    pub output_format: Option<String>,
}

impl Recipe {
    /// Create recipe
    #[inline]
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            instructions: instructions.into(),
            output_format: None,
        }
    }

    /// With output format override
    #[inline]
    #[must_use]
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }
}

/// Registry of recipes by key
#[derive(Debug, Clone)]
pub struct RecipeRegistry {
    recipes: HashMap<String, Recipe>,
}

impl Default for RecipeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for recipe in builtin_recipes() {
            registry.register(recipe);
        }
        registry
    }
}

impl RecipeRegistry {
    /// Registry with the built-in recipes
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry without recipes
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            recipes: HashMap::new(),
        }
    }

    /// Add or replace a recipe
    pub fn register(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.key.clone(), recipe);
    }

    /// Recipe by exact key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Recipe> {
        self.recipes.get(key)
    }

    /// Pick the recipe for a placeholder
    ///
    /// Order: explicit recipe id, section kind, `default`. Returns `None`
    /// only when the registry has no `default` entry.
    #[must_use]
    pub fn resolve(&self, recipe_id: Option<&str>, section_kind: Option<&str>) -> Option<&Recipe> {
        let by_id = recipe_id.and_then(|id| self.get(id));
        let by_kind = || {
            section_kind
                .map(canonical_kind)
                .and_then(|kind| self.get(kind))
        };
        let recipe = by_id.or_else(by_kind).or_else(|| self.get(DEFAULT_RECIPE));
        if let Some(recipe) = recipe {
            debug!(recipe = %recipe.key, ?recipe_id, ?section_kind, "Resolved recipe");
        }
        recipe
    }
}

fn canonical_kind(kind: &str) -> &str {
    match kind.trim() {
        "conclusion" => "conclusions",
        other => other,
    }
}

fn builtin_recipes() -> Vec<Recipe> {
    vec![
        Recipe::new(
            DEFAULT_RECIPE,
            "Generic section",
            "Write a clear professional summary of the answers below. \
             Use only the information provided and do not invent facts.",
        ),
        Recipe::new(
            "anamnese",
            "History",
            "Summarize the person's history as a chronological narrative. \
             Keep dates and names exactly as given.",
        ),
        Recipe::new(
            "profil_sensoriel",
            "Sensory profile",
            "Describe the sensory profile by modality. \
             Mention scores only when they are provided.",
        ),
        Recipe::new(
            "observations",
            "Observations",
            "Report the clinical observations factually, in the present tense, \
             without interpretation.",
        ),
        Recipe::new(
            "tests_standards",
            "Standardized tests",
            "Present each standardized test with its purpose and results. \
             Refer to result tables through their markers.",
        ),
        Recipe::new(
            "conclusions",
            "Conclusions",
            "Synthesize the findings and state recommendations. \
             Stay consistent with the answers and keep it concise.",
        ),
    ]
}
