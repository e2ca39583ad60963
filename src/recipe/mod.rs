use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::parser::InstructionStep;

pub mod mealie;

pub use mealie::MealieStore;

/// Partial update for a stored recipe. Absent fields are left untouched.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RecipeFields {
    #[serde(rename = "recipeIngredient", skip_serializing_if = "Option::is_none")]
    pub recipe_ingredient: Option<Vec<String>>,
    #[serde(rename = "recipeInstructions", skip_serializing_if = "Option::is_none")]
    pub recipe_instructions: Option<Vec<InstructionStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "orgURL", skip_serializing_if = "Option::is_none")]
    pub org_url: Option<String>,
}

/// External system of record for finished recipes. Failures during saving
/// fail the task, the core never retries them.
#[async_trait]
pub trait RecipeStore: Send + Sync + 'static {
    /// Creates a bare record and returns its slug.
    async fn create(&self, name: &str) -> Result<String>;
    async fn update(&self, slug: &str, fields: &RecipeFields) -> Result<()>;
    async fn set_thumbnail(&self, slug: &str, url: &str) -> Result<()>;
    async fn get(&self, slug: &str) -> Result<Value>;
}
