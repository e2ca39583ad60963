use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{RecipeFields, RecipeStore};

/// Adapter for the Mealie HTTP API.
pub struct MealieStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl MealieStore {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn recipes_url(&self) -> String {
        format!("{}/api/recipes", self.base_url)
    }
}

#[async_trait]
impl RecipeStore for MealieStore {
    async fn create(&self, name: &str) -> Result<String> {
        info!("Creating recipe record in Mealie: {}", name);

        let response = self
            .client
            .post(self.recipes_url())
            .bearer_auth(&self.token)
            .json(&json!({ "name": name }))
            .send()
            .await
            .with_context(|| format!("Could not connect to Mealie at {}", self.base_url))?
            .error_for_status()
            .context("Mealie API error")?;

        // Mealie answers a recipe creation with the bare slug string
        let slug: Value = response
            .json()
            .await
            .context("Invalid JSON response from Mealie")?;
        slug.as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Mealie did not return a recipe slug"))
    }

    async fn update(&self, slug: &str, fields: &RecipeFields) -> Result<()> {
        debug!("Updating recipe {} in Mealie", slug);

        self.client
            .patch(format!("{}/{}", self.recipes_url(), slug))
            .bearer_auth(&self.token)
            .json(fields)
            .send()
            .await
            .with_context(|| format!("Could not connect to Mealie at {}", self.base_url))?
            .error_for_status()
            .context("Mealie API error")?;

        Ok(())
    }

    async fn set_thumbnail(&self, slug: &str, url: &str) -> Result<()> {
        debug!("Setting recipe thumbnail in Mealie. URL: {}", url);

        self.client
            .post(format!("{}/{}/image", self.recipes_url(), slug))
            .bearer_auth(&self.token)
            .json(&json!({ "includeTags": true, "url": url }))
            .send()
            .await
            .with_context(|| format!("Could not connect to Mealie at {}", self.base_url))?
            .error_for_status()
            .context("Mealie API error")?;

        Ok(())
    }

    async fn get(&self, slug: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/{}", self.recipes_url(), slug))
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Could not connect to Mealie at {}", self.base_url))?
            .error_for_status()
            .context("Mealie API error")?;

        response
            .json()
            .await
            .context("Invalid JSON response from Mealie")
    }
}
