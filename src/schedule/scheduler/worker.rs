use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::{error, info};

use crate::llm::prompt::SYSTEM_PROMPT;
use crate::llm::LlmBackend;
use crate::parser::{naive_parse, parse_with_fallback};
use crate::recipe::{RecipeFields, RecipeStore};
use crate::schedule::types::{Task, TaskContext, TaskStatus};
use crate::transcript::TranscriptSource;

use super::queue::TaskQueue;

/// The single worker loop. Pulls one task at a time, drives it through the
/// pipeline and records the terminal state.
pub struct TaskWorker {
    queue: Arc<TaskQueue>,
    llm: Arc<dyn LlmBackend>,
    store: Arc<dyn RecipeStore>,
    transcripts: Option<Arc<dyn TranscriptSource>>,
}

impl TaskWorker {
    pub fn new(
        queue: Arc<TaskQueue>,
        llm: Arc<dyn LlmBackend>,
        store: Arc<dyn RecipeStore>,
        transcripts: Option<Arc<dyn TranscriptSource>>,
    ) -> Self {
        Self {
            queue,
            llm,
            store,
            transcripts,
        }
    }

    /// Runs forever. A single task's failure never halts the loop.
    pub async fn run(&self) {
        loop {
            let task = self.queue.take_next().await;
            info!("Processing task {} ({})", task.id, task.url);

            if let Err(e) = self.process(task).await {
                error!("Error processing task: {}", e);
                self.queue.update_current(|t| t.fail(e.to_string())).await;
            }
            self.queue.finish_current().await;
        }
    }

    async fn process(&self, task: Task) -> Result<()> {
        // A pre-created record gets a transcript preview while the LLM works.
        if let (Some(slug), Some(context)) = (&task.recipe_slug, &task.context) {
            let preview = naive_parse(&context.transcription);
            let fields = RecipeFields {
                recipe_ingredient: Some(preview.recipe_ingredient),
                recipe_instructions: Some(preview.recipe_instructions),
                description: Some(format!(
                    "{}\n\n[Status: Transcription successful - Processing with LLM...]",
                    task.original_caption
                )),
                ..Default::default()
            };
            self.store.update(slug, &fields).await?;
        }

        let context = match task.context.clone() {
            Some(context) => context,
            None => self.transcribe(&task).await?,
        };

        if context.prompt.is_empty() {
            return Err(anyhow!("Task context or prompt is missing"));
        }

        self.set_status(TaskStatus::Generating).await;
        let response = self.llm.chat(SYSTEM_PROMPT, &context.prompt).await?;

        let mut recipe = parse_with_fallback(&response, &context.transcription);

        self.set_status(TaskStatus::Saving).await;

        let original_caption = if task.original_caption.is_empty() {
            context.caption.clone()
        } else {
            task.original_caption.clone()
        };
        let description = format!(
            "{}\n\n**[ORIGINAL CAPTION]**\n{}",
            recipe.description.take().unwrap_or_default(),
            original_caption
        );

        let slug = match task.recipe_slug.clone() {
            Some(slug) => slug,
            None => {
                let slug = self.store.create(&recipe.name).await?;
                self.queue
                    .update_current(|t| t.recipe_slug = Some(slug.clone()))
                    .await;
                slug
            }
        };

        info!(
            "Parsed recipe: {} ingredients, {} instructions",
            recipe.recipe_ingredient.len(),
            recipe.recipe_instructions.len()
        );

        let fields = RecipeFields {
            recipe_ingredient: Some(recipe.recipe_ingredient),
            recipe_instructions: Some(recipe.recipe_instructions),
            description: Some(description),
            org_url: Some(task.url.clone()),
        };
        self.store.update(&slug, &fields).await?;

        if let Some(thumbnail) = context.thumbnail.as_deref() {
            self.store.set_thumbnail(&slug, thumbnail).await?;
        }

        self.queue
            .update_current(|t| {
                t.advance(TaskStatus::Completed);
                t.finished_at = Some(Utc::now());
            })
            .await;

        info!("Recipe added successfully with ID: {}", slug);
        Ok(())
    }

    /// Consumes the upstream collaborator's output for tasks submitted
    /// without a pre-built context.
    async fn transcribe(&self, task: &Task) -> Result<TaskContext> {
        let source = self
            .transcripts
            .as_ref()
            .ok_or_else(|| anyhow!("No transcription backend configured"))?;

        self.set_status(TaskStatus::Transcribing).await;
        let context = source.fetch_context(&task.url).await?;

        self.queue
            .update_current(|t| {
                t.original_caption = context.caption.clone();
                t.context = Some(context.clone());
            })
            .await;

        Ok(context)
    }

    async fn set_status(&self, status: TaskStatus) {
        self.queue.update_current(|t| t.advance(status)).await;
    }
}
