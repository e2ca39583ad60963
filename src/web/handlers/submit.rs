use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::post,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::ApiResponse;
use crate::llm::prompt::create_prompt;
use crate::schedule::types::{Task, TaskContext};
use crate::AppContext;

pub fn submit_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/submit", post(submit_form))
        .route("/api/submit", post(submit_json))
        .with_state(ctx)
}

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    pub url: String,
    pub name: Option<String>,
}

/// Machine submission. An upstream stage may hand over its already-fetched
/// caption/transcription so the worker can skip straight to generation.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub url: String,
    pub name: Option<String>,
    pub caption: Option<String>,
    pub transcription: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub queue_position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_url: Option<String>,
}

async fn enqueue(ctx: &AppContext, req: SubmitRequest) -> anyhow::Result<SubmitResponse> {
    info!("Processing new recipe from URL: {}", req.url);

    let mut task = Task::new(req.url);

    if let Some(transcription) = req.transcription {
        let caption = req.caption.unwrap_or_default();
        let prompt = create_prompt(&caption, &transcription);
        task = task.with_context(TaskContext {
            caption,
            transcription,
            thumbnail: req.thumbnail,
            prompt,
        });
    }

    // eager record creation, the caller gets a reference before processing
    if let Some(name) = req.name.as_deref().filter(|name| !name.trim().is_empty()) {
        let slug = ctx.scheduler.store().create(name).await?;
        task.recipe_slug = Some(slug);
    }

    let recipe_slug = task.recipe_slug.clone();
    let queue_position = ctx.scheduler.submit(task).await;

    let recipe_url = recipe_slug
        .as_ref()
        .map(|slug| format!("{}/g/home/r/{}", ctx.config.mealie_static_url, slug));

    Ok(SubmitResponse {
        queue_position,
        recipe_slug,
        recipe_url,
    })
}

async fn submit_json(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<SubmitRequest>,
) -> impl IntoResponse {
    match enqueue(&ctx, req).await {
        Ok(response) => (StatusCode::ACCEPTED, Json(ApiResponse::success(response))),
        Err(e) => {
            error!("Failed to queue task: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

async fn submit_form(
    State(ctx): State<Arc<AppContext>>,
    Form(form): Form<SubmitForm>,
) -> impl IntoResponse {
    let req = SubmitRequest {
        url: form.url,
        name: form.name,
        caption: None,
        transcription: None,
        thumbnail: None,
    };

    match enqueue(&ctx, req).await {
        Ok(response) => Html(format!(
            "<p>✅ Queued at position {}. <a href=\"/status\">View queue status</a></p>",
            response.queue_position
        )),
        Err(e) => Html(format!("<p>❌ Error: {}</p>", e)),
    }
}
