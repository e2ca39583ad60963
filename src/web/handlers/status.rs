use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::fmt::Write;
use std::sync::Arc;

use crate::schedule::types::TaskSnapshot;
use crate::AppContext;

pub fn status_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status_page))
        .route("/api/status", get(status_json))
        .route("/health", get(health))
        .with_state(ctx)
}

async fn status_json(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(ctx.scheduler.status().await)
}

async fn health(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let stats = ctx.scheduler.stats();
    let status = ctx.scheduler.status().await;
    let last_error = status
        .recently_finished
        .iter()
        .rev()
        .find_map(|task| task.error.clone());

    Json(serde_json::json!({
        "status": "healthy",
        "uptime_seconds": (Utc::now() - ctx.started_at).num_seconds(),
        "recipes_processed": stats.processed,
        "recipes_failed": stats.failed,
        "queue_count": status.queue_count,
        "last_error": last_error,
    }))
}

async fn index(State(ctx): State<Arc<AppContext>>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><style>body {{ font-family: Arial, sans-serif; margin: 20px; }}</style></head>
<body>
    <h1>Recipe Parser</h1>
    <div class="status">
        <p>Mealie URL: {}</p>
    </div>
    <form action="/submit" method="post">
        <input name="url"
            placeholder="Paste Social Media video URL (e.g., https://tiktok.com)"
            style="width:80%"
            type="url"
            required/>
        <input name="name" placeholder="Recipe name (optional)" style="width:80%"/>
        <button type="submit">Submit</button>
    </form>
    <p><a href="/status">Queue status</a></p>
</body>
</html>"#,
        ctx.config.mealie_base_url
    ))
}

fn render_task(out: &mut String, task: &TaskSnapshot) {
    let _ = write!(out, "<li>{} &mdash; {}", task.url, task.status);
    if let Some(error) = &task.error {
        let _ = write!(out, " ({})", error);
    }
    out.push_str("</li>");
}

async fn status_page(State(ctx): State<Arc<AppContext>>) -> Html<String> {
    let status = ctx.scheduler.status().await;

    let mut body = String::new();
    body.push_str("<h1>Queue Status</h1>");

    match &status.currently_processing {
        Some(task) => {
            let _ = write!(body, "<p>Currently processing: {} &mdash; {}</p>", task.url, task.status);
        }
        None => body.push_str("<p>Currently processing: none</p>"),
    }

    let _ = write!(body, "<h2>Queued ({})</h2><ul>", status.queue_count);
    for task in &status.queued_tasks {
        render_task(&mut body, task);
    }
    body.push_str("</ul><h2>Recently finished</h2><ul>");
    for task in status.recently_finished.iter().rev() {
        render_task(&mut body, task);
    }
    body.push_str("</ul>");

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta http-equiv="refresh" content="5">
    <style>body {{ font-family: Arial, sans-serif; margin: 20px; }}</style>
</head>
<body>{}</body>
</html>"#,
        body
    ))
}
