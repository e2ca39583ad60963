use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::llm::prompt::create_prompt;
use crate::schedule::types::TaskContext;

/// Upstream collaborator that turns a video URL into caption + transcription.
/// The fetching and transcription itself lives outside this service, the
/// scheduler only consumes its output.
#[async_trait]
pub trait TranscriptSource: Send + Sync + 'static {
    async fn fetch_context(&self, url: &str) -> Result<TaskContext>;
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    caption: Option<String>,
    transcription: String,
    thumbnail: Option<String>,
}

/// Adapter for an HTTP fetch-and-transcribe service.
pub struct HttpTranscriptSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranscriptSource {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptSource for HttpTranscriptSource {
    async fn fetch_context(&self, url: &str) -> Result<TaskContext> {
        info!("Requesting transcription for {}", url);

        let body: TranscribeResponse = self
            .client
            .post(&self.endpoint)
            .json(&TranscribeRequest { url })
            .send()
            .await
            .context("Transcription service unreachable")?
            .error_for_status()
            .context("Transcription service error")?
            .json()
            .await
            .context("Invalid response from transcription service")?;

        info!("Transcription length: {} characters.", body.transcription.len());

        let caption = body.caption.unwrap_or_default();
        let prompt = create_prompt(&caption, &body.transcription);

        Ok(TaskContext {
            caption,
            transcription: body.transcription,
            thumbnail: body.thumbnail,
            prompt,
        })
    }
}
