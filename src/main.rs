use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use recipe_rs::config::Config;
use recipe_rs::llm::{LlmBackend, LlmClient};
use recipe_rs::recipe::{MealieStore, RecipeStore};
use recipe_rs::schedule::create_scheduler;
use recipe_rs::transcript::{HttpTranscriptSource, TranscriptSource};
use recipe_rs::utils::logger;
use recipe_rs::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = logger::init("./logs".to_string())?;

    dotenv::dotenv().ok();
    info!("Starting recipe extraction service...");

    // a bad configuration is fatal before any task is accepted
    let config = Config::from_env()?;

    info!("Initializing LLM client for {}...", config.llm_server_url);
    let llm: Arc<dyn LlmBackend> =
        Arc::new(LlmClient::new(&config.llm_server_url, config.llm_response_timeout)?);

    info!("Initializing recipe store for {}...", config.mealie_base_url);
    let store: Arc<dyn RecipeStore> =
        Arc::new(MealieStore::new(&config.mealie_base_url, &config.mealie_token));

    let transcripts: Option<Arc<dyn TranscriptSource>> = config
        .transcribe_url
        .as_deref()
        .map(|endpoint| Arc::new(HttpTranscriptSource::new(endpoint)) as Arc<dyn TranscriptSource>);
    if transcripts.is_none() {
        info!("No TRANSCRIBE_URL configured, tasks must arrive with a transcription");
    }

    info!("Initializing scheduler...");
    let scheduler = create_scheduler(llm, store, transcripts).await;

    let addr = config.bind_addr;
    let ctx = Arc::new(AppContext::new(scheduler, config));

    info!("Starting HTTP server at http://{}", addr);
    recipe_rs::web::start_server(ctx, addr).await?;

    Ok(())
}
