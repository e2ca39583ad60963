use super::*;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::llm::prompt::create_prompt;
use crate::llm::{LlmBackend, LlmError};
use crate::parser::FALLBACK_RECIPE_NAME;
use crate::recipe::{RecipeFields, RecipeStore};

const VALID_RESPONSE: &str = r#"```json
{"name": "Test Soup", "recipeIngredient": ["2 carrots", "1 onion"], "recipeInstructions": [{"text": "Chop everything."}, {"text": "Simmer."}]}
```"#;

// LLM double that replays a scripted sequence, then keeps answering with a
// valid recipe.
struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn always_valid() -> Self {
        Self::new(Vec::new())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn chat(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(VALID_RESPONSE.to_string()))
    }
}

// LLM double that tracks how many chats overlap.
struct SlowLlm {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowLlm {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmBackend for SlowLlm {
    async fn chat(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(VALID_RESPONSE.to_string())
    }
}

#[derive(Default)]
struct InMemoryStore {
    recipes: Mutex<HashMap<String, Value>>,
    updates: Mutex<Vec<(String, Value)>>,
    created: AtomicUsize,
}

impl InMemoryStore {
    async fn recipe(&self, slug: &str) -> Option<Value> {
        self.recipes.lock().await.get(slug).cloned()
    }

    async fn updates_for(&self, slug: &str) -> Vec<Value> {
        self.updates
            .lock()
            .await
            .iter()
            .filter(|(s, _)| s == slug)
            .map(|(_, fields)| fields.clone())
            .collect()
    }
}

#[async_trait]
impl RecipeStore for InMemoryStore {
    async fn create(&self, name: &str) -> Result<String> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let slug = format!("recipe-{}", n);
        self.recipes
            .lock()
            .await
            .insert(slug.clone(), serde_json::json!({ "name": name }));
        Ok(slug)
    }

    async fn update(&self, slug: &str, fields: &RecipeFields) -> Result<()> {
        let patch = serde_json::to_value(fields)?;
        self.updates
            .lock()
            .await
            .push((slug.to_string(), patch.clone()));

        let mut recipes = self.recipes.lock().await;
        let entry = recipes
            .entry(slug.to_string())
            .or_insert_with(|| serde_json::json!({}));
        if let (Some(obj), Some(patch)) = (entry.as_object_mut(), patch.as_object()) {
            for (key, value) in patch {
                obj.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn set_thumbnail(&self, _slug: &str, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn get(&self, slug: &str) -> Result<Value> {
        self.recipe(slug)
            .await
            .ok_or_else(|| anyhow!("Recipe not found: {}", slug))
    }
}

// Store whose creation path is unreachable.
struct FailingStore;

#[async_trait]
impl RecipeStore for FailingStore {
    async fn create(&self, _name: &str) -> Result<String> {
        Err(anyhow!("Could not connect to Mealie"))
    }

    async fn update(&self, _slug: &str, _fields: &RecipeFields) -> Result<()> {
        Err(anyhow!("Could not connect to Mealie"))
    }

    async fn set_thumbnail(&self, _slug: &str, _url: &str) -> Result<()> {
        Err(anyhow!("Could not connect to Mealie"))
    }

    async fn get(&self, _slug: &str) -> Result<Value> {
        Err(anyhow!("Could not connect to Mealie"))
    }
}

fn context_for(caption: &str, transcription: &str) -> TaskContext {
    TaskContext {
        caption: caption.to_string(),
        transcription: transcription.to_string(),
        thumbnail: None,
        prompt: create_prompt(caption, transcription),
    }
}

async fn setup(llm: Arc<dyn LlmBackend>) -> (Arc<TaskScheduler>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::default());
    let scheduler = create_scheduler(llm, store.clone(), None).await;
    (scheduler, store)
}

async fn wait_for_finished(scheduler: &TaskScheduler, count: usize) -> QueueStatus {
    for _ in 0..200 {
        let status = scheduler.status().await;
        if status.recently_finished.len() >= count {
            return status;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("tasks did not finish in time");
}

#[tokio::test]
async fn fifo_positions_before_worker_advances() {
    // no worker spawned, the queue stays untouched
    let store = Arc::new(InMemoryStore::default());
    let scheduler = TaskScheduler::new(Arc::new(ScriptedLlm::always_valid()), store, None);

    for url in ["https://v/a", "https://v/b", "https://v/c"] {
        let task = Task::new(url).with_context(context_for("cap", "Add 1 egg. Stir."));
        scheduler.submit(task).await;
    }

    let status = scheduler.status().await;
    assert_eq!(status.queue_count, 3);
    assert!(status.currently_processing.is_none());

    let positions: Vec<usize> = status.queued_tasks.iter().map(|t| t.queue_position).collect();
    assert_eq!(positions, vec![1, 2, 3]);

    let urls: Vec<&str> = status.queued_tasks.iter().map(|t| t.url.as_str()).collect();
    assert_eq!(urls, vec!["https://v/a", "https://v/b", "https://v/c"]);
}

#[tokio::test]
async fn task_runs_to_completed() {
    let (scheduler, store) = setup(Arc::new(ScriptedLlm::always_valid())).await;

    let task = Task::new("https://v/soup")
        .with_context(context_for("the caption", "Add 2 carrots. Chop them."));
    scheduler.submit(task).await;

    let status = wait_for_finished(&scheduler, 1).await;
    let finished = &status.recently_finished[0];
    assert_eq!(finished.status, TaskStatus::Completed);
    assert!(finished.error.is_none());
    assert!(finished.started_at.is_some());

    let recipe = store.recipe("recipe-0").await.expect("recipe should exist");
    assert_eq!(recipe["orgURL"], "https://v/soup");
    let description = recipe["description"].as_str().unwrap();
    assert!(description.contains("**[ORIGINAL CAPTION]**"));
    assert!(description.contains("the caption"));
    assert_eq!(recipe["recipeIngredient"][0], "2 carrots");
}

#[tokio::test]
async fn transport_error_fails_task_but_not_the_loop() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Err(LlmError::Request("connection refused".to_string())),
        Ok(VALID_RESPONSE.to_string()),
    ]));
    let (scheduler, _store) = setup(llm).await;

    scheduler
        .submit(Task::new("https://v/bad").with_context(context_for("c", "Add 1 cup rice.")))
        .await;
    scheduler
        .submit(Task::new("https://v/good").with_context(context_for("c", "Add 1 cup rice.")))
        .await;

    let status = wait_for_finished(&scheduler, 2).await;

    let failed = &status.recently_finished[0];
    assert_eq!(failed.url, "https://v/bad");
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(!failed.error.as_deref().unwrap_or_default().is_empty());

    let completed = &status.recently_finished[1];
    assert_eq!(completed.url, "https://v/good");
    assert_eq!(completed.status, TaskStatus::Completed);

    assert_eq!(scheduler.stats().failed, 1);
    assert_eq!(scheduler.stats().processed, 1);
}

#[tokio::test]
async fn parse_failure_falls_back_without_failing_the_task() {
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(
        "sorry, I could not find a recipe".to_string()
    )]));
    let (scheduler, store) = setup(llm).await;

    scheduler
        .submit(
            Task::new("https://v/fallback")
                .with_context(context_for("cap", "Add 2 eggs. Stir gently.")),
        )
        .await;

    let status = wait_for_finished(&scheduler, 1).await;
    assert_eq!(status.recently_finished[0].status, TaskStatus::Completed);

    let recipe = store.recipe("recipe-0").await.unwrap();
    assert_eq!(recipe["name"], FALLBACK_RECIPE_NAME);
    assert_eq!(recipe["recipeIngredient"][0], "Add 2 eggs");
}

#[tokio::test]
async fn missing_context_fails_before_the_llm_is_called() {
    let llm = Arc::new(ScriptedLlm::always_valid());
    let (scheduler, _store) = setup(llm.clone()).await;

    scheduler.submit(Task::new("https://v/no-context")).await;

    let status = wait_for_finished(&scheduler, 1).await;
    let failed = &status.recently_finished[0];
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("transcription"));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn store_error_fails_the_task() {
    let scheduler = create_scheduler(
        Arc::new(ScriptedLlm::always_valid()),
        Arc::new(FailingStore),
        None,
    )
    .await;

    scheduler
        .submit(Task::new("https://v/store-down").with_context(context_for("c", "Add 1 egg.")))
        .await;

    let status = wait_for_finished(&scheduler, 1).await;
    let failed = &status.recently_finished[0];
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("Mealie"));
}

#[tokio::test]
async fn at_most_one_task_is_ever_in_flight() {
    let llm = Arc::new(SlowLlm::new());
    let (scheduler, _store) = setup(llm.clone()).await;

    for i in 0..3 {
        scheduler
            .submit(
                Task::new(format!("https://v/{}", i))
                    .with_context(context_for("c", "Add 1 egg. Stir.")),
            )
            .await;
    }

    wait_for_finished(&scheduler, 3).await;
    assert_eq!(llm.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pre_created_record_gets_an_interim_preview() {
    let (scheduler, store) = setup(Arc::new(ScriptedLlm::always_valid())).await;

    let mut task = Task::new("https://v/eager")
        .with_context(context_for("eager caption", "Add 3 cups flour. Knead."));
    task.recipe_slug = Some("pre-made".to_string());
    scheduler.submit(task).await;

    let status = wait_for_finished(&scheduler, 1).await;
    assert_eq!(status.recently_finished[0].status, TaskStatus::Completed);

    // no create call, the record existed before processing
    assert_eq!(store.created.load(Ordering::SeqCst), 0);

    let updates = store.updates_for("pre-made").await;
    assert!(updates.len() >= 2);
    let interim = updates[0]["description"].as_str().unwrap();
    assert!(interim.contains("Transcription successful"));
    let last = updates.last().unwrap();
    assert!(last["description"]
        .as_str()
        .unwrap()
        .contains("**[ORIGINAL CAPTION]**"));
    assert_eq!(last["orgURL"], "https://v/eager");
}
