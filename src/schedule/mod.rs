use std::sync::Arc;

pub mod scheduler;
pub mod types;

#[cfg(test)]
mod tests;

pub use scheduler::TaskScheduler;
pub use types::{QueueStatus, Task, TaskContext, TaskSnapshot, TaskStatus, WorkerStats};

use crate::llm::LlmBackend;
use crate::recipe::RecipeStore;
use crate::transcript::TranscriptSource;

/// Builds a scheduler and starts its worker loop.
pub async fn create_scheduler(
    llm: Arc<dyn LlmBackend>,
    store: Arc<dyn RecipeStore>,
    transcripts: Option<Arc<dyn TranscriptSource>>,
) -> Arc<TaskScheduler> {
    let scheduler = Arc::new(TaskScheduler::new(llm, store, transcripts));
    scheduler.spawn_worker().await;
    scheduler
}
