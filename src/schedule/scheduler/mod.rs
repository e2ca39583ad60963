mod queue;
mod worker;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

pub use queue::TaskQueue;
use worker::TaskWorker;

use crate::llm::LlmBackend;
use crate::recipe::RecipeStore;
use crate::schedule::types::{QueueStatus, Task, WorkerStats};
use crate::transcript::TranscriptSource;

/// Owns the queue and the single worker, constructed once at process start
/// and handed to request handlers by reference.
pub struct TaskScheduler {
    queue: Arc<TaskQueue>,
    llm: Arc<dyn LlmBackend>,
    store: Arc<dyn RecipeStore>,
    transcripts: Option<Arc<dyn TranscriptSource>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskScheduler {
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        store: Arc<dyn RecipeStore>,
        transcripts: Option<Arc<dyn TranscriptSource>>,
    ) -> Self {
        Self {
            queue: Arc::new(TaskQueue::new()),
            llm,
            store,
            transcripts,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the worker loop. The pipeline is deliberately serialized, a
    /// second worker is refused.
    pub async fn spawn_worker(&self) {
        let mut workers = self.workers.lock().await;
        if !workers.is_empty() {
            warn!("Worker already running, refusing to spawn another");
            return;
        }

        let worker = TaskWorker::new(
            self.queue.clone(),
            self.llm.clone(),
            self.store.clone(),
            self.transcripts.clone(),
        );
        workers.push(tokio::spawn(async move {
            worker.run().await;
        }));
    }

    /// Appends the task to the queue tail and returns its position. Never
    /// blocks on in-flight processing.
    pub async fn submit(&self, task: Task) -> usize {
        self.queue.push(task).await
    }

    pub async fn status(&self) -> QueueStatus {
        self.queue.status().await
    }

    pub fn stats(&self) -> WorkerStats {
        self.queue.stats()
    }

    /// Store handle for the eager record creation on the submission path.
    pub fn store(&self) -> &Arc<dyn RecipeStore> {
        &self.store
    }
}
