use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Lifecycle of an extraction task. Transitions are forward-only, with
/// `Failed` reachable from any non-terminal state. A task submitted with a
/// pre-built context enters at `WaitingForSlot` and jumps straight to
/// `Generating` when the worker picks it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Received,
    Transcribing,
    WaitingForSlot,
    Generating,
    Saving,
    Completed,
    Failed,
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Received => 0,
            TaskStatus::Transcribing => 1,
            TaskStatus::WaitingForSlot => 2,
            TaskStatus::Generating => 3,
            TaskStatus::Saving => 4,
            TaskStatus::Completed => 5,
            TaskStatus::Failed => 6,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn can_transition(self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == TaskStatus::Failed {
            return true;
        }
        next.rank() > self.rank()
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TaskStatus::Received => "received, waiting to be processed",
            TaskStatus::Transcribing => "transcribing",
            TaskStatus::WaitingForSlot => "waiting for LLM to have a free slot",
            TaskStatus::Generating => "LLM is generating",
            TaskStatus::Saving => "saving recipe",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{}", text)
    }
}

/// Immutable bundle of everything the generation stage needs. Populated once
/// the upstream fetch/transcription finished, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    pub caption: String,
    pub transcription: String,
    pub thumbnail: Option<String>,
    pub prompt: String,
}

/// One queued recipe-extraction job and its mutable state. Owned by the
/// submitter before enqueue and by the worker afterwards, status readers only
/// ever see snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub url: String,
    pub status: TaskStatus,
    pub queue_position: usize,
    pub context: Option<TaskContext>,
    pub recipe_slug: Option<String>,
    pub original_caption: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Task {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            url: url.into(),
            status: TaskStatus::Received,
            queue_position: 0,
            context: None,
            recipe_slug: None,
            original_caption: String::new(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Attaches an upstream-built context. The caption is copied aside so the
    /// final description survives any later context handling.
    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.original_caption = context.caption.clone();
        self.context = Some(context);
        self.status = TaskStatus::WaitingForSlot;
        self
    }

    /// Forward-only status change. Returns false and leaves the task
    /// untouched when the transition is not part of the state graph.
    pub fn advance(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition(next) {
            return false;
        }
        self.status = next;
        true
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.advance(TaskStatus::Failed) {
            self.error = Some(error.into());
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            url: self.url.clone(),
            status: self.status,
            queue_position: self.queue_position,
            started_at: self.started_at,
            error: self.error.clone(),
        }
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Url={}, status={}, position={}",
            self.url, self.status, self.queue_position
        )
    }
}

/// Read-only view of one task, exposed through the status interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub url: String,
    pub status: TaskStatus,
    pub queue_position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Consistent snapshot of the whole queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_count: usize,
    pub queued_tasks: Vec<TaskSnapshot>,
    pub currently_processing: Option<TaskSnapshot>,
    pub recently_finished: Vec<TaskSnapshot>,
}

/// Lifetime counters of the worker loop.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkerStats {
    pub processed: u64,
    pub failed: u64,
}
