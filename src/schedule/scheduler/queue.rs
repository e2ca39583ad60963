use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, Notify};

use crate::schedule::types::{QueueStatus, Task, TaskStatus, WorkerStats};

// Finished tasks kept around for the status view. Oldest entries fall off.
const FINISHED_CAPACITY: usize = 64;

#[derive(Default)]
struct QueueState {
    queue: VecDeque<Task>,
    current: Option<Task>,
    finished: VecDeque<Task>,
}

/// Shared FIFO queue plus the "current task" pointer. The mutex protects only
/// queue and pointer mutation, it is never held across a network call.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    processed: AtomicU64,
    failed: AtomicU64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Appends to the FIFO tail and wakes the worker. Never blocks on
    /// in-flight processing. Returns the assigned queue position.
    pub async fn push(&self, mut task: Task) -> usize {
        let position = {
            let mut state = self.state.lock().await;
            let position = state.queue.len() + 1;
            task.queue_position = position;
            state.queue.push_back(task);
            position
        };
        self.notify.notify_one();
        position
    }

    /// Blocks until a task is available, pops the head and marks it current.
    /// Exactly one task is ever current.
    pub async fn take_next(&self) -> Task {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(mut task) = state.queue.pop_front() {
                    task.started_at = Some(Utc::now());
                    state.current = Some(task.clone());
                    return task;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Mutates the current task under a short lock so status readers always
    /// observe a consistent view.
    pub async fn update_current<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Task) -> R,
    {
        let mut state = self.state.lock().await;
        state.current.as_mut().map(f)
    }

    /// Moves the current task into the bounded history ring and bumps the
    /// lifetime counters.
    pub async fn finish_current(&self) {
        let mut state = self.state.lock().await;
        if let Some(task) = state.current.take() {
            match task.status {
                TaskStatus::Completed => {
                    self.processed.fetch_add(1, Ordering::Relaxed);
                }
                TaskStatus::Failed => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                }
                _ => {}
            }
            if state.finished.len() == FINISHED_CAPACITY {
                state.finished.pop_front();
            }
            state.finished.push_back(task);
        }
    }

    /// Read-only snapshot. Safe to call concurrently from many readers while
    /// the worker is running.
    pub async fn status(&self) -> QueueStatus {
        let state = self.state.lock().await;
        QueueStatus {
            queue_count: state.queue.len(),
            queued_tasks: state.queue.iter().map(Task::snapshot).collect(),
            currently_processing: state.current.as_ref().map(Task::snapshot),
            recently_finished: state.finished.iter().map(Task::snapshot).collect(),
        }
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
