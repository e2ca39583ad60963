pub mod config;
pub mod llm;
pub mod parser;
pub mod recipe;
pub mod schedule;
pub mod transcript;
pub mod utils;
pub mod web;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use config::Config;
use schedule::TaskScheduler;

/// Handles shared with every request handler. Constructed once at startup,
/// no global mutable state.
pub struct AppContext {
    pub scheduler: Arc<TaskScheduler>,
    pub config: Config,
    pub started_at: DateTime<Utc>,
}

impl AppContext {
    pub fn new(scheduler: Arc<TaskScheduler>, config: Config) -> Self {
        Self {
            scheduler,
            config,
            started_at: Utc::now(),
        }
    }
}
