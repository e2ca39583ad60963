use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_LLM_SERVER_URL: &str = "http://llm:6998";
const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Everything the service reads from the environment, collected once at
/// startup. A missing store configuration is fatal before any task is
/// accepted.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_server_url: String,
    pub llm_response_timeout: Duration,
    pub mealie_base_url: String,
    pub mealie_static_url: String,
    pub mealie_token: String,
    pub transcribe_url: Option<String>,
    pub bind_addr: SocketAddr,
}

fn var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => dotenv::var(name).ok().filter(|value| !value.trim().is_empty()),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mealie_base_url = var("MEALIE_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_default();
        let mealie_static_url = var("MEALIE_STATIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| mealie_base_url.clone());

        let timeout_secs = var("LLM_RESPONSE_TIMEOUT")
            .map(|raw| {
                raw.parse::<u64>()
                    .with_context(|| format!("Invalid LLM_RESPONSE_TIMEOUT: {}", raw))
            })
            .transpose()?
            .unwrap_or(DEFAULT_RESPONSE_TIMEOUT_SECS);

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("Invalid BIND_ADDR")?;

        let config = Self {
            llm_server_url: var("LLM_SERVER_URL")
                .unwrap_or_else(|| DEFAULT_LLM_SERVER_URL.to_string()),
            llm_response_timeout: Duration::from_secs(timeout_secs),
            mealie_base_url,
            mealie_static_url,
            mealie_token: var("MEALIE_TOKEN").unwrap_or_default(),
            transcribe_url: var("TRANSCRIBE_URL"),
            bind_addr,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.mealie_token.is_empty() {
            bail!("Missing MEALIE_TOKEN environment variable. Please set it in .env file.");
        }
        if self.mealie_base_url.is_empty() {
            bail!("Missing MEALIE_BASE_URL environment variable. Please set it in .env file.");
        }
        Ok(())
    }
}
