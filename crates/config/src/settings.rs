use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub tasks: TaskSettings,
    pub context: ContextSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub upload_chunk_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TaskSettings {
    /// Document-list reconciliation interval.
    pub poll_interval_ms: u64,
    /// Synthetic progress tick while the server parses an upload.
    pub simulate_tick_ms: u64,
    /// Simulated progress stays strictly below this; only an
    /// authoritative completion signal moves the bar to 100.
    pub simulate_ceiling: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextSettings {
    pub dept_id: i64,
    pub project_id: i64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("DOCPORT"),
            )
            .set_default("api.base_url", "http://localhost:8000")?
            .set_default("api.request_timeout_secs", 30)?
            .set_default("api.upload_chunk_size", 64 * 1024)?
            .set_default("tasks.poll_interval_ms", 3000)?
            .set_default("tasks.simulate_tick_ms", 500)?
            .set_default("tasks.simulate_ceiling", 90.0)?
            .set_default("context.dept_id", 1)?
            .set_default("context.project_id", 1)?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
