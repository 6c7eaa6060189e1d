use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ovault.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub counter: CounterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_order_topic")]
    pub order_topic: String,
    #[serde(default = "default_summary_topic")]
    pub summary_topic: String,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl QueueConfig {
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dir: default_queue_dir(),
            order_topic: default_order_topic(),
            summary_topic: default_summary_topic(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// What a loader does with an event it cannot decompose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log it, count it, acknowledge it, and continue the batch.
    #[default]
    Skip,
    /// Stop the run and surface the error; the event is not acknowledged.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_loader_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub malformed: MalformedPolicy,
    /// Load-source tag; the inbound topic name when unset.
    #[serde(default)]
    pub source: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: default_loader_batch_size(),
            malformed: MalformedPolicy::default(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterConfig {
    #[serde(default = "default_counter_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub malformed: MalformedPolicy,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            batch_size: default_counter_batch_size(),
            malformed: MalformedPolicy::default(),
        }
    }
}

/// Load the config file at `path`, falling back to defaults when it is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Apply `OVAULT_*` environment overrides on top of file values.
///
/// `lookup` is `std::env::var(..).ok()` in production and a map in tests.
///
/// # Errors
///
/// Returns an error if `OVAULT_BATCH_SIZE` is set but not a positive integer.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(path) = lookup("OVAULT_STORE_PATH") {
        config.store.path = PathBuf::from(path);
    }
    if let Some(dir) = lookup("OVAULT_QUEUE_DIR") {
        config.queue.dir = PathBuf::from(dir);
    }
    if let Some(raw) = lookup("OVAULT_BATCH_SIZE") {
        config.loader.batch_size = parse_batch_size(&raw)
            .with_context(|| format!("invalid OVAULT_BATCH_SIZE '{raw}'"))?;
    }
    Ok(())
}

/// Resolve the effective config: file, then environment.
///
/// # Errors
///
/// Returns an error if the file or an override is invalid.
pub fn resolve_config(path: &Path) -> Result<Config> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn parse_batch_size(raw: &str) -> Result<usize> {
    let size: usize = raw.trim().parse()?;
    anyhow::ensure!(size > 0, "batch size must be positive");
    Ok(size)
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".ovault/warehouse.db")
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_queue_dir() -> PathBuf {
    PathBuf::from(".ovault/queue")
}

fn default_order_topic() -> String {
    "order-service-orders".to_string()
}

fn default_summary_topic() -> String {
    "dds-service-orders".to_string()
}

const fn default_lock_timeout_ms() -> u64 {
    2_000
}

const fn default_loader_batch_size() -> usize {
    30
}

const fn default_counter_batch_size() -> usize {
    100
}
