//! Configuration for the order pipeline.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ORDERFLOW_ORDER_COUNT, ORDERFLOW_WORKERS,
//!    ORDERFLOW_CONFIRM_MAX_ATTEMPTS)
//! 2. Config file (.orderflow/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .orderflow/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::RetryPolicy;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const ENV_ORDER_COUNT: &str = "ORDERFLOW_ORDER_COUNT";
pub const ENV_WORKERS: &str = "ORDERFLOW_WORKERS";
pub const ENV_CONFIRM_MAX_ATTEMPTS: &str = "ORDERFLOW_CONFIRM_MAX_ATTEMPTS";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub confirm: Option<RetryPolicy>,
    #[serde(default)]
    pub push: Option<RetryPolicy>,
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,
    #[serde(default)]
    pub lookups: Option<LookupConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    /// Orders created per run
    pub order_count: Option<usize>,
    /// Worker threads in the orchestrator's pool
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub confirm_success_rate: Option<f64>,
    pub push_success_rate: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    pub item_delay_ms: Option<u64>,
    pub shipping_delay_ms: Option<u64>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Orders created per run
    pub order_count: usize,
    /// Worker threads in the orchestrator's pool
    pub workers: usize,
    /// Confirmation retry budget (unbounded by default)
    pub confirm: RetryPolicy,
    /// Push notification retry budget
    pub push: RetryPolicy,
    /// Success probabilities for the random endpoint
    pub endpoint: EndpointSettings,
    /// Simulated lookup latencies
    pub lookups: LookupSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSettings {
    pub confirm_success_rate: f64,
    pub push_success_rate: f64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            confirm_success_rate: 1.0,
            push_success_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSettings {
    pub item_delay_ms: u64,
    pub shipping_delay_ms: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            item_delay_ms: 1000,
            shipping_delay_ms: 50,
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            order_count: 100,
            workers: 8,
            confirm: RetryPolicy::confirm_default(),
            push: RetryPolicy::push_default(),
            endpoint: EndpointSettings::default(),
            lookups: LookupSettings::default(),
            config_file: None,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".orderflow").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Overlay a parsed config file onto the defaults
fn apply_config_file(mut resolved: ResolvedConfig, file: ConfigFile) -> ResolvedConfig {
    if let Some(order_count) = file.pipeline.order_count {
        resolved.order_count = order_count;
    }
    if let Some(workers) = file.pipeline.workers {
        resolved.workers = workers;
    }
    if let Some(confirm) = file.confirm {
        resolved.confirm = confirm;
    }
    if let Some(push) = file.push {
        resolved.push = push;
    }
    if let Some(endpoint) = file.endpoint {
        let defaults = EndpointSettings::default();
        resolved.endpoint = EndpointSettings {
            confirm_success_rate: endpoint
                .confirm_success_rate
                .unwrap_or(defaults.confirm_success_rate),
            push_success_rate: endpoint
                .push_success_rate
                .unwrap_or(defaults.push_success_rate),
        };
    }
    if let Some(lookups) = file.lookups {
        let defaults = LookupSettings::default();
        resolved.lookups = LookupSettings {
            item_delay_ms: lookups.item_delay_ms.unwrap_or(defaults.item_delay_ms),
            shipping_delay_ms: lookups
                .shipping_delay_ms
                .unwrap_or(defaults.shipping_delay_ms),
        };
    }
    resolved
}

/// Parse a numeric environment variable, if set
fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: {:?}", name, value)),
        Err(_) => Ok(None),
    }
}

/// Overlay environment variables (highest priority)
fn apply_env(mut resolved: ResolvedConfig) -> Result<ResolvedConfig> {
    if let Some(order_count) = env_number(ENV_ORDER_COUNT)? {
        resolved.order_count = order_count;
    }
    if let Some(workers) = env_number(ENV_WORKERS)? {
        resolved.workers = workers;
    }
    if let Some(max_attempts) = env_number(ENV_CONFIRM_MAX_ATTEMPTS)? {
        resolved.confirm.max_attempts = Some(max_attempts);
    }
    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let mut resolved = ResolvedConfig::default();
    if let Some(ref config_path) = config_file {
        let file = load_config_file(config_path)?;
        resolved = apply_config_file(resolved, file);
    }
    resolved.config_file = config_file;

    apply_env(resolved)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
