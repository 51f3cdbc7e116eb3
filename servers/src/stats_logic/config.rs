use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Sampled feed statistics server", version)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    #[clap(long, env = "STATS_PORT", help = "Port to listen on for stats requests.")]
    port: Option<u16>,

    #[clap(long, env = "STATS_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    config_path: Option<PathBuf>,

    #[clap(long, env = "STATS_LOG_DIR", help = "Directory for log files.")]
    log_dir: Option<PathBuf>,

    #[clap(long, env = "STATS_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    log_level: Option<String>,

    #[clap(long, env = "FEED_BASE_URL", help = "Base URL of the upstream feed host.")]
    feed_base_url: Option<String>,

    #[clap(long, env = "FEED_API_TOKEN", help = "Bearer credential for the upstream feed.")]
    api_token: Option<String>,

    #[clap(long, env = "FEED_TIMEOUT_SECONDS", help = "Seconds to wait for response headers on each feed request.")]
    timeout_seconds: Option<u64>,

    #[clap(long, env = "FEED_QUEUE_CAPACITY", help = "Capacity of the background work queue.")]
    queue_capacity: Option<usize>,

    #[clap(long, env = "FEED_ASYNC_BATCH_SIZE", help = "How many queued operations the worker may run concurrently.")]
    async_batch_size: Option<usize>,
}

impl RawConfig {
    // Merge two configs, where 'other' overrides 'self' for Some values
    fn merge(self, other: RawConfig) -> RawConfig {
        RawConfig {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            feed_base_url: other.feed_base_url.or(self.feed_base_url),
            api_token: other.api_token.or(self.api_token),
            timeout_seconds: other.timeout_seconds.or(self.timeout_seconds),
            queue_capacity: other.queue_capacity.or(self.queue_capacity),
            async_batch_size: other.async_batch_size.or(self.async_batch_size),
        }
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub feed_base_url: String,
    pub api_token: String,
    /// Bounds header acquisition of each feed request, not the lifetime of
    /// an already-open stream.
    pub timeout: Duration,
    pub queue_capacity: usize,
    pub async_batch_size: usize,
}

fn defaults() -> RawConfig {
    RawConfig {
        port: Some(9000),
        config_path: None,
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        feed_base_url: Some("https://api.twitter.com".to_string()),
        api_token: Some(String::new()),
        timeout_seconds: Some(3),
        queue_capacity: Some(3),
        async_batch_size: Some(1),
    }
}

fn resolve(raw: RawConfig) -> Config {
    Config {
        port: raw.port.unwrap_or(9000),
        log_dir: raw.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
        log_level: raw.log_level.unwrap_or_else(|| "info".to_string()),
        feed_base_url: raw
            .feed_base_url
            .unwrap_or_else(|| "https://api.twitter.com".to_string()),
        api_token: raw.api_token.unwrap_or_default(),
        timeout: Duration::from_secs(raw.timeout_seconds.unwrap_or(3)),
        queue_capacity: raw.queue_capacity.unwrap_or(3).max(1),
        async_batch_size: raw.async_batch_size.unwrap_or(1).max(1),
    }
}

pub fn load_config() -> Config {
    // 1. Load defaults
    let default_config = defaults();

    // 2. Load from config file (server_stats.conf) if present.
    //    Allow overriding the default config file path with CLI arg or env.
    let cli_args = RawConfig::parse();

    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("server_stats.conf"));

    let mut current_config = default_config;

    if config_file_path.exists() {
        match fs::read_to_string(&config_file_path) {
            Ok(config_str) => match serde_json::from_str::<RawConfig>(&config_str) {
                Ok(file_config) => current_config = current_config.merge(file_config),
                Err(e) => log::warn!(
                    "Failed to parse config file {}: {e}. Falling back to other sources.",
                    config_file_path.display()
                ),
            },
            Err(e) => log::warn!(
                "Failed to read config file {}: {e}. Falling back to other sources.",
                config_file_path.display()
            ),
        }
    } else {
        log::info!(
            "Config file not found at {}. Using defaults and environment/CLI variables.",
            config_file_path.display()
        );
    }

    // 3. Environment variables and CLI arguments override the file
    resolve(current_config.merge(cli_args))
}
