// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const ENV_QUERY: &str = "MONITOR_QUERY";
pub const ENV_PAGE_COUNT: &str = "MONITOR_PAGE_COUNT";
pub const ENV_DAYS_BACK: &str = "MONITOR_DAYS_BACK";
pub const ENV_REFRESH_SECS: &str = "MONITOR_REFRESH_SECS";

pub const DEFAULT_QUERY: &str = "추락";
pub const DEFAULT_PAGE_COUNT: u32 = 5;
pub const DEFAULT_PAGE_STEP: u32 = 10;
pub const DEFAULT_PAGE_BACKOFF_MS: u64 = 5_000;
pub const DEFAULT_REFRESH_SECS: u64 = 60;

/// What one crawl run fetches and which window it keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub query: String,
    pub page_count: u32,
    /// Result offset between consecutive pages.
    pub page_step: u32,
    /// 0 keeps results since local midnight; N keeps the last N days.
    pub days_back: u32,
    /// Pause after a page fails before moving to the next one.
    pub page_backoff_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            page_count: DEFAULT_PAGE_COUNT,
            page_step: DEFAULT_PAGE_STEP,
            days_back: 0,
            page_backoff_ms: DEFAULT_PAGE_BACKOFF_MS,
        }
    }
}

impl CrawlConfig {
    /// Offsets `0, step, 2*step, ...` for `page_count` pages.
    pub fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.page_count).map_while(move |i| i.checked_mul(self.page_step))
    }

    pub fn page_backoff(&self) -> Duration {
        Duration::from_millis(self.page_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub crawl: CrawlConfig,
    pub refresh_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            crawl: CrawlConfig::default(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
        }
    }
}

impl MonitorConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.crawl.query.trim().is_empty() {
            bail!("crawl.query must not be blank");
        }
        if self.crawl.page_count == 0 {
            bail!("crawl.page_count must be at least 1");
        }
        if self.crawl.page_step == 0 {
            bail!("crawl.page_step must be at least 1");
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be at least 1");
        }
        Ok(())
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<MonitorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading monitor config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing monitor config {}", path.display()))
}

/// Load config using env var + fallbacks, then apply scalar env overrides:
/// 1) $MONITOR_CONFIG_PATH
/// 2) config/monitor.toml
/// 3) config/monitor.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<MonitorConfig> {
    let mut cfg = load_config_file()?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

fn load_config_file() -> Result<MonitorConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/monitor.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/monitor.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(MonitorConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<MonitorConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => toml::from_str(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| serde_json::from_str(s).map_err(anyhow::Error::from))
            .map_err(|_| anyhow!("unsupported monitor config format")),
    }
}

fn apply_env_overrides(cfg: &mut MonitorConfig) {
    if let Ok(q) = std::env::var(ENV_QUERY) {
        if !q.trim().is_empty() {
            cfg.crawl.query = q.trim().to_string();
        }
    }
    if let Some(v) = env_scalar(ENV_PAGE_COUNT) {
        cfg.crawl.page_count = v;
    }
    if let Some(v) = env_scalar(ENV_DAYS_BACK) {
        cfg.crawl.days_back = v;
    }
    if let Some(v) = env_scalar(ENV_REFRESH_SECS) {
        cfg.refresh_interval_secs = v;
    }
}

fn env_scalar<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}
