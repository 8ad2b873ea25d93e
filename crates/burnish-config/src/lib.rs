//! File-backed tunables for the burnish runtime.
//!
//! The staleness threshold and the duration-estimate heuristic were tuned
//! empirically against a specific inference backend, so they are exposed as
//! configuration rather than hard-coded; loading clamps everything to sane
//! bounds and persists the normalized result.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_BURNISH_CONFIG: &str = "BURNISH_CONFIG";

const DEFAULT_MAX_TEXT_CHARS: usize = 1_500;
const DEFAULT_HISTORY_CAP: usize = 7;
const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
const DEFAULT_STALENESS_THRESHOLD_MS: u64 = 150_000;
const DEFAULT_DRAFT_QUIET_PERIOD_MS: u64 = 500;
const DEFAULT_ESTIMATE_PER_CHAR_MS: u64 = 60;
const DEFAULT_ESTIMATE_SAFETY_FACTOR_PCT: u64 = 150;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 70_000;
const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BurnishConfig {
    #[serde(default = "default_store_path")]
    pub store_path: String,
    #[serde(default)]
    pub job: JobConfigToml,
    #[serde(default)]
    pub view: ViewConfigToml,
    #[serde(default)]
    pub http: HttpConfigToml,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobConfigToml {
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for JobConfigToml {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            history_cap: default_history_cap(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewConfigToml {
    #[serde(default = "default_staleness_threshold_ms")]
    pub staleness_threshold_ms: u64,
    #[serde(default = "default_draft_quiet_period_ms")]
    pub draft_quiet_period_ms: u64,
    #[serde(default = "default_estimate_per_char_ms")]
    pub estimate_per_char_ms: u64,
    #[serde(default = "default_estimate_safety_factor_pct")]
    pub estimate_safety_factor_pct: u64,
}

impl Default for ViewConfigToml {
    fn default() -> Self {
        Self {
            staleness_threshold_ms: default_staleness_threshold_ms(),
            draft_quiet_period_ms: default_draft_quiet_period_ms(),
            estimate_per_char_ms: default_estimate_per_char_ms(),
            estimate_safety_factor_pct: default_estimate_safety_factor_pct(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfigToml {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
}

impl Default for HttpConfigToml {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            health_timeout_ms: default_health_timeout_ms(),
        }
    }
}

/// Coordinator-side tunables resolved to runtime types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTunables {
    pub max_text_chars: usize,
    pub history_cap: usize,
    pub tick_interval: Duration,
}

impl Default for JobTunables {
    fn default() -> Self {
        Self {
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            history_cap: DEFAULT_HISTORY_CAP,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
        }
    }
}

/// View-side tunables resolved to runtime types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTunables {
    pub staleness_threshold: Duration,
    pub draft_quiet_period: Duration,
    pub estimate_per_char_ms: u64,
    pub estimate_safety_factor_pct: u64,
}

impl Default for ViewTunables {
    fn default() -> Self {
        Self {
            staleness_threshold: Duration::from_millis(DEFAULT_STALENESS_THRESHOLD_MS),
            draft_quiet_period: Duration::from_millis(DEFAULT_DRAFT_QUIET_PERIOD_MS),
            estimate_per_char_ms: DEFAULT_ESTIMATE_PER_CHAR_MS,
            estimate_safety_factor_pct: DEFAULT_ESTIMATE_SAFETY_FACTOR_PCT,
        }
    }
}

/// Remote-call tunables resolved to runtime types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTunables {
    pub request_timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for HttpTunables {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            health_timeout: Duration::from_millis(DEFAULT_HEALTH_TIMEOUT_MS),
        }
    }
}

impl BurnishConfig {
    pub fn job_tunables(&self) -> JobTunables {
        JobTunables {
            max_text_chars: self.job.max_text_chars,
            history_cap: self.job.history_cap,
            tick_interval: Duration::from_millis(self.job.tick_interval_ms),
        }
    }

    pub fn view_tunables(&self) -> ViewTunables {
        ViewTunables {
            staleness_threshold: Duration::from_millis(self.view.staleness_threshold_ms),
            draft_quiet_period: Duration::from_millis(self.view.draft_quiet_period_ms),
            estimate_per_char_ms: self.view.estimate_per_char_ms,
            estimate_safety_factor_pct: self.view.estimate_safety_factor_pct,
        }
    }

    pub fn http_tunables(&self) -> HttpTunables {
        HttpTunables {
            request_timeout: Duration::from_millis(self.http.request_timeout_ms),
            health_timeout: Duration::from_millis(self.http.health_timeout_ms),
        }
    }
}

impl Default for BurnishConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            job: JobConfigToml::default(),
            view: ViewConfigToml::default(),
            http: HttpConfigToml::default(),
        }
    }
}

pub fn load_from_env() -> Result<BurnishConfig, ConfigError> {
    let path = config_path_from_env()?;
    load_from_path(path)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<BurnishConfig, ConfigError> {
    load_or_create_config(path.as_ref())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = resolve_home_dir().ok_or_else(|| {
        ConfigError::configuration("Unable to resolve home directory from HOME or USERPROFILE")
    })?;

    Ok(home.join(".config").join("burnish").join("config.toml"))
}

fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    match std::env::var(ENV_BURNISH_CONFIG) {
        Ok(raw) => {
            if raw.trim().is_empty() {
                default_config_path()
            } else {
                Ok(raw.into())
            }
        }
        Err(std::env::VarError::NotPresent) => default_config_path(),
        Err(_) => Err(ConfigError::configuration(
            "BURNISH_CONFIG contained invalid UTF-8",
        )),
    }
}

fn resolve_home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("USERPROFILE")
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
}

fn default_store_path() -> String {
    resolve_home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".local")
        .join("share")
        .join("burnish")
        .join("burnish-records.db")
        .to_string_lossy()
        .to_string()
}

fn default_max_text_chars() -> usize {
    DEFAULT_MAX_TEXT_CHARS
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_staleness_threshold_ms() -> u64 {
    DEFAULT_STALENESS_THRESHOLD_MS
}

fn default_draft_quiet_period_ms() -> u64 {
    DEFAULT_DRAFT_QUIET_PERIOD_MS
}

fn default_estimate_per_char_ms() -> u64 {
    DEFAULT_ESTIMATE_PER_CHAR_MS
}

fn default_estimate_safety_factor_pct() -> u64 {
    DEFAULT_ESTIMATE_SAFETY_FACTOR_PCT
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_health_timeout_ms() -> u64 {
    DEFAULT_HEALTH_TIMEOUT_MS
}

fn persist_config(path: &Path, config: &BurnishConfig) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to serialize BURNISH_CONFIG for {}: {err}",
            path.display()
        ))
    })?;

    std::fs::write(path, rendered.as_bytes()).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to write BURNISH_CONFIG to {}: {err}",
            path.display()
        ))
    })
}

fn load_or_create_config(path: &Path) -> Result<BurnishConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "Failed to create parent directory {} for BURNISH_CONFIG: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let default_config = BurnishConfig::default();
            persist_config(path, &default_config)?;
            return Ok(default_config);
        }
        Err(err) => {
            return Err(ConfigError::configuration(format!(
                "Failed to read BURNISH_CONFIG from {}: {err}",
                path.display()
            )));
        }
    };

    let mut config: BurnishConfig = toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to parse BURNISH_CONFIG from {}: {err}",
            path.display()
        ))
    })?;

    let changed = normalize_config(&mut config);
    if changed {
        persist_config(path, &config)?;
    }

    Ok(config)
}

fn normalize_config(config: &mut BurnishConfig) -> bool {
    let mut changed = false;

    if config.store_path.trim().is_empty() {
        config.store_path = default_store_path();
        changed = true;
    } else if config.store_path.trim() != config.store_path {
        config.store_path = config.store_path.trim().to_owned();
        changed = true;
    }

    changed |= clamp_usize(&mut config.job.max_text_chars, 1, 10_000);
    changed |= clamp_usize(&mut config.job.history_cap, 1, 50);
    changed |= clamp_u64(&mut config.job.tick_interval_ms, 250, 5_000);
    changed |= clamp_u64(&mut config.view.staleness_threshold_ms, 10_000, 3_600_000);
    changed |= clamp_u64(&mut config.view.draft_quiet_period_ms, 100, 5_000);
    changed |= clamp_u64(&mut config.view.estimate_per_char_ms, 1, 1_000);
    changed |= clamp_u64(&mut config.view.estimate_safety_factor_pct, 100, 400);
    changed |= clamp_u64(&mut config.http.request_timeout_ms, 1_000, 300_000);
    changed |= clamp_u64(&mut config.http.health_timeout_ms, 500, 30_000);

    changed
}

fn clamp_u64(value: &mut u64, min: u64, max: u64) -> bool {
    let clamped = (*value).clamp(min, max);
    if clamped != *value {
        *value = clamped;
        return true;
    }
    false
}

fn clamp_usize(value: &mut usize, min: usize, max: usize) -> bool {
    let clamped = (*value).clamp(min, max);
    if clamped != *value {
        *value = clamped;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "burnish-config-{prefix}-{nanos}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&path).expect("create temp dir");
        path
    }

    fn remove_temp_path(path: &Path) {
        let _ = std::fs::remove_dir_all(path);
    }

    #[test]
    fn load_from_path_creates_default_config_when_missing() {
        let root = unique_temp_dir("defaults");
        let path = root.join("nested").join("config.toml");

        let config = load_from_path(&path).expect("load defaults");

        assert!(path.exists());
        assert_eq!(config.job.max_text_chars, 1_500);
        assert_eq!(config.job.history_cap, 7);
        assert_eq!(config.view.staleness_threshold_ms, 150_000);
        assert_eq!(config.http.request_timeout_ms, 70_000);

        remove_temp_path(&root);
    }

    #[test]
    fn load_from_path_normalizes_and_persists_supported_bounds() {
        let root = unique_temp_dir("normalization");
        let path = root.join("config.toml");
        std::fs::write(
            &path,
            r#"
store_path = "  /tmp/burnish.db  "

[job]
max_text_chars = 0
history_cap = 9999
tick_interval_ms = 1

[view]
staleness_threshold_ms = 5
draft_quiet_period_ms = 99999
estimate_safety_factor_pct = 1000

[http]
request_timeout_ms = 1
health_timeout_ms = 99999999
"#,
        )
        .expect("write fixture config");

        let config = load_from_path(&path).expect("load and normalize config");

        assert_eq!(config.store_path, "/tmp/burnish.db");
        assert_eq!(config.job.max_text_chars, 1);
        assert_eq!(config.job.history_cap, 50);
        assert_eq!(config.job.tick_interval_ms, 250);
        assert_eq!(config.view.staleness_threshold_ms, 10_000);
        assert_eq!(config.view.draft_quiet_period_ms, 5_000);
        assert_eq!(config.view.estimate_safety_factor_pct, 400);
        assert_eq!(config.http.request_timeout_ms, 1_000);
        assert_eq!(config.http.health_timeout_ms, 30_000);

        let persisted = std::fs::read_to_string(&path).expect("read persisted config");
        let parsed: BurnishConfig =
            toml::from_str(&persisted).expect("parse persisted normalized config");
        assert_eq!(parsed, config);

        remove_temp_path(&root);
    }

    #[test]
    fn load_from_path_returns_parse_error_for_invalid_toml() {
        let root = unique_temp_dir("invalid");
        let path = root.join("config.toml");
        std::fs::write(&path, "store_path = [\n").expect("write fixture config");

        let error = load_from_path(&path).expect_err("expected parse failure");
        assert!(error.to_string().contains("Failed to parse BURNISH_CONFIG"));

        remove_temp_path(&root);
    }

    #[test]
    fn tunable_slices_resolve_durations() {
        let config = BurnishConfig::default();

        let job = config.job_tunables();
        assert_eq!(job.tick_interval, Duration::from_secs(1));
        assert_eq!(job.max_text_chars, 1_500);

        let view = config.view_tunables();
        assert_eq!(view.staleness_threshold, Duration::from_millis(150_000));
        assert_eq!(view.draft_quiet_period, Duration::from_millis(500));

        let http = config.http_tunables();
        assert_eq!(http.request_timeout, Duration::from_secs(70));
        assert_eq!(http.health_timeout, Duration::from_secs(5));
    }
}
