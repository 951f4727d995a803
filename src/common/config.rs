//! Configuration file handling
//!
//! Preferences live in a TOML file in the platform config directory. Every
//! section has defaults, so a missing or partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::paths::{self, config_path};
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Interface language ("en" or "zh")
    #[serde(default = "default_language")]
    pub language: String,

    /// Remote project-management service
    #[serde(default)]
    pub zentao: RemoteConfig,

    /// Execution settings
    #[serde(default)]
    pub run: RunSettings,

    /// Directory overrides
    #[serde(default)]
    pub paths: PathSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            zentao: RemoteConfig::default(),
            run: RunSettings::default(),
            paths: PathSettings::default(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

/// Remote service site and credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub password: String,
}

impl RemoteConfig {
    /// Whether enough is configured to talk to the remote service
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.account.is_empty()
    }
}

/// Execution settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunSettings {
    /// Number of cases executed concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Timeout for a single step's action
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,

    /// Cancel the whole run after this many seconds
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,

    /// Execution environment tag recorded in reports
    #[serde(default = "default_env")]
    pub env: String,

    /// Shell used to execute step commands
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Separator between checkpoints in a step's expected text (default: newline)
    #[serde(default)]
    pub checkpoint_delimiter: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            step_timeout_secs: default_step_timeout(),
            task_timeout_secs: None,
            env: default_env(),
            shell: default_shell(),
            checkpoint_delimiter: None,
        }
    }
}

fn default_workers() -> usize {
    4
}
fn default_step_timeout() -> u64 {
    60
}
fn default_env() -> String {
    "local".to_string()
}
fn default_shell() -> String {
    "sh".to_string()
}

/// Directory overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PathSettings {
    pub workspace: Option<PathBuf>,
    pub reports: Option<PathBuf>,
    pub baselines: Option<PathBuf>,
}

impl PathSettings {
    pub fn workspace_dir(&self) -> PathBuf {
        self.workspace
            .clone()
            .unwrap_or_else(paths::default_workspace_dir)
    }

    pub fn report_dir(&self) -> PathBuf {
        self.reports.clone().unwrap_or_else(paths::default_report_dir)
    }

    pub fn baseline_dir(&self) -> PathBuf {
        self.baselines
            .clone()
            .unwrap_or_else(paths::default_baseline_dir)
    }
}

/// Values accepted by `atf set`; `None` leaves the current value alone
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub language: Option<String>,
    pub url: Option<String>,
    pub account: Option<String>,
    pub password: Option<String>,
    pub env: Option<String>,
    pub workers: Option<usize>,
    pub step_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let mut config: Config =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.zentao.url = normalize_url(&config.zentao.url);
        Ok(config)
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()
            .ok_or_else(|| Error::Config("Cannot determine config directory".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        paths::ensure_parent(path)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply validated settings
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<()> {
        if let Some(language) = update.language {
            self.language = parse_language(&language)?;
        }
        if let Some(url) = update.url {
            let lower = url.to_ascii_lowercase();
            if !lower.starts_with("http://") && !lower.starts_with("https://") {
                return Err(Error::invalid_setting("url", "must start with http:// or https://"));
            }
            self.zentao.url = normalize_url(&url);
        }
        if let Some(account) = update.account {
            if account.chars().count() < 3 {
                return Err(Error::invalid_setting("account", "must be at least 3 characters"));
            }
            self.zentao.account = account;
        }
        if let Some(password) = update.password {
            if password.chars().count() < 4 {
                return Err(Error::invalid_setting("password", "must be at least 4 characters"));
            }
            self.zentao.password = password;
        }
        if let Some(env) = update.env {
            if env.trim().is_empty() {
                return Err(Error::invalid_setting("env", "must not be empty"));
            }
            self.run.env = env;
        }
        if let Some(workers) = update.workers {
            if workers == 0 {
                return Err(Error::invalid_setting("workers", "must be at least 1"));
            }
            self.run.workers = workers;
        }
        if let Some(secs) = update.step_timeout_secs {
            if secs == 0 {
                return Err(Error::invalid_setting("step_timeout_secs", "must be at least 1"));
            }
            self.run.step_timeout_secs = secs;
        }
        Ok(())
    }

    /// Render the configuration for display, masking the password
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let masked = if self.zentao.password.is_empty() {
            String::new()
        } else {
            "*".repeat(self.zentao.password.chars().count())
        };
        vec![
            ("language", self.language.clone()),
            ("url", self.zentao.url.clone()),
            ("account", self.zentao.account.clone()),
            ("password", masked),
            ("env", self.run.env.clone()),
            ("workers", self.run.workers.to_string()),
            ("step_timeout_secs", self.run.step_timeout_secs.to_string()),
            ("workspace", self.paths.workspace_dir().display().to_string()),
            ("reports", self.paths.report_dir().display().to_string()),
        ]
    }
}

/// Map user input to a supported language code
fn parse_language(input: &str) -> Result<String> {
    match input.trim().to_ascii_lowercase().as_str() {
        "en" | "e" | "english" => Ok("en".to_string()),
        "zh" | "c" | "chinese" => Ok("zh".to_string()),
        other => Err(Error::invalid_setting(
            "language",
            &format!("unsupported language '{}', use en or zh", other),
        )),
    }
}

/// Ensure a site URL ends with a slash so paths can be appended
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
