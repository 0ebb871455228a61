/// Application configuration management
/// Stores user preferences in ~/.config/syskit/config.toml

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::actions::ProcessMatcher;
use crate::core::process_view::SortKey;
use crate::utils::constants::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tick period, humantime syntax ("1s", "500ms")
    pub refresh_interval: String,
    /// Maximum rows shown in the process table
    pub display_limit: usize,
    /// Initial table order: "cpu", "mem" or "pid"
    pub sort_key: SortKey,
    /// Command run by the kill key; `{pid}` is substituted
    pub kill_command: String,
    pub disk_mount: String,
    pub proc_root: String,
    pub exclude_interfaces: Vec<String>,
    pub thresholds: Thresholds,
    pub actions: Vec<ActionConfig>,
}

/// Gauge colouring thresholds in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu: f64,
    pub ram: f64,
    pub disk: f64,
}

/// One `[[actions]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub name: String,
    /// Process name, `*`/`any`, or a glob such as `python*`
    pub process: String,
    pub cpu_threshold: f64,
    pub action: String,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: DEFAULT_THRESHOLD,
            ram: DEFAULT_THRESHOLD,
            disk: DEFAULT_THRESHOLD,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL.to_string(),
            display_limit: DEFAULT_DISPLAY_LIMIT,
            sort_key: SortKey::default(),
            kill_command: DEFAULT_KILL_COMMAND.to_string(),
            disk_mount: DEFAULT_DISK_MOUNT.to_string(),
            proc_root: DEFAULT_PROC_ROOT.to_string(),
            exclude_interfaces: Vec::new(),
            thresholds: Thresholds::default(),
            actions: vec![ActionConfig {
                name: "Kill High CPU Python".to_string(),
                process: "python".to_string(),
                cpu_threshold: DEFAULT_THRESHOLD,
                action: DEFAULT_KILL_COMMAND.to_string(),
            }],
        }
    }
}

impl AppConfig {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine the user config directory")?
            .join(CONFIG_DIR_NAME);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            // Create directory if it doesn't exist
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    /// Parsed `refresh_interval`
    pub fn refresh_interval(&self) -> Result<Duration> {
        let interval = humantime::parse_duration(self.refresh_interval.trim())
            .with_context(|| format!("Invalid refresh_interval '{}'", self.refresh_interval))?;
        if interval.is_zero() {
            bail!("refresh_interval must be greater than zero");
        }
        Ok(interval)
    }

    /// Every problem found in the configuration; empty when valid
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Err(e) = self.refresh_interval() {
            problems.push(format!("{:#}", e));
        }
        if self.display_limit == 0 {
            problems.push("display_limit must be at least 1".to_string());
        }
        if !self.kill_command.contains("{pid}") {
            problems.push("kill_command has no {pid} placeholder".to_string());
        }

        for (label, value) in [
            ("thresholds.cpu", self.thresholds.cpu),
            ("thresholds.ram", self.thresholds.ram),
            ("thresholds.disk", self.thresholds.disk),
        ] {
            if !is_percent(value) {
                problems.push(format!("{} must be between 0 and 100, got {}", label, value));
            }
        }

        for (index, rule) in self.actions.iter().enumerate() {
            let label = if rule.name.trim().is_empty() {
                problems.push(format!("actions[{}] has an empty name", index));
                format!("actions[{}]", index)
            } else {
                format!("action '{}'", rule.name)
            };

            if rule.action.trim().is_empty() {
                problems.push(format!("{} has no command", label));
            }
            if !is_percent(rule.cpu_threshold) {
                problems.push(format!(
                    "{} cpu_threshold must be between 0 and 100, got {}",
                    label, rule.cpu_threshold
                ));
            }
            if let Err(e) = ProcessMatcher::parse(&rule.process) {
                problems.push(format!("{}: {:#}", label, e));
            }
        }

        problems
    }
}

fn is_percent(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}
