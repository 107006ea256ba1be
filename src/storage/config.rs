//! Configuration handling for laneline
//!
//! Configuration is stored in `.laneline/config.toml` (project) and
//! `~/.config/laneline/config.toml` (global).

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{GroupId, IdPool, Window, DAY_MINUTES, DEFAULT_SNAP_MINUTES, TWO_DAY_MINUTES};
use crate::engine::EngineConfig;

/// Name of the per-project directory
pub const PROJECT_DIR: &str = ".laneline";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Timeline geometry and limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Grid granularity in minutes
    pub snap_minutes: i64,

    /// Length of the visible axis: 1440 (one day) or 2880 (two days)
    pub domain_minutes: i64,

    /// Lanes per group
    pub lanes: u32,

    /// Item IDs are drawn from `1..=id_pool`
    pub id_pool: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            snap_minutes: DEFAULT_SNAP_MINUTES,
            domain_minutes: DAY_MINUTES,
            lanes: 3,
            id_pool: 100,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snap_minutes <= 0 {
            return Err(ConfigError::Invalid(format!(
                "snap_minutes must be positive, got {}",
                self.snap_minutes
            )));
        }
        if self.domain_minutes != DAY_MINUTES && self.domain_minutes != TWO_DAY_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "domain_minutes must be {} or {}, got {}",
                DAY_MINUTES, TWO_DAY_MINUTES, self.domain_minutes
            )));
        }
        if self.lanes == 0 {
            return Err(ConfigError::Invalid("lanes must be at least 1".to_string()));
        }
        if self.id_pool == 0 {
            return Err(ConfigError::Invalid("id_pool must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn window(&self) -> Window {
        Window::new(self.domain_minutes, self.snap_minutes)
    }
}

/// One entry of the group catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupConfig {
    pub id: GroupId,

    #[serde(default)]
    pub title: String,
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    pub timeline: TimelineConfig,

    /// Known groups; an empty catalog accepts any group
    pub groups: Vec<GroupConfig>,
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeline.validate()?;

        let mut seen = BTreeSet::new();
        for group in &self.groups {
            if !seen.insert(&group.id) {
                return Err(ConfigError::Invalid(format!(
                    "group '{}' is declared twice",
                    group.id
                )));
            }
        }
        Ok(())
    }

    /// Limits handed to the scheduling engine
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            window: self.timeline.window(),
            pool: IdPool::new(self.timeline.id_pool),
            lanes: self.timeline.lanes,
            groups: self.groups.iter().map(|g| g.id.clone()).collect(),
        }
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format, stored in the global config and overridable with `--format`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "laneline", "laneline").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads and validates project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", config_path.display()))?;

        Ok(config)
    }

    /// Finds the project root by looking for a `.laneline/` directory
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(current)
    }

    /// Walks up from `start` looking for a `.laneline/` directory
    pub fn find_project_root_from(start: PathBuf) -> Option<PathBuf> {
        let mut current = start;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}
