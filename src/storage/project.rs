//! Project management
//!
//! Handles project initialization and provides access to stores.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use thiserror::Error;

use super::config::PROJECT_DIR;
use super::{Config, DayStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a laneline project. Run 'laneline init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# laneline configuration

[timeline]
# Grid granularity for placement, in minutes
snap_minutes = 5
# Visible axis length: 1440 (one day) or 2880 (two days)
domain_minutes = 1440
# Lanes per group
lanes = 3
# Item IDs are allocated from 1..=id_pool
id_pool = 100

[[groups]]
id = "design"
title = "Design"

[[groups]]
id = "build"
title = "Build"

[[groups]]
id = "ops"
title = "Operations"
"#;

const DEFAULT_GITIGNORE: &str = r#"# Ignore interrupted writes
days/*.tmp
"#;

/// A laneline project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let project_dir = root.join(PROJECT_DIR);

        let days_dir = project_dir.join("days");
        fs::create_dir_all(&days_dir)
            .with_context(|| format!("Failed to create days directory: {}", days_dir.display()))?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = project_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, DEFAULT_GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .laneline directory path
    pub fn project_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the store holding `date`
    pub fn day_store(&self, date: NaiveDate) -> DayStore {
        DayStore::for_day(&self.root, date)
    }
}
