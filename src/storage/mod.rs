//! # Storage Layer
//!
//! Persistence layer for laneline with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Items of a day | JSONL (one JSON per line) | `.laneline/days/YYYY-MM-DD.jsonl` |
//! | Config | TOML | `.laneline/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`DayStore`] reads under a shared lock and writes under an exclusive lock (`fs2`)
//! - All writes are atomic (temp file + rename)
//!
//! ## Project Structure
//!
//! ```text
//! .laneline/
//! ├── days/
//! │   └── 2024-03-09.jsonl  # Items scheduled on that day
//! ├── config.toml           # Timeline geometry and group catalog
//! └── .gitignore
//! ```

mod config;
mod jsonl;
mod project;

pub use config::{
    Config, ConfigError, GlobalConfig, GroupConfig, OutputFormat, ProjectConfig, TimelineConfig,
    PROJECT_DIR,
};
pub use jsonl::DayStore;
pub use project::{Project, ProjectError};
