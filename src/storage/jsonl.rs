//! JSONL storage for timeline days
//!
//! Each day lives in `.laneline/days/YYYY-MM-DD.jsonl` with one item per line.
//! Uses file locking for concurrent access safety.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use fs2::FileExt;

use crate::domain::Item;

use super::config::PROJECT_DIR;

/// Store for one day's items in JSONL format
pub struct DayStore {
    path: PathBuf,
}

impl DayStore {
    /// Creates a new day store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the store for `date` inside a project
    pub fn for_day(project_root: &Path, date: NaiveDate) -> Self {
        Self::new(
            project_root
                .join(PROJECT_DIR)
                .join("days")
                .join(format!("{}.jsonl", date.format("%Y-%m-%d"))),
        )
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all items; a missing file is an empty day
    pub fn read_all(&self) -> Result<Vec<Item>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open day file: {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on day file")?;

        let reader = BufReader::new(&file);
        let mut items = Vec::new();
        let mut seen = HashSet::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let item: Item = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse item at line {}", line_num + 1))?;

            if !seen.insert(item.id) {
                bail!(
                    "Duplicate item {} at line {} of {}",
                    item.id,
                    line_num + 1,
                    self.path.display()
                );
            }

            items.push(item);
        }

        // Lock is released when file is dropped
        Ok(items)
    }

    /// Writes all items (full rewrite, sorted by ID)
    pub fn write_all(&self, items: &[Item]) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .context("Failed to acquire write lock on day file")?;

            let mut writer = BufWriter::new(&file);

            let mut sorted: Vec<_> = items.iter().collect();
            sorted.sort_by_key(|item| item.id);

            for item in sorted {
                let line = serde_json::to_string(item).context("Failed to serialize item")?;
                writeln!(writer, "{}", line).context("Failed to write item")?;
            }

            writer.flush().context("Failed to flush day file")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }
}
