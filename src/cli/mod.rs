//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init`, `groups` |
//! | Item | Scheduling | `item add`, `item move`, `item edit`, `item dep` |
//! | Query | Day state | `item list`, `item preview`, `conflicts` |
//!
//! Every command works on one day, chosen with `--date` (default: today).
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! Rejected moves and edits report a reason code such as `blocked` or `conflict`.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! laneline --verbose item move 3 10:30
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod item;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
