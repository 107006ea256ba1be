//! Main CLI application structure

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use super::item;
use super::output::{Output, OutputFormat};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "laneline")]
#[command(author, version, about = "Lane-based day timeline with push-reflow scheduling")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Day to work on (YYYY-MM-DD, defaults to today)
    #[arg(long, short = 'd', global = true, env = "LANELINE_DATE")]
    pub date: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new laneline project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// List the group catalog
    Groups,

    /// Manage timeline items
    #[command(subcommand)]
    Item(item::ItemCommands),

    /// List items that overlap another item in their lane
    Conflicts,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format,
    };
    let output = Output::new(format, cli.verbose);

    output.verbose("laneline starting");

    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created .laneline directory at: {}", project.project_dir().display()),
            );
            output.success(&format!("Initialized laneline project at {}", project.root().display()));
        }

        Commands::Groups => list_groups(&output)?,

        Commands::Item(cmd) => {
            output.verbose_ctx("item", &format!("Working on {}", date));
            item::run(cmd, &output, date)?
        }

        Commands::Conflicts => {
            output.verbose_ctx("conflicts", &format!("Scanning {}", date));
            item::conflicts(&output, date)?
        }
    }

    output.verbose("Command completed successfully");
    Ok(())
}

fn list_groups(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let config = &project.config().project;

    if output.is_json() {
        output.data(&serde_json::json!({
            "lanes": config.timeline.lanes,
            "groups": config.groups,
        }));
    } else if config.groups.is_empty() {
        println!("No groups configured (any group ID is accepted)");
    } else {
        println!("{:<16} {:<6} TITLE", "ID", "LANES");
        println!("{}", "-".repeat(40));
        for group in &config.groups {
            println!("{:<16} {:<6} {}", group.id.to_string(), config.timeline.lanes, group.title);
        }
    }

    Ok(())
}
