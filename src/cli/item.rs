//! Item CLI commands

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::Subcommand;

use super::output::Output;
use crate::domain::{
    parse_clock, Clock, Dependencies, Dependency, DependencyGraph, GroupId, Item, ItemId, Window,
};
use crate::engine::{CommitOutcome, Controller, EngineError, ItemPatch, NewItem};
use crate::storage::{DayStore, Project};

#[derive(Subcommand)]
pub enum ItemCommands {
    /// Add an item to the day
    ///
    /// Examples:
    ///   laneline item add design 09:00 10:30 --title "Wireframes"
    ///   laneline item add ops 14:00 14:45 --lane 1 --locked
    ///   laneline item add build 11:00 12:00 --after 3+15
    Add {
        /// Group ID from the catalog
        group: GroupId,

        /// Start time (HH:MM or minutes)
        start: String,

        /// End time (HH:MM or minutes)
        end: String,

        /// Lane inside the group
        #[arg(long, default_value = "0")]
        lane: u32,

        /// Display title
        #[arg(long, short)]
        title: Option<String>,

        /// Preferred ID (a taken ID falls back to the smallest free one)
        #[arg(long)]
        id: Option<ItemId>,

        /// Never relocate this item
        #[arg(long)]
        locked: bool,

        /// Dependency as ID or ID+LAG in minutes (repeatable)
        #[arg(long, value_name = "ID[+LAG]")]
        after: Vec<String>,
    },

    /// List items of the day
    List {
        /// Only show one group
        #[arg(long)]
        group: Option<GroupId>,
    },

    /// Show item details
    Show {
        /// Item ID
        id: ItemId,
    },

    /// Move an item like a drop: push the lane, then shift dependents rigidly
    Move {
        /// Item ID
        id: ItemId,

        /// New start time (HH:MM or minutes)
        start: String,

        /// Current time for the elapsed check (defaults to the local clock)
        #[arg(long)]
        now: Option<String>,
    },

    /// Drag an item by a pixel offset, then drop it
    Drag {
        /// Item ID
        id: ItemId,

        /// Horizontal pointer offset in pixels
        #[arg(allow_negative_numbers = true)]
        delta_px: f64,

        /// Pixels per minute on the rendered axis
        #[arg(long, default_value = "1.0")]
        minute_px: f64,

        /// Current time for the elapsed check (defaults to the local clock)
        #[arg(long)]
        now: Option<String>,
    },

    /// Show where a move would land and what it would overlap, without saving
    Preview {
        /// Item ID
        id: ItemId,

        /// Candidate start time (HH:MM or minutes)
        start: String,
    },

    /// Edit times, title, ID or dependencies; dependents are re-anchored
    Edit {
        /// Item ID
        id: ItemId,

        /// New start time
        #[arg(long)]
        start: Option<String>,

        /// New end time (resizes the item)
        #[arg(long)]
        end: Option<String>,

        /// New title
        #[arg(long, short)]
        title: Option<String>,

        /// New ID, rewritten in every dependency
        #[arg(long)]
        new_id: Option<ItemId>,

        /// Replacement dependency as ID or ID+LAG (repeatable)
        #[arg(long, value_name = "ID[+LAG]")]
        dep: Vec<String>,

        /// Remove all dependencies
        #[arg(long, conflicts_with = "dep")]
        clear_deps: bool,
    },

    /// Change an item's ID and every reference to it
    Rename {
        /// Current ID
        id: ItemId,

        /// New ID
        new_id: ItemId,
    },

    /// Add a dependency between items
    Dep {
        /// Item that must wait
        item: ItemId,

        /// Item that must end first
        depends_on: ItemId,

        /// Minimum gap in minutes
        #[arg(long, default_value = "0")]
        lag: u32,
    },

    /// Remove a dependency
    Undep {
        /// Item that waits
        item: ItemId,

        /// Dependency to remove
        depends_on: ItemId,
    },
}

pub fn run(cmd: ItemCommands, output: &Output, date: NaiveDate) -> Result<()> {
    match cmd {
        ItemCommands::Add {
            group,
            start,
            end,
            lane,
            title,
            id,
            locked,
            after,
        } => {
            let new = NewItem {
                id,
                title: title.unwrap_or_default(),
                group_id: group,
                lane,
                start_min: parse_clock(&start)?,
                end_min: parse_clock(&end)?,
                movable: !locked,
                dependencies: parse_dependencies(&after)?,
            };
            add_item(output, date, new)
        }
        ItemCommands::List { group } => list_items(output, date, group.as_ref()),
        ItemCommands::Show { id } => show_item(output, date, id),
        ItemCommands::Move { id, start, now } => {
            move_item(output, date, id, &start, now.as_deref())
        }
        ItemCommands::Drag {
            id,
            delta_px,
            minute_px,
            now,
        } => drag_item(output, date, id, delta_px, minute_px, now.as_deref()),
        ItemCommands::Preview { id, start } => preview_item(output, date, id, &start),
        ItemCommands::Edit {
            id,
            start,
            end,
            title,
            new_id,
            dep,
            clear_deps,
        } => {
            let dependencies = if clear_deps || !dep.is_empty() {
                Some(parse_dependencies(&dep)?)
            } else {
                None
            };
            let patch = ItemPatch {
                start_min: start.as_deref().map(parse_clock).transpose()?,
                end_min: end.as_deref().map(parse_clock).transpose()?,
                id: new_id,
                dependencies,
                title,
            };
            edit_item(output, date, id, patch)
        }
        ItemCommands::Rename { id, new_id } => rename_item(output, date, id, new_id),
        ItemCommands::Dep {
            item,
            depends_on,
            lag,
        } => add_dependency(output, date, item, depends_on, lag),
        ItemCommands::Undep { item, depends_on } => {
            remove_dependency(output, date, item, depends_on)
        }
    }
}

/// One day's items loaded into the engine
struct Day {
    store: DayStore,
    controller: Controller,
}

impl Day {
    fn open(output: &Output, date: NaiveDate) -> Result<Self> {
        let project = Project::open_current()?;
        let store = project.day_store(date);
        let items = store.read_all()?;

        output.verbose_ctx(
            "store",
            &format!("Loaded {} items from {}", items.len(), store.path().display()),
        );

        if let Err(e) = DependencyGraph::from_items(&items).check_acyclic() {
            output.warn(&format!("{}; propagation visits each item at most once", e));
        }

        let controller = Controller::new(items, project.config().project.engine_config());
        Ok(Self { store, controller })
    }

    fn window(&self) -> Window {
        self.controller.config().window
    }

    fn item(&self, id: ItemId) -> Result<&Item> {
        self.controller
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Item not found: {}", id))
    }

    fn save(&self, output: &Output) -> Result<()> {
        self.store.write_all(self.controller.committed_snapshot())?;
        output.verbose_ctx(
            "store",
            &format!(
                "Wrote {} items to {}",
                self.controller.committed_snapshot().len(),
                self.store.path().display()
            ),
        );
        Ok(())
    }
}

fn add_item(output: &Output, date: NaiveDate, new: NewItem) -> Result<()> {
    let mut day = Day::open(output, date)?;

    let id = day
        .controller
        .create_item(new)
        .map_err(|e| rejected(output, "add", e))?;
    day.save(output)?;

    let conflicted = day.controller.conflicted_ids().contains(&id);
    let item = day.item(id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "item": item,
            "conflicted": conflicted,
        }));
    } else {
        output.success(&format!(
            "Created item {}: {} in {}",
            item.id,
            span(item),
            item.bucket()
        ));
        if conflicted {
            println!("Warning: item {} overlaps another item in its lane", item.id);
        }
    }

    Ok(())
}

fn list_items(output: &Output, date: NaiveDate, group: Option<&GroupId>) -> Result<()> {
    let day = Day::open(output, date)?;
    let conflicts = day.controller.conflicted_ids();

    let mut items: Vec<&Item> = day
        .controller
        .committed_snapshot()
        .iter()
        .filter(|item| group.map_or(true, |g| &item.group_id == g))
        .collect();
    items.sort_by(|a, b| {
        (&a.group_id, a.lane, a.start_min, a.id).cmp(&(&b.group_id, b.lane, b.start_min, b.id))
    });

    if output.is_json() {
        let rows: Vec<_> = items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "id": item.id,
                    "title": item.title,
                    "group": item.group_id,
                    "lane": item.lane,
                    "start": item.start_min,
                    "end": item.end_min,
                    "movable": item.movable,
                    "dependencies": item.dependencies,
                    "conflicted": conflicts.contains(&item.id),
                })
            })
            .collect();
        output.data(&rows);
    } else if items.is_empty() {
        println!("No items on {}", date);
    } else {
        println!("{:<5} {:<16} {:<12} {:<6} TITLE", "ID", "LANE", "TIME", "FLAGS");
        println!("{}", "-".repeat(60));

        for item in items {
            let mut flags = String::new();
            if item.is_locked() {
                flags.push('L');
            }
            if conflicts.contains(&item.id) {
                flags.push('!');
            }
            println!(
                "{:<5} {:<16} {:<12} {:<6} {}",
                item.id.to_string(),
                item.bucket().to_string(),
                span(item),
                flags,
                item.title
            );
        }
    }

    Ok(())
}

fn show_item(output: &Output, date: NaiveDate, id: ItemId) -> Result<()> {
    let day = Day::open(output, date)?;
    let item = day.item(id)?;

    let graph = DependencyGraph::from_items(day.controller.committed_snapshot());
    let dependents = graph.dependents(id);
    let conflicted = day.controller.conflicted_ids().contains(&id);

    if output.is_json() {
        output.data(&serde_json::json!({
            "item": item,
            "dependents": dependents
                .iter()
                .map(|(dep, lag)| serde_json::json!({ "item": dep, "lag": lag }))
                .collect::<Vec<_>>(),
            "conflicted": conflicted,
        }));
    } else {
        println!("Item: {}", item.id);
        if !item.title.is_empty() {
            println!("Title: {}", item.title);
        }
        println!("Lane: {}", item.bucket());
        println!("Time: {} ({} min)", span(item), item.duration());
        println!("Locked: {}", if item.is_locked() { "yes" } else { "no" });

        if !item.dependencies.is_empty() {
            println!("\nDepends on:");
            for dep in &item.dependencies {
                let state = match day.controller.get(dep.item) {
                    Some(other) => span(other),
                    None => "missing".to_string(),
                };
                println!("  {} (lag {} min, {})", dep.item, dep.lag, state);
            }
        }

        if !dependents.is_empty() {
            println!("\nDependents:");
            for (dependent, lag) in &dependents {
                println!("  {} (lag {} min)", dependent, lag);
            }
        }

        if conflicted {
            println!("\nStatus: CONFLICT (overlaps another item in its lane)");
        }
    }

    Ok(())
}

fn move_item(
    output: &Output,
    date: NaiveDate,
    id: ItemId,
    start: &str,
    now: Option<&str>,
) -> Result<()> {
    let mut day = Day::open(output, date)?;
    let candidate = parse_clock(start)?;
    let now = now_minute(date, &day.window(), now)?;

    output.verbose_ctx(
        "move",
        &format!(
            "Item {} to candidate {}, now {}",
            id,
            Clock(candidate),
            now.map(|m| Clock(m).to_string()).unwrap_or_else(|| "outside window".to_string())
        ),
    );

    let outcome = day
        .controller
        .move_item(id, candidate, now)
        .map_err(|e| rejected(output, "move", e))?;
    day.save(output)?;

    report(output, "move", &outcome);
    Ok(())
}

fn drag_item(
    output: &Output,
    date: NaiveDate,
    id: ItemId,
    delta_px: f64,
    minute_px: f64,
    now: Option<&str>,
) -> Result<()> {
    if minute_px <= 0.0 {
        bail!("--minute-px must be positive, got {}", minute_px);
    }

    let mut day = Day::open(output, date)?;
    let now = now_minute(date, &day.window(), now)?;
    let origin_left_px = day.item(id)?.start_min as f64 * minute_px;

    day.controller
        .begin_drag(id, origin_left_px, minute_px)
        .map_err(|e| rejected(output, "drag", e))?;

    let preview = day
        .controller
        .update_drag(delta_px)
        .map_err(|e| rejected(output, "drag", e))?;
    output.verbose_ctx(
        "drag",
        &format!(
            "Preview {}-{} with {} conflicted items",
            Clock(preview.start_min),
            Clock(preview.end_min),
            preview.conflicts.len()
        ),
    );

    let outcome = day
        .controller
        .end_drag(now)
        .map_err(|e| rejected(output, "drag", e))?;
    day.save(output)?;

    report(output, "drag", &outcome);
    Ok(())
}

fn preview_item(output: &Output, date: NaiveDate, id: ItemId, start: &str) -> Result<()> {
    let day = Day::open(output, date)?;
    let candidate = parse_clock(start)?;

    let preview = day
        .controller
        .preview_move(id, candidate)
        .map_err(|e| rejected(output, "preview", e))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "item": preview.item,
            "start": preview.start_min,
            "end": preview.end_min,
            "conflicts": preview.conflicts,
        }));
    } else {
        println!(
            "Item {} would land at {}-{}",
            preview.item,
            Clock(preview.start_min),
            Clock(preview.end_min)
        );
        if preview.conflicts.is_empty() {
            println!("No conflicts");
        } else {
            println!("Conflicts: {}", join_ids(preview.conflicts.iter()));
        }
    }

    Ok(())
}

fn edit_item(output: &Output, date: NaiveDate, id: ItemId, patch: ItemPatch) -> Result<()> {
    if patch == ItemPatch::default() {
        bail!("Nothing to edit. Pass --start, --end, --title, --new-id, --dep or --clear-deps");
    }

    let mut day = Day::open(output, date)?;
    let outcome = day
        .controller
        .edit_item(id, patch)
        .map_err(|e| rejected(output, "edit", e))?;
    day.save(output)?;

    report(output, "edit", &outcome);
    Ok(())
}

fn rename_item(output: &Output, date: NaiveDate, id: ItemId, new_id: ItemId) -> Result<()> {
    let mut day = Day::open(output, date)?;
    day.controller
        .rename_item(id, new_id)
        .map_err(|e| rejected(output, "rename", e))?;
    day.save(output)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "old_id": id,
            "new_id": new_id,
        }));
    } else {
        output.success(&format!("Renamed item {} to {}", id, new_id));
    }

    Ok(())
}

fn add_dependency(
    output: &Output,
    date: NaiveDate,
    item: ItemId,
    depends_on: ItemId,
    lag: u32,
) -> Result<()> {
    let mut day = Day::open(output, date)?;
    day.controller
        .link(item, depends_on, lag)
        .map_err(|e| rejected(output, "dep", e))?;
    day.save(output)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "item": item,
            "depends_on": depends_on,
            "lag": lag,
        }));
    } else {
        output.success(&format!(
            "{} now depends on {} (lag {} min)",
            item, depends_on, lag
        ));
    }

    Ok(())
}

fn remove_dependency(output: &Output, date: NaiveDate, item: ItemId, depends_on: ItemId) -> Result<()> {
    let mut day = Day::open(output, date)?;
    let removed = day
        .controller
        .unlink(item, depends_on)
        .map_err(|e| rejected(output, "undep", e))?;

    if removed {
        day.save(output)?;
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "item": item,
            "depends_on": depends_on,
            "removed": removed,
        }));
    } else if removed {
        output.success(&format!("{} no longer depends on {}", item, depends_on));
    } else {
        output.success(&format!("{} does not depend on {}", item, depends_on));
    }

    Ok(())
}

/// Lists the conflicted items of a day
pub fn conflicts(output: &Output, date: NaiveDate) -> Result<()> {
    let day = Day::open(output, date)?;
    let conflicts = day.controller.conflicted_ids();

    if output.is_json() {
        output.data(&serde_json::json!({
            "date": date.to_string(),
            "conflicts": conflicts,
        }));
    } else if conflicts.is_empty() {
        println!("No conflicts on {}", date);
    } else {
        println!("{:<5} {:<16} TIME", "ID", "LANE");
        println!("{}", "-".repeat(40));
        for id in &conflicts {
            let item = day.item(*id)?;
            println!("{:<5} {:<16} {}", item.id.to_string(), item.bucket().to_string(), span(item));
        }
    }

    Ok(())
}

/// Logs the side effects of a commit and prints the result
fn report(output: &Output, action: &str, outcome: &CommitOutcome) {
    if !outcome.pushed.is_empty() {
        output.verbose_ctx(
            action,
            &format!("Push-reflow moved {}", join_ids(outcome.pushed.iter())),
        );
    }
    for id in &outcome.propagation.skipped_locked {
        output.verbose_ctx(action, &format!("Locked dependent {} left in place", id));
    }
    for id in &outcome.propagation.revisited {
        output.verbose_ctx(
            action,
            &format!("Dependent {} reached more than once, kept first placement", id),
        );
    }

    if output.is_json() {
        output.data(outcome);
        return;
    }

    output.success(&format!(
        "Item {} now at {}-{}",
        outcome.item,
        Clock(outcome.start_min),
        Clock(outcome.end_min)
    ));
    if outcome.reanchored_at_now {
        println!("Re-anchored at the current time");
    }
    if !outcome.pushed.is_empty() {
        println!("Pushed: {}", join_ids(outcome.pushed.iter()));
    }
    if !outcome.propagation.shifted.is_empty() {
        println!(
            "Dependents ({}): {}",
            outcome.policy,
            join_ids(outcome.propagation.shifted.iter())
        );
    }
}

/// Wraps an engine rejection with its reason code
fn rejected(output: &Output, action: &str, err: EngineError) -> anyhow::Error {
    let reason = err.reason();
    output.verbose_ctx(action, &format!("Rejected with reason '{}'", reason.as_str()));

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": false,
            "reason": reason,
            "error": err.to_string(),
        }));
    }

    anyhow::Error::new(err).context(format!("{} rejected ({})", action, reason.as_str()))
}

/// Minute of "now" on the timeline of `date`, or None when it falls outside the window
fn now_minute(date: NaiveDate, window: &Window, explicit: Option<&str>) -> Result<Option<i64>> {
    if let Some(clock) = explicit {
        return Ok(Some(parse_clock(clock)?));
    }

    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("Failed to compute start of day")?;
    let minutes = (Local::now().naive_local() - midnight).num_minutes();

    Ok((0..window.domain_minutes).contains(&minutes).then_some(minutes))
}

fn parse_dependencies(args: &[String]) -> Result<Dependencies> {
    args.iter().map(|arg| parse_dependency(arg)).collect()
}

/// Parses `ID` or `ID+LAG`
fn parse_dependency(arg: &str) -> Result<Dependency> {
    let (id, lag) = match arg.split_once('+') {
        Some((id, lag)) => {
            let lag: u32 = lag
                .trim()
                .parse()
                .with_context(|| format!("Invalid lag in dependency '{}'", arg))?;
            (id, lag)
        }
        None => (arg, 0),
    };

    let id: ItemId = id.trim().parse()?;
    Ok(Dependency::new(id, lag))
}

fn span(item: &Item) -> String {
    format!("{}-{}", Clock(item.start_min), Clock(item.end_min))
}

fn join_ids<'a>(ids: impl Iterator<Item = &'a ItemId>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}
