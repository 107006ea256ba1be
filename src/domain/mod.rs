//! Domain models for laneline
//!
//! Contains the timeline vocabulary without any I/O concerns.

mod id;
mod item;
mod graph;
mod time;

pub use id::{GroupId, IdError, IdPool, ItemId};
pub use item::{spans_overlap, Bucket, Dependencies, Dependency, Item};
pub use graph::{DependencyGraph, GraphError};
pub use time::{
    parse_clock, px_to_minutes, Clock, TimeError, Window, DAY_MINUTES, DEFAULT_SNAP_MINUTES,
    TWO_DAY_MINUTES,
};
