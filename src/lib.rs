//! laneline - a lane-based day timeline with push-reflow scheduling
//!
//! Items sit in `(group, lane)` buckets on a one- or two-day minute axis.
//! Dropping an item pushes the items after it in its lane, dependents follow
//! along, and every change is committed atomically or not at all.

pub mod domain;
pub mod engine;
pub mod storage;
pub mod cli;

pub use domain::{Dependency, GroupId, Item, ItemId, Window};
pub use engine::{Controller, EngineConfig, EngineError};
