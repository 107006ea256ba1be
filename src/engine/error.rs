//! Rejection reasons surfaced by the engine
//!
//! Every variant is recoverable: the controller leaves the committed store
//! untouched and hands the error back so the caller can explain the refusal.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{GraphError, GroupId, ItemId};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    #[error("Item {0} is locked")]
    Locked(ItemId),

    #[error("Moving item {moving} would displace locked item {locked}")]
    Blocked { moving: ItemId, locked: ItemId },

    #[error("No room to push item {0} inside the timeline")]
    BoundaryExceeded(ItemId),

    #[error("Overlapping items remain: {}", join_ids(.0))]
    ConflictRemains(Vec<ItemId>),

    #[error("Dependency {dependency} -> {item} would create a cycle")]
    CycleDetected { item: ItemId, dependency: ItemId },

    #[error("Item {0} would end before the current time")]
    Elapsed(ItemId),

    #[error("Invalid interval [{start}, {end}): must satisfy 0 <= start < end <= {domain}")]
    InvalidInterval { start: i64, end: i64, domain: i64 },

    #[error("Item {0} cannot depend on itself")]
    SelfDependency(ItemId),

    #[error("Item ID {0} is already taken")]
    DuplicateId(ItemId),

    #[error("Item ID {id} is outside the pool 1..={max}")]
    OutsidePool { id: ItemId, max: u32 },

    #[error("No free item ID left in 1..={0}")]
    PoolExhausted(u32),

    #[error("Unknown group: {0}")]
    UnknownGroup(GroupId),

    #[error("Lane {lane} out of range (group has {lanes} lanes)")]
    LaneOutOfRange { lane: u32, lanes: u32 },

    #[error("No drag in progress")]
    NoActiveDrag,
}

/// Machine-readable rejection code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotFound,
    Locked,
    Blocked,
    Boundary,
    Conflict,
    Cycle,
    Elapsed,
    Invalid,
    PoolExhausted,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NotFound => "not_found",
            RejectReason::Locked => "locked",
            RejectReason::Blocked => "blocked",
            RejectReason::Boundary => "boundary",
            RejectReason::Conflict => "conflict",
            RejectReason::Cycle => "cycle",
            RejectReason::Elapsed => "elapsed",
            RejectReason::Invalid => "invalid",
            RejectReason::PoolExhausted => "pool_exhausted",
        }
    }
}

impl EngineError {
    /// Returns the reason code for user feedback
    pub fn reason(&self) -> RejectReason {
        match self {
            EngineError::NotFound(_) => RejectReason::NotFound,
            EngineError::Locked(_) => RejectReason::Locked,
            EngineError::Blocked { .. } => RejectReason::Blocked,
            EngineError::BoundaryExceeded(_) => RejectReason::Boundary,
            EngineError::ConflictRemains(_) => RejectReason::Conflict,
            EngineError::CycleDetected { .. } => RejectReason::Cycle,
            EngineError::Elapsed(_) => RejectReason::Elapsed,
            EngineError::PoolExhausted(_) => RejectReason::PoolExhausted,
            EngineError::InvalidInterval { .. }
            | EngineError::SelfDependency(_)
            | EngineError::DuplicateId(_)
            | EngineError::OutsidePool { .. }
            | EngineError::UnknownGroup(_)
            | EngineError::LaneOutOfRange { .. }
            | EngineError::NoActiveDrag => RejectReason::Invalid,
        }
    }
}

impl From<GraphError> for EngineError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::CycleDetected(item, dependency) => {
                EngineError::CycleDetected { item, dependency }
            }
            GraphError::Cyclic(item) => EngineError::CycleDetected {
                item,
                dependency: item,
            },
            GraphError::ItemNotFound(id) => EngineError::NotFound(id),
            GraphError::SelfDependency(id) => EngineError::SelfDependency(id),
        }
    }
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
