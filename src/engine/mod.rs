//! Scheduling engine
//!
//! Pure, in-memory scheduling over a day's items: overlap detection,
//! push-reflow, dependency propagation and the transactional controller
//! that ties them together. No I/O happens here.

mod conflict;
mod error;
mod propagate;
mod reflow;
mod store;
mod transaction;

pub use conflict::{detect_conflicts, detect_conflicts_in, touched_buckets};
pub use error::{EngineError, RejectReason};
pub use propagate::{AnchorRecompute, Moved, Propagation, Propagator, RigidShift};
pub use reflow::push_within_lane;
pub use store::IntervalStore;
pub use transaction::{
    CommitOutcome, Controller, DragSession, EngineConfig, ItemPatch, NewItem, Preview,
};
