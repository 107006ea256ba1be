//! Dependency propagation
//!
//! After a transaction moves some items, their dependents are repositioned
//! transitively. Two policies exist and they give different results for the
//! same input, so they stay separate implementations of [`Propagator`]:
//!
//! | Policy | Trigger | Dependent placement |
//! |--------|---------|---------------------|
//! | [`RigidShift`] | drag | translated by the source's delta |
//! | [`AnchorRecompute`] | explicit edit | `snap(source.end + lag)` |
//!
//! Both walk breadth-first with a visited set keyed by item ID, so every item
//! is processed at most once per pass and a cyclic graph still terminates.
//! Locked dependents are skipped and nothing propagates through them.
//! Durations never change; placement anchors at the domain edges. The walk may
//! leave overlaps behind, the controller's final conflict scan catches those.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::domain::{DependencyGraph, Item, ItemId, Window};

/// An item repositioned earlier in the transaction, with its start before the move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moved {
    pub id: ItemId,
    pub previous_start: i64,
}

/// What a propagation pass did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Propagation {
    /// Dependents whose span changed
    pub shifted: Vec<ItemId>,
    /// Dependents reached again after being processed (cycle or converging paths)
    pub revisited: Vec<ItemId>,
    /// Locked dependents left in place
    pub skipped_locked: Vec<ItemId>,
}

impl Propagation {
    pub fn is_empty(&self) -> bool {
        self.shifted.is_empty() && self.revisited.is_empty() && self.skipped_locked.is_empty()
    }
}

/// A strategy placing a dependent after its source moved
pub trait Propagator {
    /// Short policy name for diagnostics
    fn name(&self) -> &'static str;

    /// Computes the dependent's new `(start, end)`.
    ///
    /// `source` is already at its new position, `delta` is the signed shift
    /// carried from the seed item.
    fn reposition(
        &self,
        source: &Item,
        dependent: &Item,
        lag: u32,
        delta: i64,
        window: &Window,
    ) -> (i64, i64);

    /// Cascades from the moved items through the dependency graph
    fn propagate(&self, items: &mut [Item], moved: &[Moved], window: &Window) -> Propagation {
        cascade(self, items, moved, window)
    }
}

/// Translates dependents by the same delta as the dragged item, ignoring lag
#[derive(Debug, Clone, Copy, Default)]
pub struct RigidShift;

impl Propagator for RigidShift {
    fn name(&self) -> &'static str {
        "rigid-shift"
    }

    fn reposition(
        &self,
        _source: &Item,
        dependent: &Item,
        _lag: u32,
        delta: i64,
        window: &Window,
    ) -> (i64, i64) {
        window.anchor(dependent.start_min + delta, dependent.duration())
    }
}

/// Starts each dependent at the snapped end of its source plus the edge lag
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorRecompute;

impl Propagator for AnchorRecompute {
    fn name(&self) -> &'static str {
        "anchor-recompute"
    }

    fn reposition(
        &self,
        source: &Item,
        dependent: &Item,
        lag: u32,
        _delta: i64,
        window: &Window,
    ) -> (i64, i64) {
        let start = window.snap(source.end_min + i64::from(lag));
        window.anchor(start, dependent.duration())
    }
}

fn cascade<P: Propagator + ?Sized>(
    policy: &P,
    items: &mut [Item],
    moved: &[Moved],
    window: &Window,
) -> Propagation {
    let graph = DependencyGraph::from_items(items.iter());
    let index: HashMap<ItemId, usize> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| (item.id, idx))
        .collect();

    let mut visited: HashSet<ItemId> = moved.iter().map(|m| m.id).collect();
    let mut queue: VecDeque<(ItemId, i64)> = moved
        .iter()
        .filter_map(|m| {
            let idx = *index.get(&m.id)?;
            Some((m.id, items[idx].start_min - m.previous_start))
        })
        .collect();

    let mut shifted = Vec::new();
    let mut revisited = BTreeSet::new();
    let mut skipped_locked = Vec::new();

    while let Some((source_id, delta)) = queue.pop_front() {
        let Some(&source_idx) = index.get(&source_id) else {
            continue;
        };
        let source = items[source_idx].clone();

        for (dependent_id, lag) in graph.dependents(source_id) {
            if !visited.insert(dependent_id) {
                revisited.insert(dependent_id);
                continue;
            }
            let Some(&idx) = index.get(&dependent_id) else {
                continue;
            };

            if items[idx].is_locked() {
                skipped_locked.push(dependent_id);
                continue;
            }

            let (start, end) = policy.reposition(&source, &items[idx], lag, delta, window);
            let dependent = &mut items[idx];
            if dependent.start_min != start || dependent.end_min != end {
                dependent.start_min = start;
                dependent.end_min = end;
                shifted.push(dependent_id);
            }

            queue.push_back((dependent_id, delta));
        }
    }

    Propagation {
        shifted,
        revisited: revisited.into_iter().collect(),
        skipped_locked,
    }
}
