//! Transaction controller
//!
//! Owns the authoritative [`IntervalStore`] and is the only place that
//! writes it. Two modes:
//!
//! - **Preview**: places one item from raw input (pixels or minutes) into a
//!   copy of the store for conflict highlighting. Never pushes, never writes.
//! - **Commit**: push-reflow, conflict scan, "now" rule, propagation, final
//!   conflict scan, then a single [`IntervalStore::replace_all`]. Any failure
//!   returns an [`EngineError`] and leaves the store exactly as it was.
//!
//! Drags propagate with [`RigidShift`], explicit edits with [`AnchorRecompute`].

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{
    px_to_minutes, Dependencies, Dependency, DependencyGraph, GroupId, IdPool, Item, ItemId,
    Window,
};

use super::conflict::{detect_conflicts, detect_conflicts_in, touched_buckets};
use super::error::EngineError;
use super::propagate::{AnchorRecompute, Moved, Propagation, Propagator, RigidShift};
use super::reflow::push_within_lane;
use super::store::IntervalStore;

/// Narrowest drag handle in pixels, so short items stay grabbable
const MIN_HANDLE_PX: f64 = 10.0;

/// Static limits the controller enforces
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub window: Window,
    pub pool: IdPool,
    /// Lanes per group
    pub lanes: u32,
    /// Known groups; empty accepts any group
    pub groups: BTreeSet<GroupId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: Window::default(),
            pool: IdPool::default(),
            lanes: 3,
            groups: BTreeSet::new(),
        }
    }
}

/// Fields for a new item
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    /// Preferred ID; a taken or out-of-pool ID falls back to the smallest free one
    pub id: Option<ItemId>,
    pub title: String,
    pub group_id: GroupId,
    pub lane: u32,
    pub start_min: i64,
    pub end_min: i64,
    pub movable: bool,
    pub dependencies: Dependencies,
}

impl NewItem {
    pub fn new(group_id: GroupId, lane: u32, start_min: i64, end_min: i64) -> Self {
        Self {
            id: None,
            title: String::new(),
            group_id,
            lane,
            start_min,
            end_min,
            movable: true,
            dependencies: Dependencies::new(),
        }
    }
}

/// Partial update applied through [`Controller::edit_item`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub start_min: Option<i64>,
    /// New end; together with `start_min` this is an explicit resize
    pub end_min: Option<i64>,
    /// New ID, renamed across every dependency edge
    pub id: Option<ItemId>,
    /// Replacement dependency list
    pub dependencies: Option<Dependencies>,
    pub title: Option<String>,
}

impl ItemPatch {
    fn changes_time(&self) -> bool {
        self.start_min.is_some() || self.end_min.is_some()
    }
}

/// Result of an accepted commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitOutcome {
    pub item: ItemId,
    pub start_min: i64,
    pub end_min: i64,
    /// Same-lane items moved by push-reflow
    pub pushed: Vec<ItemId>,
    pub policy: &'static str,
    pub propagation: Propagation,
    /// The drop straddled "now" and was re-anchored at it
    pub reanchored_at_now: bool,
}

/// Speculative placement of one item
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub item: ItemId,
    pub start_min: i64,
    pub end_min: i64,
    pub items: Vec<Item>,
    pub conflicts: BTreeSet<ItemId>,
}

/// Pointer state of the single in-flight drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub item_id: ItemId,
    pub origin_left_px: f64,
    pub delta_px: f64,
    pub minute_px: f64,
    pub width_px: f64,
}

impl DragSession {
    /// Candidate start in minutes (before snapping)
    pub fn candidate_start(&self) -> i64 {
        px_to_minutes(self.origin_left_px + self.delta_px, self.minute_px)
    }
}

/// Single writer of the interval store
#[derive(Debug, Clone)]
pub struct Controller {
    store: IntervalStore,
    config: EngineConfig,
    drag: Option<DragSession>,
}

impl Controller {
    pub fn new(items: Vec<Item>, config: EngineConfig) -> Self {
        Self {
            store: IntervalStore::new(items),
            config,
            drag: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The authoritative item list
    pub fn committed_snapshot(&self) -> &[Item] {
        self.store.items()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.store.get(id)
    }

    pub fn into_items(self) -> Vec<Item> {
        self.store.into_items()
    }

    /// Conflicts to highlight: against the drag preview while one is active
    pub fn conflicted_ids(&self) -> BTreeSet<ItemId> {
        match self.drag_preview() {
            Some(preview) => preview.conflicts,
            None => detect_conflicts(self.store.items()),
        }
    }

    // ---- Preview ----

    /// Places `item_id` at `candidate_start` (snapped and anchored) in a copy of the store
    pub fn preview_move(&self, item_id: ItemId, candidate_start: i64) -> Result<Preview, EngineError> {
        let item = self.movable_item(item_id)?;
        let (start, end) = self.config.window.place(candidate_start, item.duration());

        let items: Vec<Item> = self
            .store
            .items()
            .iter()
            .map(|it| {
                if it.id == item_id {
                    it.moved_to(start)
                } else {
                    it.clone()
                }
            })
            .collect();
        let conflicts = detect_conflicts(&items);

        Ok(Preview {
            item: item_id,
            start_min: start,
            end_min: end,
            items,
            conflicts,
        })
    }

    /// Starts dragging an item whose left edge sits at `origin_left_px`
    pub fn begin_drag(
        &mut self,
        item_id: ItemId,
        origin_left_px: f64,
        minute_px: f64,
    ) -> Result<(), EngineError> {
        let item = self.movable_item(item_id)?;
        let width_px = (item.duration() as f64 * minute_px).max(MIN_HANDLE_PX);

        self.drag = Some(DragSession {
            item_id,
            origin_left_px,
            delta_px: 0.0,
            minute_px,
            width_px,
        });
        Ok(())
    }

    /// Updates the pointer offset, keeping the handle inside the timeline
    pub fn update_drag(&mut self, delta_px: f64) -> Result<Preview, EngineError> {
        let timeline_px = self.config.window.domain_minutes as f64;
        let session = self.drag.as_mut().ok_or(EngineError::NoActiveDrag)?;

        let max_left = (timeline_px * session.minute_px - session.width_px).max(0.0);
        let left = (session.origin_left_px + delta_px).clamp(0.0, max_left);
        session.delta_px = left - session.origin_left_px;

        let session = *session;
        self.preview_move(session.item_id, session.candidate_start())
    }

    /// The current drag session, if any
    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Preview for the active drag
    pub fn drag_preview(&self) -> Option<Preview> {
        let session = self.drag.as_ref()?;
        self.preview_move(session.item_id, session.candidate_start()).ok()
    }

    /// Drops the drag without committing
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Releases the drag and commits the drop. The session ends either way.
    pub fn end_drag(&mut self, now: Option<i64>) -> Result<CommitOutcome, EngineError> {
        let session = self.drag.take().ok_or(EngineError::NoActiveDrag)?;
        self.move_item(session.item_id, session.candidate_start(), now)
    }

    // ---- Commit ----

    /// Moves an item as a drop would: push-reflow in its lane, the "now" rule
    /// when `now` is given, then rigid-shift propagation.
    ///
    /// `now` is the current minute on this timeline's axis, or None when the
    /// timeline does not cover the present. A drop straddling `now` is pushed
    /// again from the pre-drop state, starting at the first grid minute at or
    /// after `now` (rounded up, so it never starts before the cursor).
    pub fn move_item(
        &mut self,
        item_id: ItemId,
        candidate_start: i64,
        now: Option<i64>,
    ) -> Result<CommitOutcome, EngineError> {
        let window = self.config.window;
        let before = self.store.items();
        self.movable_item(item_id)?;

        let mut next = push_within_lane(before, item_id, candidate_start, &window)?;
        ensure_no_conflicts(before, &next)?;

        let mut reanchored_at_now = false;
        if let Some(now) = now {
            let dropped = find(&next, item_id)?;

            if dropped.end_min < now {
                return Err(EngineError::Elapsed(item_id));
            }

            if dropped.start_min < now && now < dropped.end_min {
                next = push_within_lane(before, item_id, grid_at_or_after(&window, now), &window)?;
                ensure_no_conflicts(before, &next)?;
                reanchored_at_now = true;
            }
        }

        let moved = moved_between(before, &next, item_id);
        let propagation = RigidShift.propagate(&mut next, &moved, &window);
        ensure_no_conflicts(before, &next)?;

        let outcome = outcome_for(&next, item_id, &moved, &RigidShift, propagation, reanchored_at_now)?;
        self.store.replace_all(next);
        Ok(outcome)
    }

    /// Applies a partial edit. Time changes go through push-reflow and
    /// anchor-recompute propagation; ID changes rename every edge.
    pub fn edit_item(&mut self, item_id: ItemId, patch: ItemPatch) -> Result<CommitOutcome, EngineError> {
        let window = self.config.window;
        let before = self.store.items();
        if !self.store.contains(item_id) {
            return Err(EngineError::NotFound(item_id));
        }

        let mut working = before.to_vec();
        let mut target = item_id;

        if let Some(new_id) = patch.id.filter(|new_id| *new_id != item_id) {
            self.check_free_id(new_id)?;
            rename_in(&mut working, item_id, new_id);
            target = new_id;
        }

        let idx = position(&working, target)?;

        if let Some(title) = &patch.title {
            working[idx].title = title.clone();
        }

        if let Some(deps) = &patch.dependencies {
            working[idx].dependencies = Dependencies::new();
            let mut graph = DependencyGraph::from_items(working.iter());
            for dep in deps {
                graph.add_dependency(target, dep.item, dep.lag)?;
            }
            working[idx].dependencies = deps.clone();
        }

        if !patch.changes_time() {
            let item = working[idx].clone();
            self.store.replace_all(working);
            return Ok(CommitOutcome {
                item: target,
                start_min: item.start_min,
                end_min: item.end_min,
                pushed: vec![],
                policy: AnchorRecompute.name(),
                propagation: Propagation::default(),
                reanchored_at_now: false,
            });
        }

        let current = &working[idx];
        if current.is_locked() {
            return Err(EngineError::Locked(target));
        }

        let start = patch
            .start_min
            .map(|s| window.snap(s))
            .unwrap_or(current.start_min);
        let end = match patch.end_min {
            Some(e) => window.snap(e),
            None => start + current.duration(),
        };
        if !window.contains_span(start, end) {
            return Err(EngineError::InvalidInterval {
                start,
                end,
                domain: window.domain_minutes,
            });
        }

        // Explicit resize: the new duration is what the push preserves
        working[idx].end_min = working[idx].start_min + (end - start);

        let mut next = push_within_lane(&working, target, start, &window)?;
        ensure_no_conflicts(before, &next)?;

        let moved = moved_between(&working, &next, target);
        let propagation = AnchorRecompute.propagate(&mut next, &moved, &window);
        ensure_no_conflicts(before, &next)?;

        let outcome = outcome_for(&next, target, &moved, &AnchorRecompute, propagation, false)?;
        self.store.replace_all(next);
        Ok(outcome)
    }

    /// Renames an item and rewrites every dependency edge pointing at it
    pub fn rename_item(&mut self, old: ItemId, new: ItemId) -> Result<CommitOutcome, EngineError> {
        self.edit_item(
            old,
            ItemPatch {
                id: Some(new),
                ..ItemPatch::default()
            },
        )
    }

    /// Inserts a new item without reflowing anything around it.
    ///
    /// An overlap with existing items is allowed and shows up in
    /// [`Controller::conflicted_ids`].
    pub fn create_item(&mut self, new: NewItem) -> Result<ItemId, EngineError> {
        let window = self.config.window;

        if !self.config.groups.is_empty() && !self.config.groups.contains(&new.group_id) {
            return Err(EngineError::UnknownGroup(new.group_id));
        }
        if new.lane >= self.config.lanes {
            return Err(EngineError::LaneOutOfRange {
                lane: new.lane,
                lanes: self.config.lanes,
            });
        }

        let start = window.snap(new.start_min);
        let end = window.snap(new.end_min);
        if !window.contains_span(start, end) {
            return Err(EngineError::InvalidInterval {
                start,
                end,
                domain: window.domain_minutes,
            });
        }

        let id = self
            .config
            .pool
            .allocate(&self.store.ids(), new.id)
            .ok_or(EngineError::PoolExhausted(self.config.pool.max()))?;

        let mut graph = DependencyGraph::from_items(self.store.items());
        graph.add_item(id);
        for dep in &new.dependencies {
            graph.add_dependency(id, dep.item, dep.lag)?;
        }

        let mut item = Item::new(id, new.group_id, new.lane, start, end).with_title(new.title);
        item.movable = new.movable;
        item.dependencies = new.dependencies;

        let mut next = self.store.items().to_vec();
        next.push(item);
        self.store.replace_all(next);
        Ok(id)
    }

    /// Adds (or updates the lag of) a dependency edge, refusing cycles
    pub fn link(&mut self, item_id: ItemId, dependency: ItemId, lag: u32) -> Result<(), EngineError> {
        let mut graph = DependencyGraph::from_items(self.store.items());
        graph.add_dependency(item_id, dependency, lag)?;

        let mut next = self.store.items().to_vec();
        let idx = position(&next, item_id)?;
        next[idx].dependencies.set(Dependency::new(dependency, lag));
        self.store.replace_all(next);
        Ok(())
    }

    /// Removes a dependency edge, returns false if it did not exist
    pub fn unlink(&mut self, item_id: ItemId, dependency: ItemId) -> Result<bool, EngineError> {
        let mut next = self.store.items().to_vec();
        let idx = position(&next, item_id)?;
        if !next[idx].dependencies.remove(dependency) {
            return Ok(false);
        }
        self.store.replace_all(next);
        Ok(true)
    }

    fn movable_item(&self, item_id: ItemId) -> Result<&Item, EngineError> {
        let item = self.store.get(item_id).ok_or(EngineError::NotFound(item_id))?;
        if item.is_locked() {
            return Err(EngineError::Locked(item_id));
        }
        Ok(item)
    }

    fn check_free_id(&self, id: ItemId) -> Result<(), EngineError> {
        if !self.config.pool.contains(id) {
            return Err(EngineError::OutsidePool {
                id,
                max: self.config.pool.max(),
            });
        }
        if self.store.contains(id) {
            return Err(EngineError::DuplicateId(id));
        }
        Ok(())
    }
}

/// Rejects the state if any bucket the transaction touched holds an overlap
fn ensure_no_conflicts(before: &[Item], next: &[Item]) -> Result<(), EngineError> {
    let touched = touched_buckets(before, next);
    let conflicts = detect_conflicts_in(next, &touched);
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(EngineError::ConflictRemains(conflicts.into_iter().collect()))
    }
}

/// The primary item first, then every other item whose span changed
fn moved_between(before: &[Item], after: &[Item], primary: ItemId) -> Vec<Moved> {
    let mut moved = Vec::new();

    if let Some(old) = before.iter().find(|item| item.id == primary) {
        moved.push(Moved {
            id: primary,
            previous_start: old.start_min,
        });
    }

    for (old, new) in before.iter().zip(after.iter()) {
        if old.id != primary && old.id == new.id && !old.same_span(new) {
            moved.push(Moved {
                id: old.id,
                previous_start: old.start_min,
            });
        }
    }

    moved
}

fn outcome_for(
    next: &[Item],
    item_id: ItemId,
    moved: &[Moved],
    policy: &dyn Propagator,
    propagation: Propagation,
    reanchored_at_now: bool,
) -> Result<CommitOutcome, EngineError> {
    let item = find(next, item_id)?;
    Ok(CommitOutcome {
        item: item_id,
        start_min: item.start_min,
        end_min: item.end_min,
        pushed: moved.iter().map(|m| m.id).filter(|id| *id != item_id).collect(),
        policy: policy.name(),
        propagation,
        reanchored_at_now,
    })
}

fn rename_in(items: &mut [Item], old: ItemId, new: ItemId) {
    for item in items.iter_mut() {
        if item.id == old {
            item.id = new;
        }
        item.dependencies.rename(old, new);
    }
}

fn find(items: &[Item], id: ItemId) -> Result<&Item, EngineError> {
    items
        .iter()
        .find(|item| item.id == id)
        .ok_or(EngineError::NotFound(id))
}

fn position(items: &[Item], id: ItemId) -> Result<usize, EngineError> {
    items
        .iter()
        .position(|item| item.id == id)
        .ok_or(EngineError::NotFound(id))
}

/// First grid minute at or after `minute`
fn grid_at_or_after(window: &Window, minute: i64) -> i64 {
    let snap = window.snap_minutes.max(1);
    minute.div_euclid(snap) * snap + if minute.rem_euclid(snap) == 0 { 0 } else { snap }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TWO_DAY_MINUTES;
    use proptest::prelude::*;

    fn id(n: u32) -> ItemId {
        ItemId::new(n).unwrap()
    }

    fn group() -> GroupId {
        "g".parse().unwrap()
    }

    fn item(n: u32, lane: u32, start: i64, end: i64) -> Item {
        Item::new(id(n), group(), lane, start, end)
    }

    fn span(ctl: &Controller, n: u32) -> (i64, i64) {
        let it = ctl.get(id(n)).unwrap();
        (it.start_min, it.end_min)
    }

    fn controller(items: Vec<Item>) -> Controller {
        Controller::new(items, EngineConfig::default())
    }

    #[test]
    fn drop_pushes_next_item() {
        let mut ctl = controller(vec![item(1, 0, 0, 60), item(2, 0, 60, 120)]);

        let outcome = ctl.move_item(id(1), 30, None).unwrap();

        assert_eq!(span(&ctl, 1), (30, 90));
        assert_eq!(span(&ctl, 2), (90, 150));
        assert_eq!(outcome.pushed, vec![id(2)]);
        assert_eq!(outcome.policy, "rigid-shift");
    }

    #[test]
    fn blocked_drop_leaves_store_unchanged() {
        let items = vec![item(1, 0, 0, 60), item(2, 0, 60, 120).locked()];
        let mut ctl = controller(items.clone());

        let err = ctl.move_item(id(1), 30, None).unwrap_err();

        assert_eq!(err.reason().as_str(), "blocked");
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    #[test]
    fn locked_item_cannot_be_moved() {
        let mut ctl = controller(vec![item(1, 0, 0, 60).locked()]);
        assert_eq!(ctl.move_item(id(1), 30, None), Err(EngineError::Locked(id(1))));
        assert_eq!(ctl.begin_drag(id(1), 0.0, 1.0), Err(EngineError::Locked(id(1))));
    }

    #[test]
    fn overlap_with_earlier_item_is_rejected() {
        // 2 starts before the drop point, so it is not pushed and the drop conflicts
        let items = vec![item(1, 0, 300, 360), item(2, 0, 100, 160)];
        let mut ctl = controller(items.clone());

        let err = ctl.move_item(id(1), 120, None).unwrap_err();

        assert_eq!(err, EngineError::ConflictRemains(vec![id(1), id(2)]));
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    #[test]
    fn conflicts_in_untouched_buckets_do_not_block() {
        let mut ctl = controller(vec![
            item(1, 0, 0, 60),
            item(2, 1, 0, 60),
            item(3, 1, 30, 90),
        ]);

        ctl.move_item(id(1), 200, None).unwrap();
        assert_eq!(span(&ctl, 1), (200, 260));
    }

    #[test]
    fn drag_carries_dependents() {
        let mut ctl = controller(vec![
            item(1, 0, 0, 60),
            item(2, 1, 100, 130).depends_on(id(1), 10),
        ]);

        let outcome = ctl.move_item(id(1), 45, None).unwrap();

        assert_eq!(span(&ctl, 2), (145, 175));
        assert_eq!(outcome.propagation.shifted, vec![id(2)]);
    }

    #[test]
    fn propagation_conflict_rolls_back() {
        // Dependent 2 would be shifted onto 3 in lane 1
        let items = vec![
            item(1, 0, 0, 60),
            item(2, 1, 100, 130).depends_on(id(1), 0),
            item(3, 1, 140, 200),
        ];
        let mut ctl = controller(items.clone());

        let err = ctl.move_item(id(1), 30, None).unwrap_err();

        assert_eq!(err.reason().as_str(), "conflict");
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    #[test]
    fn drop_entirely_in_the_past_is_rejected() {
        let items = vec![item(1, 0, 600, 660)];
        let mut ctl = controller(items.clone());

        let err = ctl.move_item(id(1), 100, Some(600)).unwrap_err();

        assert_eq!(err, EngineError::Elapsed(id(1)));
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    #[test]
    fn drop_straddling_now_is_reanchored() {
        let mut ctl = controller(vec![item(1, 0, 600, 660), item(2, 0, 700, 760)]);

        let outcome = ctl.move_item(id(1), 480, Some(502)).unwrap();

        assert!(outcome.reanchored_at_now);
        assert_eq!(span(&ctl, 1), (505, 565));
    }

    #[test]
    fn reanchor_failure_aborts_commit() {
        // Re-anchoring at now pushes 2 into locked 3
        let items = vec![
            item(1, 0, 900, 960),
            item(2, 0, 560, 600),
            item(3, 0, 600, 700).locked(),
        ];
        let mut ctl = controller(items.clone());

        let err = ctl.move_item(id(1), 480, Some(502)).unwrap_err();

        assert_eq!(err.reason().as_str(), "blocked");
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    #[test]
    fn drop_after_now_is_untouched_by_rule() {
        let mut ctl = controller(vec![item(1, 0, 0, 60)]);

        let outcome = ctl.move_item(id(1), 700, Some(600)).unwrap();

        assert!(!outcome.reanchored_at_now);
        assert_eq!(span(&ctl, 1), (700, 760));
    }

    #[test]
    fn preview_never_writes() {
        let items = vec![item(1, 0, 0, 60), item(2, 0, 60, 120)];
        let ctl = controller(items.clone());

        let preview = ctl.preview_move(id(1), 32).unwrap();

        assert_eq!((preview.start_min, preview.end_min), (30, 90));
        assert_eq!(preview.conflicts.len(), 2);
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
        assert!(ctl.conflicted_ids().is_empty());
    }

    #[test]
    fn pixel_drag_session() {
        let mut ctl = controller(vec![item(1, 0, 0, 60), item(2, 0, 60, 120)]);

        // Half a pixel per minute: 15px is 30 minutes
        ctl.begin_drag(id(1), 0.0, 0.5).unwrap();
        let preview = ctl.update_drag(15.0).unwrap();
        assert_eq!((preview.start_min, preview.end_min), (30, 90));
        assert_eq!(ctl.conflicted_ids().len(), 2);

        let outcome = ctl.end_drag(None).unwrap();
        assert_eq!((outcome.start_min, outcome.end_min), (30, 90));
        assert_eq!(span(&ctl, 2), (90, 150));
        assert!(ctl.drag_session().is_none());
        assert!(ctl.conflicted_ids().is_empty());
    }

    #[test]
    fn drag_is_clamped_to_timeline() {
        let mut ctl = controller(vec![item(1, 0, 0, 60)]);
        ctl.begin_drag(id(1), 0.0, 1.0).unwrap();

        let preview = ctl.update_drag(5000.0).unwrap();
        assert_eq!((preview.start_min, preview.end_min), (1380, 1440));

        let preview = ctl.update_drag(-50.0).unwrap();
        assert_eq!(preview.start_min, 0);

        ctl.cancel_drag();
        assert_eq!(ctl.end_drag(None), Err(EngineError::NoActiveDrag));
    }

    #[test]
    fn edit_recomputes_dependents_with_lag() {
        // C depends on A with lag 10; A is edited to end at 90
        let mut ctl = controller(vec![
            item(1, 0, 0, 60),
            item(3, 1, 300, 345).depends_on(id(1), 10),
        ]);

        let patch = ItemPatch {
            start_min: Some(30),
            end_min: Some(90),
            ..ItemPatch::default()
        };
        let outcome = ctl.edit_item(id(1), patch).unwrap();

        assert_eq!(span(&ctl, 3), (100, 145));
        assert_eq!(outcome.policy, "anchor-recompute");
    }

    #[test]
    fn edit_resize_pushes_following_items() {
        let mut ctl = controller(vec![item(1, 0, 0, 60), item(2, 0, 60, 120)]);

        let patch = ItemPatch {
            end_min: Some(90),
            ..ItemPatch::default()
        };
        ctl.edit_item(id(1), patch).unwrap();

        assert_eq!(span(&ctl, 1), (0, 90));
        assert_eq!(span(&ctl, 2), (90, 150));
    }

    #[test]
    fn edit_rejects_invalid_interval() {
        let items = vec![item(1, 0, 0, 60)];
        let mut ctl = controller(items.clone());

        let patch = ItemPatch {
            start_min: Some(100),
            end_min: Some(50),
            ..ItemPatch::default()
        };
        let err = ctl.edit_item(id(1), patch).unwrap_err();

        assert!(matches!(err, EngineError::InvalidInterval { .. }));
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    #[test]
    fn edit_times_of_locked_item_is_refused() {
        let mut ctl = controller(vec![item(1, 0, 0, 60).locked()]);
        let patch = ItemPatch {
            start_min: Some(100),
            ..ItemPatch::default()
        };
        assert_eq!(ctl.edit_item(id(1), patch), Err(EngineError::Locked(id(1))));
    }

    #[test]
    fn edit_dependencies_refuses_cycle() {
        let items = vec![item(1, 0, 0, 60), item(2, 1, 100, 130).depends_on(id(1), 0)];
        let mut ctl = controller(items.clone());

        let patch = ItemPatch {
            dependencies: Some([Dependency::immediate(id(2))].into_iter().collect()),
            ..ItemPatch::default()
        };
        let err = ctl.edit_item(id(1), patch).unwrap_err();

        assert_eq!(err.reason().as_str(), "cycle");
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    #[test]
    fn rename_rewrites_edges() {
        let mut ctl = controller(vec![
            item(1, 0, 0, 60),
            item(2, 1, 100, 130).depends_on(id(1), 15),
            item(3, 2, 100, 130).depends_on(id(1), 0).depends_on(id(2), 5),
        ]);

        ctl.rename_item(id(1), id(42)).unwrap();

        assert!(ctl.get(id(1)).is_none());
        assert!(ctl.get(id(42)).is_some());
        assert_eq!(ctl.get(id(2)).unwrap().dependencies.lag_for(id(42)), Some(15));
        assert!(ctl.get(id(3)).unwrap().dependencies.contains(id(42)));
        assert!(ctl.get(id(3)).unwrap().dependencies.contains(id(2)));
    }

    #[test]
    fn rename_to_taken_id_fails() {
        let items = vec![item(1, 0, 0, 60), item(2, 1, 0, 60)];
        let mut ctl = controller(items.clone());

        assert_eq!(ctl.rename_item(id(1), id(2)), Err(EngineError::DuplicateId(id(2))));
        assert!(matches!(
            ctl.rename_item(id(1), id(500)),
            Err(EngineError::OutsidePool { .. })
        ));
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    #[test]
    fn create_allocates_smallest_free_id() {
        let mut ctl = controller(vec![item(1, 0, 0, 60), item(3, 0, 60, 120)]);

        let requested_taken = NewItem {
            id: Some(id(3)),
            ..NewItem::new(group(), 1, 0, 30)
        };
        assert_eq!(ctl.create_item(requested_taken), Ok(id(2)));

        let requested_free = NewItem {
            id: Some(id(9)),
            ..NewItem::new(group(), 1, 30, 60)
        };
        assert_eq!(ctl.create_item(requested_free), Ok(id(9)));
        assert_eq!(ctl.create_item(NewItem::new(group(), 2, 0, 10)), Ok(id(4)));
    }

    #[test]
    fn create_does_not_reflow() {
        let mut ctl = controller(vec![item(1, 0, 0, 60)]);

        let new_id = ctl.create_item(NewItem::new(group(), 0, 30, 90)).unwrap();

        assert_eq!(span(&ctl, 1), (0, 60));
        let conflicts: Vec<_> = ctl.conflicted_ids().into_iter().collect();
        assert_eq!(conflicts, vec![id(1), new_id]);
    }

    #[test]
    fn create_validates_input() {
        let config = EngineConfig {
            pool: IdPool::new(1),
            groups: [group()].into_iter().collect(),
            ..EngineConfig::default()
        };
        let mut ctl = Controller::new(vec![], config);

        let unknown = NewItem::new("nope".parse().unwrap(), 0, 0, 30);
        assert!(matches!(ctl.create_item(unknown), Err(EngineError::UnknownGroup(_))));

        let lane = NewItem::new(group(), 3, 0, 30);
        assert!(matches!(ctl.create_item(lane), Err(EngineError::LaneOutOfRange { .. })));

        let past_end = NewItem::new(group(), 0, 1430, 1500);
        assert!(matches!(ctl.create_item(past_end), Err(EngineError::InvalidInterval { .. })));

        let dangling = NewItem {
            dependencies: [Dependency::immediate(id(1))].into_iter().collect(),
            ..NewItem::new(group(), 0, 0, 30)
        };
        // The only free ID is 1, which would then depend on itself
        assert_eq!(ctl.create_item(dangling), Err(EngineError::SelfDependency(id(1))));

        ctl.create_item(NewItem::new(group(), 0, 0, 30)).unwrap();
        assert_eq!(
            ctl.create_item(NewItem::new(group(), 0, 30, 60)),
            Err(EngineError::PoolExhausted(1))
        );
    }

    #[test]
    fn link_and_unlink() {
        let mut ctl = controller(vec![item(1, 0, 0, 60), item(2, 1, 100, 130)]);

        ctl.link(id(2), id(1), 20).unwrap();
        assert_eq!(ctl.get(id(2)).unwrap().dependencies.lag_for(id(1)), Some(20));

        let err = ctl.link(id(1), id(2), 0).unwrap_err();
        assert_eq!(
            err,
            EngineError::CycleDetected {
                item: id(1),
                dependency: id(2)
            }
        );

        assert_eq!(ctl.unlink(id(2), id(1)), Ok(true));
        assert_eq!(ctl.unlink(id(2), id(1)), Ok(false));
        assert_eq!(ctl.unlink(id(9), id(1)), Err(EngineError::NotFound(id(9))));
    }

    #[test]
    fn extreme_candidates_are_anchored() {
        let mut ctl = controller(vec![item(1, 0, 100, 160)]);

        ctl.move_item(id(1), i64::MAX, None).unwrap();
        assert_eq!(span(&ctl, 1), (1380, 1440));

        ctl.move_item(id(1), i64::MIN, None).unwrap();
        assert_eq!(span(&ctl, 1), (0, 60));

        let preview = ctl.preview_move(id(1), i64::MAX).unwrap();
        assert_eq!((preview.start_min, preview.end_min), (1380, 1440));
    }

    #[test]
    fn push_rounding_back_into_overlap_is_rejected() {
        // 1 ends at 67 after the drop; 2 is pushed to snap(67) = 65
        let items = vec![item(1, 0, 0, 37), item(2, 0, 40, 100)];
        let mut ctl = controller(items.clone());

        let err = ctl.move_item(id(1), 30, None).unwrap_err();

        assert_eq!(err, EngineError::ConflictRemains(vec![id(1), id(2)]));
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    fn cyclic_store() -> Vec<Item> {
        vec![
            item(1, 0, 0, 60).depends_on(id(2), 0),
            item(2, 1, 100, 130).depends_on(id(1), 0),
            item(3, 2, 0, 30),
            item(4, 2, 60, 90),
        ]
    }

    #[test]
    fn loaded_cycle_does_not_block_unrelated_edges() {
        let mut ctl = controller(cyclic_store());

        ctl.link(id(4), id(3), 0).unwrap();
        assert_eq!(ctl.get(id(4)).unwrap().dependencies.lag_for(id(3)), Some(0));

        let patch = ItemPatch {
            dependencies: Some([Dependency::new(id(1), 5)].into_iter().collect()),
            ..ItemPatch::default()
        };
        ctl.edit_item(id(3), patch).unwrap();

        let mut new = NewItem::new(group(), 2, 200, 230);
        new.dependencies = [Dependency::immediate(id(2))].into_iter().collect();
        ctl.create_item(new).unwrap();

        // Edges that close a new cycle are still refused
        let err = ctl.link(id(3), id(4), 0).unwrap_err();
        assert_eq!(err.reason().as_str(), "cycle");
    }

    #[test]
    fn commit_over_loaded_cycle_terminates() {
        let mut ctl = controller(cyclic_store());

        let outcome = ctl.move_item(id(1), 30, None).unwrap();

        assert_eq!(span(&ctl, 1), (30, 90));
        assert_eq!(span(&ctl, 2), (130, 160));
        assert_eq!(outcome.propagation.shifted, vec![id(2)]);
        assert_eq!(outcome.propagation.revisited, vec![id(1)]);
    }

    #[test]
    fn edit_with_rename_and_new_times() {
        let mut ctl = controller(vec![
            item(1, 0, 0, 60),
            item(2, 0, 60, 120),
            item(3, 1, 300, 345).depends_on(id(1), 10),
        ]);

        let patch = ItemPatch {
            id: Some(id(9)),
            start_min: Some(30),
            end_min: Some(90),
            ..ItemPatch::default()
        };
        let outcome = ctl.edit_item(id(1), patch).unwrap();

        assert_eq!(outcome.item, id(9));
        assert_eq!(outcome.pushed, vec![id(2)]);
        assert!(ctl.get(id(1)).is_none());
        assert_eq!(span(&ctl, 9), (30, 90));
        assert_eq!(span(&ctl, 2), (90, 150));
        assert_eq!(span(&ctl, 3), (100, 145));
        assert_eq!(ctl.get(id(3)).unwrap().dependencies.lag_for(id(9)), Some(10));
    }

    #[test]
    fn rejected_edit_with_rename_keeps_old_id() {
        let items = vec![item(1, 0, 0, 60), item(2, 0, 100, 160).locked()];
        let mut ctl = controller(items.clone());

        let patch = ItemPatch {
            id: Some(id(9)),
            start_min: Some(80),
            end_min: Some(140),
            ..ItemPatch::default()
        };
        let err = ctl.edit_item(id(1), patch).unwrap_err();

        assert_eq!(err.reason().as_str(), "blocked");
        assert_eq!(ctl.committed_snapshot(), items.as_slice());
    }

    #[test]
    fn two_day_window_allows_late_moves() {
        let config = EngineConfig {
            window: Window::new(TWO_DAY_MINUTES, 5),
            ..EngineConfig::default()
        };
        let mut ctl = Controller::new(vec![item(1, 0, 0, 60)], config);

        ctl.move_item(id(1), 2000, None).unwrap();
        assert_eq!(span(&ctl, 1), (2000, 2060));
    }

    fn lane_strategy() -> impl Strategy<Value = Vec<Item>> {
        prop::collection::vec((0i64..60, 5i64..120, any::<bool>()), 2..8).prop_map(|layout| {
            let mut cursor = 0;
            let mut items = Vec::new();
            for (i, (gap, len, locked)) in layout.into_iter().enumerate() {
                let start = cursor + gap;
                let mut it = item(i as u32 + 1, 0, start, start + len);
                if locked {
                    it = it.locked();
                }
                cursor = start + len;
                items.push(it);
            }
            items
        })
    }

    proptest! {
        /// Property: a rejected move leaves the store untouched, an accepted
        /// one leaves the lane free of overlaps
        #[test]
        fn prop_move_is_atomic(
            items in lane_strategy(),
            target in 1u32..8,
            candidate in -60i64..1500,
            now in prop::option::of(0i64..1440),
        ) {
            let target = id(target.min(items.len() as u32));
            let mut ctl = controller(items.clone());

            match ctl.move_item(target, candidate, now) {
                Err(_) => prop_assert_eq!(ctl.committed_snapshot(), items.as_slice()),
                Ok(_) => {
                    prop_assert!(detect_conflicts(ctl.committed_snapshot()).is_empty());
                    for (before, after) in items.iter().zip(ctl.committed_snapshot()) {
                        prop_assert_eq!(before.duration(), after.duration());
                    }
                }
            }
        }
    }

    #[test]
    fn grid_rounding_for_now() {
        let w = Window::default();
        assert_eq!(grid_at_or_after(&w, 500), 500);
        assert_eq!(grid_at_or_after(&w, 501), 505);
        assert_eq!(grid_at_or_after(&w, 504), 505);
    }
}
