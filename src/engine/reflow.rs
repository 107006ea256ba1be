//! Push-reflow within one lane
//!
//! Places a dragged item at a candidate start and pushes the movable items
//! after it to the right until nothing in the bucket overlaps. The cascade
//! is single-pass, forward-only and duration-preserving:
//!
//! - only items starting at or after the new start are considered
//! - items are never reordered
//! - a locked item in the way rejects the whole push
//! - an item that would be pushed past the domain end rejects the whole push
//!
//! A pushed item starts at the cursor rounded to the nearest grid minute.
//! When the cursor is off-grid that can round back into the previous item;
//! the overlap is returned as-is and the caller's conflict scan rejects it.
//!
//! The input slice is never touched; a rejection simply discards the copy.

use crate::domain::{Item, ItemId, Window};

use super::error::EngineError;

/// Moves `dragged_id` to `candidate_start` (snapped and anchored) and pushes
/// the rest of its bucket forward.
///
/// Returns the complete next item set, in the input order.
pub fn push_within_lane(
    items: &[Item],
    dragged_id: ItemId,
    candidate_start: i64,
    window: &Window,
) -> Result<Vec<Item>, EngineError> {
    let dragged_idx = items
        .iter()
        .position(|item| item.id == dragged_id)
        .ok_or(EngineError::NotFound(dragged_id))?;
    let dragged = &items[dragged_idx];

    let (start, end) = window.place(candidate_start, dragged.duration());

    let mut next = items.to_vec();
    next[dragged_idx].start_min = start;
    next[dragged_idx].end_min = end;

    let mut tail: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            item.id != dragged_id && item.same_bucket(dragged) && item.start_min >= start
        })
        .map(|(idx, _)| idx)
        .collect();
    tail.sort_by_key(|&idx| (items[idx].start_min, items[idx].id));

    let mut cursor_end = end;
    for idx in tail {
        let current = &next[idx];

        if current.start_min >= cursor_end {
            // Stays put, but nothing later may be pushed into its span
            cursor_end = cursor_end.max(current.end_min);
            continue;
        }

        if current.is_locked() {
            return Err(EngineError::Blocked {
                moving: dragged_id,
                locked: current.id,
            });
        }

        let new_start = window.snap(cursor_end);
        let new_end = new_start + current.duration();
        if new_end > window.domain_minutes {
            return Err(EngineError::BoundaryExceeded(current.id));
        }

        next[idx].start_min = new_start;
        next[idx].end_min = new_end;
        cursor_end = new_end;
    }

    Ok(next)
}
