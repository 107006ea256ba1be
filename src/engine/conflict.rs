//! Conflict detection
//!
//! Items are partitioned by bucket and swept in start order. For each item
//! the scan stops at the first later item starting at or after its end, so
//! the cost is `O(n log n + n * k)` per bucket with `k` the local overlap
//! fan-out.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::{Bucket, Item, ItemId};

/// Returns the IDs of every item overlapping another item in its bucket
pub fn detect_conflicts(items: &[Item]) -> BTreeSet<ItemId> {
    let mut conflicted = BTreeSet::new();
    for bucket in partition(items.iter()).into_values() {
        sweep(bucket, &mut conflicted);
    }
    conflicted
}

/// Same as [`detect_conflicts`], restricted to the given buckets
pub fn detect_conflicts_in(items: &[Item], buckets: &BTreeSet<Bucket>) -> BTreeSet<ItemId> {
    let mut conflicted = BTreeSet::new();
    let selected = items.iter().filter(|item| buckets.contains(&item.bucket()));
    for bucket in partition(selected).into_values() {
        sweep(bucket, &mut conflicted);
    }
    conflicted
}

/// Buckets holding an item that is new or whose span changed between `before` and `after`
pub fn touched_buckets(before: &[Item], after: &[Item]) -> BTreeSet<Bucket> {
    let previous: HashMap<ItemId, &Item> = before.iter().map(|item| (item.id, item)).collect();

    let mut touched = BTreeSet::new();
    for item in after {
        match previous.get(&item.id) {
            Some(old) if old.same_span(item) && old.same_bucket(item) => {}
            Some(old) => {
                touched.insert(old.bucket());
                touched.insert(item.bucket());
            }
            None => {
                touched.insert(item.bucket());
            }
        }
    }
    touched
}

fn partition<'a>(items: impl Iterator<Item = &'a Item>) -> BTreeMap<Bucket, Vec<&'a Item>> {
    let mut buckets: BTreeMap<Bucket, Vec<&Item>> = BTreeMap::new();
    for item in items {
        buckets.entry(item.bucket()).or_default().push(item);
    }
    buckets
}

fn sweep(mut bucket: Vec<&Item>, conflicted: &mut BTreeSet<ItemId>) {
    bucket.sort_by_key(|item| item.start_min);

    for (i, a) in bucket.iter().enumerate() {
        for b in &bucket[i + 1..] {
            if b.start_min >= a.end_min {
                break;
            }
            if a.overlaps(b) {
                conflicted.insert(a.id);
                conflicted.insert(b.id);
            }
        }
    }
}
