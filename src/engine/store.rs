//! Interval store
//!
//! The authoritative item set. Holds no policy: validation lives in the
//! conflict detector and mutation policy in the reflow engine. The only
//! mutation is a whole-set swap.

use std::collections::BTreeSet;

use crate::domain::{GroupId, Item, ItemId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalStore {
    items: Vec<Item>,
}

impl IntervalStore {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Looks up an item by ID
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Returns true if an item with this ID exists
    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// All items in stable order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Replaces the whole item set at once
    pub fn replace_all(&mut self, items: Vec<Item>) {
        self.items = items;
    }

    /// Items in one `(group, lane)` bucket
    pub fn filter_by_bucket<'a>(
        &'a self,
        group_id: &'a GroupId,
        lane: u32,
    ) -> impl Iterator<Item = &'a Item> + 'a {
        self.items
            .iter()
            .filter(move |item| &item.group_id == group_id && item.lane == lane)
    }

    /// IDs currently in use
    pub fn ids(&self) -> BTreeSet<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}
