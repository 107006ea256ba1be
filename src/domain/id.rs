//! Identifiers for timeline items and groups
//!
//! ID Format:
//! - Item IDs: small positive integers drawn from a bounded pool (e.g., `7`, also accepted as `#7`)
//! - Group IDs: lowercase slugs from the group catalog (e.g., `design`, `backend-api`)
//!
//! Item IDs are allocated by [`IdPool`]: a requested ID is used when free,
//! otherwise the smallest free integer in `1..=max` is handed out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid item ID: expected a positive integer, got '{0}'")]
    InvalidItemId(String),

    #[error("Invalid group ID: expected a lowercase slug, got '{0}'")]
    InvalidGroupId(String),
}

/// Item ID, a positive integer unique within one timeline day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ItemId(u32);

impl ItemId {
    /// Creates an item ID, rejecting zero
    pub fn new(value: u32) -> Result<Self, IdError> {
        if value == 0 {
            return Err(IdError::InvalidItemId(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Returns the numeric value
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_prefix('#').unwrap_or(s);

        let value: u32 = digits
            .parse()
            .map_err(|_| IdError::InvalidItemId(s.to_string()))?;

        Self::new(value).map_err(|_| IdError::InvalidItemId(s.to_string()))
    }
}

impl TryFrom<u32> for ItemId {
    type Error = IdError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for u32 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

/// Group ID referencing an entry of the group catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(String);

impl GroupId {
    /// Returns the slug
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GroupId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let valid = !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

        if !valid {
            return Err(IdError::InvalidGroupId(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for GroupId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GroupId> for String {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

/// Bounded pool of item IDs (`1..=max`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPool {
    max: u32,
}

impl IdPool {
    pub fn new(max: u32) -> Self {
        Self { max }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Returns true if the ID lies inside the pool
    pub fn contains(&self, id: ItemId) -> bool {
        id.get() <= self.max
    }

    /// Allocates an ID: the requested one when free and inside the pool,
    /// otherwise the smallest free ID. Returns None when the pool is exhausted.
    pub fn allocate(&self, taken: &BTreeSet<ItemId>, requested: Option<ItemId>) -> Option<ItemId> {
        if let Some(id) = requested {
            if self.contains(id) && !taken.contains(&id) {
                return Some(id);
            }
        }

        (1..=self.max)
            .filter_map(|n| ItemId::new(n).ok())
            .find(|id| !taken.contains(id))
    }
}

impl Default for IdPool {
    fn default() -> Self {
        Self::new(100)
    }
}
