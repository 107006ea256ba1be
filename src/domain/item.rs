//! Item domain model
//!
//! Items are the time-boxed units of work placed on the timeline.
//! Each item occupies `[start_min, end_min)` inside one lane of one group
//! and can depend on other items with a minimum lag.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::id::{GroupId, ItemId};

/// A dependency edge: the owning item starts no earlier than `item.end + lag`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// The item this depends on
    pub item: ItemId,
    /// Minimum gap in minutes after the dependency ends
    #[serde(default)]
    pub lag: u32,
}

impl Dependency {
    /// Creates a dependency with the given lag
    pub fn new(item: ItemId, lag: u32) -> Self {
        Self { item, lag }
    }

    /// Creates a dependency without lag
    pub fn immediate(item: ItemId) -> Self {
        Self::new(item, 0)
    }
}

/// Collection of dependencies with backward-compatible serialization
///
/// Short format: `[3, 4]` (bare IDs, lag 0)
/// Full format: `[{"item": 3, "lag": 10}, {"item": 4, "lag": 0}]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dependencies(Vec<Dependency>);

impl Dependencies {
    /// Creates an empty dependencies collection
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a dependency or updates the lag of an existing one
    pub fn set(&mut self, dep: Dependency) {
        match self.0.iter_mut().find(|d| d.item == dep.item) {
            Some(existing) => existing.lag = dep.lag,
            None => self.0.push(dep),
        }
    }

    /// Removes a dependency by item ID
    pub fn remove(&mut self, item: ItemId) -> bool {
        let len_before = self.0.len();
        self.0.retain(|d| d.item != item);
        self.0.len() != len_before
    }

    /// Rewrites every edge pointing at `old` to point at `new`
    pub fn rename(&mut self, old: ItemId, new: ItemId) -> bool {
        let mut changed = false;
        for dep in self.0.iter_mut().filter(|d| d.item == old) {
            dep.item = new;
            changed = true;
        }
        changed
    }

    /// Returns true if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of dependencies
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over all dependencies
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.0.iter()
    }

    /// Checks if a specific item is a dependency
    pub fn contains(&self, item: ItemId) -> bool {
        self.0.iter().any(|d| d.item == item)
    }

    /// Returns the lag towards a dependency, if present
    pub fn lag_for(&self, item: ItemId) -> Option<u32> {
        self.0.iter().find(|d| d.item == item).map(|d| d.lag)
    }
}

impl FromIterator<Dependency> for Dependencies {
    fn from_iter<I: IntoIterator<Item = Dependency>>(iter: I) -> Self {
        let mut deps = Dependencies::new();
        for dep in iter {
            deps.set(dep);
        }
        deps
    }
}

impl<'a> IntoIterator for &'a Dependencies {
    type Item = &'a Dependency;
    type IntoIter = std::slice::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Dependencies {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Always serialize as the full format
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Dependencies {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{SeqAccess, Visitor};

        struct DependenciesVisitor;

        impl<'de> Visitor<'de> for DependenciesVisitor {
            type Value = Dependencies;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a sequence of dependencies (ids or objects)")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut deps = Dependencies::new();

                while let Some(value) = seq.next_element::<serde_json::Value>()? {
                    let dep = match value {
                        serde_json::Value::Number(_) => {
                            let item: ItemId =
                                serde_json::from_value(value).map_err(serde::de::Error::custom)?;
                            Dependency::immediate(item)
                        }
                        serde_json::Value::Object(obj) => {
                            serde_json::from_value(serde_json::Value::Object(obj))
                                .map_err(serde::de::Error::custom)?
                        }
                        _ => {
                            return Err(serde::de::Error::custom(
                                "expected number or object for dependency",
                            ))
                        }
                    };
                    deps.set(dep);
                }

                Ok(deps)
            }
        }

        deserializer.deserialize_seq(DependenciesVisitor)
    }
}

/// The `(group, lane)` pair scoping overlap and push reasoning
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bucket {
    pub group_id: GroupId,
    pub lane: u32,
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group_id, self.lane)
    }
}

fn default_movable() -> bool {
    true
}

fn is_true(val: &bool) -> bool {
    *val
}

/// A scheduled item on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier within the day
    pub id: ItemId,

    /// Display title, carried through untouched by the engine
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Owning group
    #[serde(rename = "group")]
    pub group_id: GroupId,

    /// Sub-row within the group
    #[serde(default)]
    pub lane: u32,

    /// Start minute on the timeline axis (inclusive)
    #[serde(rename = "start")]
    pub start_min: i64,

    /// End minute on the timeline axis (exclusive)
    #[serde(rename = "end")]
    pub end_min: i64,

    /// Locked items are never relocated by the engine
    #[serde(default = "default_movable", skip_serializing_if = "is_true")]
    pub movable: bool,

    /// Items this one depends on
    #[serde(default, skip_serializing_if = "Dependencies::is_empty")]
    pub dependencies: Dependencies,
}

impl Item {
    /// Creates a movable item without dependencies
    pub fn new(id: ItemId, group_id: GroupId, lane: u32, start_min: i64, end_min: i64) -> Self {
        Self {
            id,
            title: String::new(),
            group_id,
            lane,
            start_min,
            end_min,
            movable: true,
            dependencies: Dependencies::new(),
        }
    }

    /// Sets the title (builder style)
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Marks the item as locked (builder style)
    pub fn locked(mut self) -> Self {
        self.movable = false;
        self
    }

    /// Adds a dependency (builder style)
    pub fn depends_on(mut self, item: ItemId, lag: u32) -> Self {
        self.dependencies.set(Dependency::new(item, lag));
        self
    }

    /// Length of the item in minutes
    pub fn duration(&self) -> i64 {
        self.end_min - self.start_min
    }

    /// Returns true if the engine may not relocate this item
    pub fn is_locked(&self) -> bool {
        !self.movable
    }

    /// Returns the bucket this item lives in
    pub fn bucket(&self) -> Bucket {
        Bucket {
            group_id: self.group_id.clone(),
            lane: self.lane,
        }
    }

    /// Returns true if both items share a bucket
    pub fn same_bucket(&self, other: &Item) -> bool {
        self.group_id == other.group_id && self.lane == other.lane
    }

    /// Half-open overlap test; touching endpoints do not overlap
    pub fn overlaps(&self, other: &Item) -> bool {
        spans_overlap(self.start_min, self.end_min, other.start_min, other.end_min)
    }

    /// Returns a copy placed at `start_min`, keeping the duration
    pub fn moved_to(&self, start_min: i64) -> Item {
        let mut moved = self.clone();
        moved.end_min = start_min + self.duration();
        moved.start_min = start_min;
        moved
    }

    /// Returns true if the two items sit at the same place in time
    pub fn same_span(&self, other: &Item) -> bool {
        self.start_min == other.start_min && self.end_min == other.end_min
    }
}

/// Half-open interval overlap
pub fn spans_overlap(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start < b_end && b_start < a_end
}
