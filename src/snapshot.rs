use std::collections::HashSet;
use std::fmt;

/// Catalog item code (ASIN). Opaque to everything but the url template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Items considered in stock for one queue at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    items: HashSet<ItemId>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, id: ItemId) -> bool {
        self.items.insert(id)
    }

    pub fn remove(&mut self, id: &ItemId) -> bool {
        self.items.remove(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter()
    }

    /// Items present here but absent from `previous`, in no particular order.
    pub fn newly_added(&self, previous: &Snapshot) -> Vec<ItemId> {
        self.items.difference(&previous.items).cloned().collect()
    }
}

impl<I: Into<ItemId>> FromIterator<I> for Snapshot {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}
