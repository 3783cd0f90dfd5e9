use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an item inside an `ItemCollection`.
///
/// The value is the item's arena index, assigned in collection order when the
/// collection is loaded. It is therefore also the item's 0-based position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(u32);

impl ItemId {
    /// Creates a new `ItemId`
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Index into the backing arena.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// 1-based position in collection order, as used by position scopes.
    #[must_use]
    pub fn position(&self) -> u64 {
        u64::from(self.0) + 1
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
