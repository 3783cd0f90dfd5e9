use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::model::ids::ItemId;
use crate::model::item::{InitLevel, Item, ItemDraft};
use crate::model::scope::group_number;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollectionError {
    #[error("items {first} and {second} share the same prompt and answer")]
    DuplicatePair { first: ItemId, second: ItemId },

    #[error("item id {found} does not match its position {expected}")]
    IdMismatch { expected: ItemId, found: ItemId },

    #[error("too many items for one collection: {len}")]
    TooLarge { len: usize },

    #[error("unknown item: {0}")]
    UnknownItem(ItemId),
}

/// The full, ordered set of items a learner owns.
///
/// Items live in a single arena indexed by `ItemId`; scopes and sessions
/// refer to items by id, so there is exactly one copy of each item's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCollection {
    items: Vec<Item>,
}

impl ItemCollection {
    /// Build a collection of never-seen items, in draft order.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::DuplicatePair` if two drafts share prompt and answer.
    pub fn from_drafts(drafts: impl IntoIterator<Item = ItemDraft>) -> Result<Self, CollectionError> {
        let mut items = Vec::new();
        for draft in drafts {
            let id = next_id(items.len())?;
            items.push(draft.assign_id(id));
        }
        Self::from_items(items)
    }

    /// Build a collection from already-identified items.
    ///
    /// Item ids must equal their index.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::IdMismatch` when ids are out of order, or
    /// `CollectionError::DuplicatePair` when a (prompt, answer) pair repeats.
    pub fn from_items(items: Vec<Item>) -> Result<Self, CollectionError> {
        validate_items(&items)?;
        Ok(Self { items })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Append never-seen items at the end of the collection, in order.
    ///
    /// Either every draft is added or none is.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::DuplicatePair` if a pair is already present
    /// or repeats among the drafts, or `CollectionError::TooLarge` when ids
    /// are exhausted.
    pub fn extend(
        &mut self,
        drafts: impl IntoIterator<Item = ItemDraft>,
    ) -> Result<Vec<ItemId>, CollectionError> {
        let start = self.items.len();
        let mut added = Vec::new();
        for draft in drafts {
            match next_id(self.items.len()) {
                Ok(id) => {
                    self.items.push(draft.assign_id(id));
                    added.push(id);
                }
                Err(e) => {
                    self.items.truncate(start);
                    return Err(e);
                }
            }
        }

        if let Err(e) = validate_items(&self.items) {
            self.items.truncate(start);
            return Err(e);
        }
        Ok(added)
    }

    /// Sum of `tries` across every item; the starting global step.
    #[must_use]
    pub fn total_tries(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.tries())).sum()
    }

    /// Distinct group numbers present in the collection, ascending.
    #[must_use]
    pub fn group_numbers(&self) -> Vec<u64> {
        self.items
            .iter()
            .filter_map(|item| item.group().and_then(group_number))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Store the one-time familiarity rating for an item.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::UnknownItem` if the id is not in the collection.
    pub fn set_init_level(&mut self, id: ItemId, level: InitLevel) -> Result<(), CollectionError> {
        self.item_mut(id)?.set_init_level(level);
        Ok(())
    }

    /// Record one answered presentation of an item at the given step.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::UnknownItem` if the id is not in the collection.
    pub fn record_answer(
        &mut self,
        id: ItemId,
        correct: bool,
        step: u64,
    ) -> Result<&Item, CollectionError> {
        let item = self.item_mut(id)?;
        item.record_answer(correct, step);
        Ok(item)
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut Item, CollectionError> {
        self.items
            .get_mut(id.index())
            .ok_or(CollectionError::UnknownItem(id))
    }
}

fn validate_items(items: &[Item]) -> Result<(), CollectionError> {
    let mut seen: HashMap<(&str, &str), ItemId> = HashMap::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let expected = next_id(index)?;
        if item.id() != expected {
            return Err(CollectionError::IdMismatch {
                expected,
                found: item.id(),
            });
        }
        if let Some(first) = seen.insert((item.prompt(), item.answer()), item.id()) {
            return Err(CollectionError::DuplicatePair {
                first,
                second: item.id(),
            });
        }
    }
    Ok(())
}

fn next_id(index: usize) -> Result<ItemId, CollectionError> {
    u32::try_from(index)
        .map(ItemId::new)
        .map_err(|_| CollectionError::TooLarge { len: index + 1 })
}
