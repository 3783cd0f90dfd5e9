use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ItemId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("invalid initial level value: {0} (expected 1-4)")]
    InvalidInitLevel(u8),

    #[error("fails ({fails}) cannot exceed tries ({tries})")]
    FailsExceedTries { tries: u32, fails: u32 },
}

//
// ─── INIT LEVEL ────────────────────────────────────────────────────────────────
//

/// Learner's self-reported familiarity, collected once at first exposure.
///
/// Lower values mean more familiar:
/// - `VeryFamiliar` (1)
/// - `Familiar` (2)
/// - `Unsure` (3)
/// - `Unknown` (4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum InitLevel {
    VeryFamiliar,
    Familiar,
    Unsure,
    Unknown,
}

impl InitLevel {
    pub const ALL: [InitLevel; 4] = [
        InitLevel::VeryFamiliar,
        InitLevel::Familiar,
        InitLevel::Unsure,
        InitLevel::Unknown,
    ];

    /// Converts a numeric rating (1-4) to an `InitLevel`.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::InvalidInitLevel` if the value is not in the range 1-4.
    pub fn from_u8(value: u8) -> Result<Self, ItemError> {
        match value {
            1 => Ok(Self::VeryFamiliar),
            2 => Ok(Self::Familiar),
            3 => Ok(Self::Unsure),
            4 => Ok(Self::Unknown),
            _ => Err(ItemError::InvalidInitLevel(value)),
        }
    }

    /// Numeric rating on the 1-4 scale.
    #[must_use]
    pub fn value(self) -> u8 {
        match self {
            InitLevel::VeryFamiliar => 1,
            InitLevel::Familiar => 2,
            InitLevel::Unsure => 3,
            InitLevel::Unknown => 4,
        }
    }

    /// Index into a four-entry prior table.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.value() - 1)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            InitLevel::VeryFamiliar => "very familiar",
            InitLevel::Familiar => "familiar",
            InitLevel::Unsure => "unsure",
            InitLevel::Unknown => "don't know",
        }
    }
}

impl TryFrom<u8> for InitLevel {
    type Error = ItemError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value)
    }
}

impl From<InitLevel> for u8 {
    fn from(level: InitLevel) -> Self {
        level.value()
    }
}

//
// ─── ITEM TYPES ────────────────────────────────────────────────────────────────
//

/// A prompt/answer pair before it has been placed in a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub prompt: String,
    pub answer: String,
    pub group: Option<String>,
}

impl ItemDraft {
    #[must_use]
    pub fn new(prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            answer: answer.into(),
            group: None,
        }
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Place the draft into a collection slot as a never-seen item.
    #[must_use]
    pub fn assign_id(self, id: ItemId) -> Item {
        Item {
            id,
            prompt: self.prompt,
            answer: self.answer,
            group: self.group,
            tries: 0,
            fails: 0,
            last_step: 0,
            init_level: None,
        }
    }
}

/// A prompt/answer pair plus its learning history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    prompt: String,
    answer: String,
    group: Option<String>,
    tries: u32,
    fails: u32,
    last_step: u64,
    init_level: Option<InitLevel>,
}

impl Item {
    /// Rehydrate an item from persisted state.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::FailsExceedTries` if `fails > tries`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ItemId,
        prompt: String,
        answer: String,
        group: Option<String>,
        tries: u32,
        fails: u32,
        last_step: u64,
        init_level: Option<InitLevel>,
    ) -> Result<Self, ItemError> {
        if fails > tries {
            return Err(ItemError::FailsExceedTries { tries, fails });
        }

        Ok(Self {
            id,
            prompt,
            answer,
            group,
            tries,
            fails,
            last_step,
            init_level,
        })
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[must_use]
    pub fn tries(&self) -> u32 {
        self.tries
    }

    #[must_use]
    pub fn fails(&self) -> u32 {
        self.fails
    }

    /// Correct answers so far.
    #[must_use]
    pub fn correct(&self) -> u32 {
        self.tries - self.fails
    }

    /// Global step at the most recent answer; `0` also means never answered.
    #[must_use]
    pub fn last_step(&self) -> u64 {
        self.last_step
    }

    #[must_use]
    pub fn init_level(&self) -> Option<InitLevel> {
        self.init_level
    }

    /// True until the learner has given the one-time familiarity rating.
    #[must_use]
    pub fn needs_rating(&self) -> bool {
        self.init_level.is_none()
    }

    pub(crate) fn set_init_level(&mut self, level: InitLevel) {
        self.init_level = Some(level);
    }

    pub(crate) fn record_answer(&mut self, correct: bool, step: u64) {
        self.tries = self.tries.saturating_add(1);
        if !correct {
            self.fails = self.fails.saturating_add(1);
        }
        self.last_step = step;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_level_conversion_works() {
        assert_eq!(InitLevel::from_u8(1).unwrap(), InitLevel::VeryFamiliar);
        assert_eq!(InitLevel::from_u8(4).unwrap(), InitLevel::Unknown);
        for bad in [0_u8, 5, 255] {
            let err = InitLevel::from_u8(bad).unwrap_err();
            assert!(matches!(err, ItemError::InvalidInitLevel(v) if v == bad));
        }
    }

    #[test]
    fn level_value_and_index_agree() {
        for (i, level) in InitLevel::ALL.iter().enumerate() {
            assert_eq!(level.index(), i);
            assert_eq!(usize::from(level.value()), i + 1);
            assert_eq!(InitLevel::try_from(level.value()).unwrap(), *level);
        }
    }

    #[test]
    fn draft_assigns_fresh_state() {
        let item = ItemDraft::new("apple", "사과")
            .with_group("day1")
            .assign_id(ItemId::new(3));

        assert_eq!(item.id(), ItemId::new(3));
        assert_eq!(item.group(), Some("day1"));
        assert_eq!(item.tries(), 0);
        assert_eq!(item.last_step(), 0);
        assert!(item.needs_rating());
    }

    #[test]
    fn persisted_rejects_more_fails_than_tries() {
        let err = Item::from_persisted(
            ItemId::new(0),
            "q".into(),
            "a".into(),
            None,
            1,
            2,
            0,
            None,
        )
        .unwrap_err();
        assert_eq!(err, ItemError::FailsExceedTries { tries: 1, fails: 2 });
    }

    #[test]
    fn record_answer_updates_history() {
        let mut item = ItemDraft::new("q", "a").assign_id(ItemId::new(0));
        item.record_answer(false, 7);
        item.record_answer(true, 9);

        assert_eq!(item.tries(), 2);
        assert_eq!(item.fails(), 1);
        assert_eq!(item.correct(), 1);
        assert_eq!(item.last_step(), 9);
    }
}
