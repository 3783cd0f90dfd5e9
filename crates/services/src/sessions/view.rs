use drill_core::model::{InitLevel, Item, ItemCollection, ItemId};

/// How long ago an item was last answered, in turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastSeen {
    Never,
    JustNow,
    TurnsAgo(u64),
}

impl LastSeen {
    #[must_use]
    pub fn of(item: &Item, cur_step: u64) -> Self {
        if item.tries() == 0 {
            return LastSeen::Never;
        }
        match cur_step.saturating_sub(item.last_step()) {
            0 => LastSeen::JustNow,
            turns => LastSeen::TurnsAgo(turns),
        }
    }
}

/// Presentation-agnostic stats for the item on screen.
///
/// No pre-formatted strings; the caller decides how to render rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemStats {
    pub item_id: ItemId,
    pub tries: u32,
    pub correct: u32,
    /// `correct / tries`, absent until the item has been answered.
    pub correct_rate: Option<f64>,
    pub last_seen: LastSeen,
    pub init_level: Option<InitLevel>,
}

impl ItemStats {
    #[must_use]
    pub fn of(item: &Item, cur_step: u64) -> Self {
        let correct_rate =
            (item.tries() > 0).then(|| f64::from(item.correct()) / f64::from(item.tries()));
        Self {
            item_id: item.id(),
            tries: item.tries(),
            correct: item.correct(),
            correct_rate,
            last_seen: LastSeen::of(item, cur_step),
            init_level: item.init_level(),
        }
    }
}

/// Lifetime accuracy over a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScopeAccuracy {
    pub tries: u64,
    pub correct: u64,
}

impl ScopeAccuracy {
    #[must_use]
    pub fn of(items: &ItemCollection, scope: &[ItemId]) -> Self {
        scope
            .iter()
            .filter_map(|id| items.get(*id))
            .fold(Self::default(), |acc, item| Self {
                tries: acc.tries + u64::from(item.tries()),
                correct: acc.correct + u64::from(item.correct()),
            })
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> Option<f64> {
        (self.tries > 0).then(|| self.correct as f64 / self.tries as f64)
    }
}
