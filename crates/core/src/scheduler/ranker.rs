use std::cmp::Ordering;

use crate::model::{HardItem, Item, ItemCollection, ItemId, PriorTable, StudySettings};
use crate::scheduler::{estimate_difficulty, recency_factor};

/// Risk score of one item at a given step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedItem {
    pub item_id: ItemId,
    pub risk: f64,
    pub difficulty: f64,
    pub recency: f64,
}

/// Orders items by `difficulty * recency` and picks the next one to present.
///
/// Ranking is recomputed from scratch on every call, so identical item
/// states and step always produce the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRanker {
    priors: PriorTable,
    credibility_k: f64,
}

impl RiskRanker {
    #[must_use]
    pub fn new(priors: PriorTable, credibility_k: f64) -> Self {
        Self {
            priors,
            credibility_k,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &StudySettings) -> Self {
        Self::new(*settings.priors(), settings.credibility_k())
    }

    #[must_use]
    pub fn difficulty(&self, item: &Item) -> f64 {
        estimate_difficulty(
            item.init_level(),
            item.fails(),
            item.tries(),
            &self.priors,
            self.credibility_k,
        )
    }

    #[must_use]
    pub fn score(&self, item: &Item, cur_step: u64) -> RankedItem {
        let difficulty = self.difficulty(item);
        let recency = recency_factor(cur_step, item.last_step());
        RankedItem {
            item_id: item.id(),
            risk: difficulty * recency,
            difficulty,
            recency,
        }
    }

    /// Score every rated item in scope, highest risk first.
    ///
    /// Equal risk is broken by higher recency, then by scope order.
    /// Unrated items are left out.
    #[must_use]
    pub fn rank(&self, items: &ItemCollection, scope: &[ItemId], cur_step: u64) -> Vec<RankedItem> {
        let mut ranked: Vec<RankedItem> = scope
            .iter()
            .filter_map(|id| items.get(*id))
            .filter(|item| item.init_level().is_some())
            .map(|item| self.score(item, cur_step))
            .collect();

        ranked.sort_by(by_risk_then_recency);
        ranked
    }

    /// Highest-ranked item with strictly positive risk, if any.
    #[must_use]
    pub fn select_next(
        &self,
        items: &ItemCollection,
        scope: &[ItemId],
        cur_step: u64,
    ) -> Option<RankedItem> {
        self.rank(items, scope, cur_step)
            .into_iter()
            .find(|ranked| ranked.risk > 0.0)
    }

    /// In-scope items with the highest estimated difficulty, hardest first.
    #[must_use]
    pub fn hardest(&self, items: &ItemCollection, scope: &[ItemId], limit: usize) -> Vec<HardItem> {
        let mut scored: Vec<(f64, &Item)> = scope
            .iter()
            .filter_map(|id| items.get(*id))
            .map(|item| (self.difficulty(item), item))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(limit)
            .map(|(difficulty, item)| HardItem {
                item_id: item.id(),
                prompt: item.prompt().to_owned(),
                answer: item.answer().to_owned(),
                tries: item.tries(),
                fails: item.fails(),
                difficulty,
            })
            .collect()
    }
}

impl Default for RiskRanker {
    fn default() -> Self {
        Self::from_settings(&StudySettings::default())
    }
}

fn by_risk_then_recency(a: &RankedItem, b: &RankedItem) -> Ordering {
    b.risk
        .total_cmp(&a.risk)
        .then_with(|| b.recency.total_cmp(&a.recency))
}
