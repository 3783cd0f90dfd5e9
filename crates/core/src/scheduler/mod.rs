//! Adaptive item selection.
//!
//! Difficulty (how likely the learner is to fail an item) is multiplied by a
//! recency factor (how long ago it was last answered, relative to the whole
//! run) to give a risk score. The item with the highest positive risk is
//! presented next.

mod difficulty;
mod ranker;
mod recency;

pub use difficulty::{FALLBACK_PRIOR, estimate_difficulty};
pub use ranker::{RankedItem, RiskRanker};
pub use recency::recency_factor;
