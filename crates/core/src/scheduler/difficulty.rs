use crate::model::{InitLevel, PriorTable};

/// Prior used when an item carries no familiarity rating.
pub const FALLBACK_PRIOR: f64 = 0.5;

/// Bayesian-shrunk failure estimate for an item.
///
/// `difficulty = (prior * k + fails) / (k + tries)`, with the denominator
/// floored at 1. With no tries the result is the prior; as tries grow it
/// converges to the observed fail rate.
///
/// ```
/// # use drill_core::model::{InitLevel, PriorTable};
/// # use drill_core::scheduler::estimate_difficulty;
/// let priors = PriorTable::default();
/// let d = estimate_difficulty(Some(InitLevel::Unknown), 2, 2, &priors, 3.0);
/// assert!((d - 0.94).abs() < 1e-9);
/// ```
#[must_use]
pub fn estimate_difficulty(
    init_level: Option<InitLevel>,
    fails: u32,
    tries: u32,
    priors: &PriorTable,
    credibility_k: f64,
) -> f64 {
    let prior = init_level.map_or(FALLBACK_PRIOR, |level| priors.prior(level));
    let denom = (credibility_k + f64::from(tries)).max(1.0);
    (prior * credibility_k + f64::from(fails)) / denom
}
