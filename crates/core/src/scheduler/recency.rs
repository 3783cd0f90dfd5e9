/// Normalized freshness decay in `[0, 1]`.
///
/// `0` means the item was answered at the current step, `1` means it was never
/// answered (or answered at step 0) or the run has not started yet.
///
/// ```
/// # use drill_core::scheduler::recency_factor;
/// assert_eq!(recency_factor(0, 5), 1.0);
/// assert_eq!(recency_factor(10, 10), 0.0);
/// assert_eq!(recency_factor(10, 5), 0.5);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn recency_factor(cur_step: u64, last_step: u64) -> f64 {
    if cur_step == 0 {
        return 1.0;
    }
    let elapsed = cur_step.saturating_sub(last_step);
    (elapsed as f64 / cur_step as f64).min(1.0)
}
