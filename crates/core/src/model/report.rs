use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::ItemId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReportError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("correct answers ({correct}) exceed answered items ({asked})")]
    CountMismatch { asked: u32, correct: u32 },
}

/// One line of the hardest-items report.
#[derive(Debug, Clone, PartialEq)]
pub struct HardItem {
    pub item_id: ItemId,
    pub prompt: String,
    pub answer: String,
    pub tries: u32,
    pub fails: u32,
    pub difficulty: f64,
}

/// What a finished study run looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    scope: String,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    asked: u32,
    correct: u32,
    final_step: u64,
    hardest: Vec<HardItem>,
}

impl SessionReport {
    /// # Errors
    ///
    /// Returns `ReportError::InvalidTimeRange` if `completed_at` is before
    /// `started_at`, or `ReportError::CountMismatch` if `correct > asked`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scope: impl Into<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        asked: u32,
        correct: u32,
        final_step: u64,
        hardest: Vec<HardItem>,
    ) -> Result<Self, ReportError> {
        if completed_at < started_at {
            return Err(ReportError::InvalidTimeRange);
        }
        if correct > asked {
            return Err(ReportError::CountMismatch { asked, correct });
        }

        Ok(Self {
            scope: scope.into(),
            started_at,
            completed_at,
            asked,
            correct,
            final_step,
            hardest,
        })
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn asked(&self) -> u32 {
        self.asked
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.asked - self.correct
    }

    #[must_use]
    pub fn final_step(&self) -> u64 {
        self.final_step
    }

    /// Items ordered by estimated difficulty, hardest first.
    #[must_use]
    pub fn hardest(&self) -> &[HardItem] {
        &self.hardest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn report_counts_incorrect() {
        let now = fixed_now();
        let report = SessionReport::new("position 1-10", now, now, 12, 9, 40, Vec::new()).unwrap();
        assert_eq!(report.incorrect(), 3);
        assert_eq!(report.scope(), "position 1-10");
        assert_eq!(report.final_step(), 40);
    }

    #[test]
    fn report_rejects_inverted_time_range() {
        let now = fixed_now();
        let earlier = now - chrono::Duration::seconds(1);
        let err = SessionReport::new("g", now, earlier, 0, 0, 0, Vec::new()).unwrap_err();
        assert_eq!(err, ReportError::InvalidTimeRange);
    }

    #[test]
    fn report_rejects_more_correct_than_asked() {
        let now = fixed_now();
        let err = SessionReport::new("g", now, now, 1, 2, 0, Vec::new()).unwrap_err();
        assert_eq!(err, ReportError::CountMismatch { asked: 1, correct: 2 });
    }
}
