use thiserror::Error;

use crate::model::item::InitLevel;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("prior for level {level} must be finite and >= 0, got {value}")]
    InvalidPrior { level: u8, value: f64 },

    #[error("credibility K must be finite and >= 0, got {0}")]
    InvalidCredibility(f64),

    #[error("report size must be > 0")]
    InvalidReportSize,
}

//
// ─── PRIOR TABLE ───────────────────────────────────────────────────────────────
//

/// Prior difficulty for each initial familiarity level.
///
/// Priors are expected to be non-decreasing from `VeryFamiliar` to `Unknown`,
/// but only range validity is checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorTable([f64; 4]);

impl PriorTable {
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidPrior` for negative or non-finite priors.
    pub fn new(priors: [f64; 4]) -> Result<Self, SettingsError> {
        for (level, value) in InitLevel::ALL.iter().zip(priors) {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::InvalidPrior {
                    level: level.value(),
                    value,
                });
            }
        }
        Ok(Self(priors))
    }

    #[must_use]
    pub fn prior(&self, level: InitLevel) -> f64 {
        self.0[level.index()]
    }

    #[must_use]
    pub fn values(&self) -> [f64; 4] {
        self.0
    }
}

impl Default for PriorTable {
    fn default() -> Self {
        Self([0.0, 0.3, 0.6, 0.9])
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tunables for difficulty estimation, autosave cadence and reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct StudySettings {
    priors: PriorTable,
    credibility_k: f64,
    autosave_every: u32,
    report_size: usize,
}

impl StudySettings {
    pub const DEFAULT_CREDIBILITY_K: f64 = 3.0;
    pub const DEFAULT_AUTOSAVE_EVERY: u32 = 10;
    pub const DEFAULT_REPORT_SIZE: usize = 10;

    /// Creates custom study settings.
    ///
    /// `autosave_every == 0` disables periodic autosave; the final save at
    /// session end still happens.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if `credibility_k` is negative or non-finite,
    /// or if `report_size` is zero.
    pub fn new(
        priors: PriorTable,
        credibility_k: f64,
        autosave_every: u32,
        report_size: usize,
    ) -> Result<Self, SettingsError> {
        if !credibility_k.is_finite() || credibility_k < 0.0 {
            return Err(SettingsError::InvalidCredibility(credibility_k));
        }
        if report_size == 0 {
            return Err(SettingsError::InvalidReportSize);
        }

        Ok(Self {
            priors,
            credibility_k,
            autosave_every,
            report_size,
        })
    }

    #[must_use]
    pub fn priors(&self) -> &PriorTable {
        &self.priors
    }

    /// Number of observed tries it takes for data to outweigh the prior.
    #[must_use]
    pub fn credibility_k(&self) -> f64 {
        self.credibility_k
    }

    #[must_use]
    pub fn autosave_every(&self) -> u32 {
        self.autosave_every
    }

    #[must_use]
    pub fn report_size(&self) -> usize {
        self.report_size
    }

    /// Whether the `asked`-th answer of a session is an autosave point.
    #[must_use]
    pub fn is_autosave_point(&self, asked: u32) -> bool {
        self.autosave_every > 0 && asked > 0 && asked % self.autosave_every == 0
    }
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            priors: PriorTable::default(),
            credibility_k: Self::DEFAULT_CREDIBILITY_K,
            autosave_every: Self::DEFAULT_AUTOSAVE_EVERY,
            report_size: Self::DEFAULT_REPORT_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_priors_are_non_decreasing() {
        let values = PriorTable::default().values();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(PriorTable::default().prior(InitLevel::Unknown), 0.9);
    }

    #[test]
    fn prior_table_rejects_invalid_values() {
        let err = PriorTable::new([0.0, f64::NAN, 0.5, 0.9]).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidPrior { level: 2, .. }));

        let err = PriorTable::new([0.0, 0.1, 0.5, -0.1]).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidPrior { level: 4, .. }));
    }

    #[test]
    fn settings_reject_bad_credibility() {
        for k in [-1.0, f64::INFINITY, f64::NAN] {
            let err = StudySettings::new(PriorTable::default(), k, 10, 10).unwrap_err();
            assert!(matches!(err, SettingsError::InvalidCredibility(_)));
        }
    }

    #[test]
    fn settings_reject_zero_report_size() {
        let err = StudySettings::new(PriorTable::default(), 3.0, 10, 0).unwrap_err();
        assert_eq!(err, SettingsError::InvalidReportSize);
    }

    #[test]
    fn autosave_points_follow_cadence() {
        let settings = StudySettings::default();
        let points: Vec<u32> = (0..=25).filter(|n| settings.is_autosave_point(*n)).collect();
        assert_eq!(points, vec![10, 20]);

        let off = StudySettings::new(PriorTable::default(), 3.0, 0, 10).unwrap();
        assert!((0..=100).all(|n| !off.is_autosave_point(n)));
    }
}
