use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::collection::ItemCollection;
use crate::model::ids::ItemId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScopeError {
    #[error("scope specification is blank")]
    Blank,

    #[error("invalid scope token: {token:?}")]
    InvalidToken { token: String },

    #[error("unknown scope mode: {0:?} (expected \"group\" or \"position\")")]
    UnknownMode(String),
}

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

/// How a scope specification is matched against the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// Match the number embedded in each item's group label.
    Group,
    /// Match 1-based positions in collection order.
    Position,
}

impl ScopeMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeMode::Group => "group",
            ScopeMode::Position => "position",
        }
    }
}

impl FromStr for ScopeMode {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "group" | "chapter" => Ok(ScopeMode::Group),
            "position" | "count" => Ok(ScopeMode::Position),
            _ => Err(ScopeError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── RANGE SET ─────────────────────────────────────────────────────────────────
//

/// Union of inclusive integer ranges, e.g. `1,5,10-20`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<RangeInclusive<u64>>,
}

impl RangeSet {
    /// Parse a comma-separated list of `n`, `a-b` or `a~b` tokens.
    ///
    /// Whitespace is ignored, empty tokens are skipped and reversed
    /// endpoints are swapped.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Blank` when no token remains, or
    /// `ScopeError::InvalidToken` for anything that is not a number or range.
    pub fn parse(raw: &str) -> Result<Self, ScopeError> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

        let mut ranges = Vec::new();
        for token in compact.split(',').filter(|t| !t.is_empty()) {
            ranges.push(parse_token(token)?);
        }

        if ranges.is_empty() {
            return Err(ScopeError::Blank);
        }
        Ok(Self { ranges })
    }

    #[must_use]
    pub fn contains(&self, value: u64) -> bool {
        self.ranges.iter().any(|r| r.contains(&value))
    }

    #[must_use]
    pub fn ranges(&self) -> &[RangeInclusive<u64>] {
        &self.ranges
    }
}

fn parse_token(token: &str) -> Result<RangeInclusive<u64>, ScopeError> {
    let invalid = || ScopeError::InvalidToken {
        token: token.to_string(),
    };
    let parts: Vec<&str> = token.split(['-', '~']).collect();
    match parts.as_slice() {
        [single] => {
            let n = single.parse::<u64>().map_err(|_| invalid())?;
            Ok(n..=n)
        }
        [a, b] => {
            let a = a.parse::<u64>().map_err(|_| invalid())?;
            let b = b.parse::<u64>().map_err(|_| invalid())?;
            Ok(a.min(b)..=a.max(b))
        }
        _ => Err(invalid()),
    }
}

//
// ─── SCOPE SPEC ────────────────────────────────────────────────────────────────
//

/// A parsed scope filter: which items of a collection are in play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSpec {
    mode: ScopeMode,
    raw: String,
    ranges: RangeSet,
}

impl ScopeSpec {
    /// # Errors
    ///
    /// Returns `ScopeError` if the range syntax is malformed or blank.
    pub fn parse(mode: ScopeMode, raw: &str) -> Result<Self, ScopeError> {
        let ranges = RangeSet::parse(raw)?;
        Ok(Self {
            mode,
            raw: raw.chars().filter(|c| !c.is_whitespace()).collect(),
            ranges,
        })
    }

    #[must_use]
    pub fn mode(&self) -> ScopeMode {
        self.mode
    }

    #[must_use]
    pub fn ranges(&self) -> &RangeSet {
        &self.ranges
    }

    /// Ordered subset of the collection matched by this spec.
    ///
    /// Group scopes keep collection order; position scopes are ascending by
    /// position, which is the same order. Positions past the end are ignored.
    #[must_use]
    pub fn select(&self, items: &ItemCollection) -> Vec<ItemId> {
        items
            .iter()
            .filter(|item| match self.mode {
                ScopeMode::Group => item
                    .group()
                    .and_then(group_number)
                    .is_some_and(|n| self.ranges.contains(n)),
                ScopeMode::Position => self.ranges.contains(item.id().position()),
            })
            .map(|item| item.id())
            .collect()
    }
}

impl fmt::Display for ScopeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mode, self.raw)
    }
}

/// Extract the group number from a label such as `"day12"` (first digit run).
#[must_use]
pub fn group_number(label: &str) -> Option<u64> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let digits = &label[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}
