//! Shared error types for the services crate.

use thiserror::Error;

use drill_core::model::{CollectionError, ReportError, ScopeError};
use storage::repository::StorageError;

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("nothing to study: the scope matched no items")]
    EmptyScope,

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    /// Writing the collection failed; in-memory progress is intact.
    #[error("save failed: {0}")]
    Save(#[source] StorageError),

    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// True when the caller may retry or keep studying unsaved.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Save(_))
    }
}
