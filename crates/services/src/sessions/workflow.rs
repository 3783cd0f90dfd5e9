use std::sync::Arc;

use drill_core::model::{ItemCollection, ScopeSpec, SessionReport, StudySettings};
use storage::repository::{ItemStore, StorageError};

use super::service::{AnswerOutcome, StudySession};
use crate::Clock;
use crate::error::SessionError;

/// Whether an answer was followed by a periodic save.
#[derive(Debug)]
pub enum Autosave {
    NotDue,
    Saved,
    /// The answer is recorded in memory but the save failed.
    Failed(StorageError),
}

impl Autosave {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Autosave::Saved)
    }
}

/// Result of judging the current item through the workflow.
#[derive(Debug)]
pub struct AnswerResult {
    pub outcome: AnswerOutcome,
    pub autosave: Autosave,
}

/// Orchestrates loading, studying and persisting a collection.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    items: Arc<dyn ItemStore>,
    settings: StudySettings,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(clock: Clock, items: Arc<dyn ItemStore>, settings: StudySettings) -> Self {
        Self {
            clock,
            items,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &StudySettings {
        &self.settings
    }

    /// Load the full collection from the store.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the store cannot be read.
    pub async fn load_collection(&self) -> Result<ItemCollection, SessionError> {
        let items = self.items.load_all().await?;
        tracing::info!(items = items.len(), steps = items.total_tries(), "loaded collection");
        Ok(items)
    }

    /// Start a new session over the items matched by `spec`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyScope` if nothing matches.
    pub fn start_session(
        &self,
        items: &ItemCollection,
        spec: &ScopeSpec,
    ) -> Result<StudySession, SessionError> {
        let session = StudySession::new(items, spec, &self.settings, self.clock.now())?;
        tracing::info!(
            scope = %spec,
            items = session.scope().len(),
            step = session.cur_step(),
            "session started"
        );
        Ok(session)
    }

    /// Judge the revealed item and save when the autosave cadence is hit.
    ///
    /// A failed autosave does not fail the answer; it is reported in
    /// `AnswerResult::autosave`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` if no answer is revealed.
    pub async fn answer_current(
        &self,
        session: &mut StudySession,
        items: &mut ItemCollection,
        correct: bool,
    ) -> Result<AnswerResult, SessionError> {
        let outcome = session.judge(items, correct)?;

        let autosave = if self.settings.is_autosave_point(outcome.asked) {
            match self.items.save_all(items).await {
                Ok(()) => {
                    session.mark_autosaved();
                    tracing::info!(asked = outcome.asked, step = session.cur_step(), "autosaved");
                    Autosave::Saved
                }
                Err(err) => {
                    tracing::warn!(error = %err, asked = outcome.asked, "autosave failed");
                    Autosave::Failed(err)
                }
            }
        } else {
            Autosave::NotDue
        };

        Ok(AnswerResult { outcome, autosave })
    }

    /// Save the whole collection now.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Save`, which is recoverable: nothing in memory
    /// is lost and the call may be retried.
    pub async fn checkpoint(&self, items: &ItemCollection) -> Result<(), SessionError> {
        match self.items.save_all(items).await {
            Ok(()) => {
                tracing::info!(items = items.len(), "checkpoint saved");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "checkpoint failed");
                Err(SessionError::Save(err))
            }
        }
    }

    /// Save, then replace `session` with a fresh one over `spec`.
    ///
    /// The step counter carries over; the answered count resets. On any
    /// error `session` is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Save` if the checkpoint fails and
    /// `SessionError::EmptyScope` if `spec` matches nothing.
    pub async fn rescope(
        &self,
        session: &mut StudySession,
        items: &ItemCollection,
        spec: &ScopeSpec,
    ) -> Result<(), SessionError> {
        self.checkpoint(items).await?;

        let next = StudySession::from_scope(
            items,
            spec.select(items),
            spec.to_string(),
            &self.settings,
            session.cur_step(),
            self.clock.now(),
        )?;
        tracing::info!(
            from = session.label(),
            to = next.label(),
            items = next.scope().len(),
            "rescoped session"
        );
        *session = next;
        Ok(())
    }

    /// End the session from any state, save, and build the report.
    ///
    /// May be called again after a failed save.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Save` if the final save fails.
    pub async fn finish(
        &self,
        session: &mut StudySession,
        items: &ItemCollection,
    ) -> Result<SessionReport, SessionError> {
        session.force_finish();
        self.checkpoint(items).await?;

        let report = session.build_report(items, self.clock.now(), self.settings.report_size())?;
        tracing::info!(
            scope = report.scope(),
            asked = report.asked(),
            correct = report.correct(),
            step = report.final_step(),
            "session finished"
        );
        Ok(report)
    }
}
