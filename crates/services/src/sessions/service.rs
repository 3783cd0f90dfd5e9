use chrono::{DateTime, Utc};
use std::fmt;

use drill_core::model::{
    CollectionError, InitLevel, Item, ItemCollection, ItemId, ScopeSpec, SessionReport,
    StudySettings,
};
use drill_core::scheduler::RiskRanker;

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where the session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next turn to be requested.
    Ready,
    AwaitingInitRating(ItemId),
    AwaitingReveal(ItemId),
    AwaitingAnswerJudgment(ItemId),
    Finished,
}

impl SessionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Ready => "ready",
            SessionState::AwaitingInitRating(_) => "awaiting a rating",
            SessionState::AwaitingReveal(_) => "awaiting reveal",
            SessionState::AwaitingAnswerJudgment(_) => "awaiting judgment",
            SessionState::Finished => "finished",
        }
    }

    /// Item currently in front of the learner, if any.
    #[must_use]
    pub fn item(self) -> Option<ItemId> {
        match self {
            SessionState::AwaitingInitRating(id)
            | SessionState::AwaitingReveal(id)
            | SessionState::AwaitingAnswerJudgment(id) => Some(id),
            SessionState::Ready | SessionState::Finished => None,
        }
    }
}

/// What the presentation layer should show next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Ask for the one-time familiarity rating.
    Rate(ItemId),
    /// Show the prompt, answer hidden.
    Present(ItemId),
    /// Show prompt and answer, ask whether it was right.
    Judge(ItemId),
    Finished,
}

/// Result of judging one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub item_id: ItemId,
    pub correct: bool,
    /// Step recorded as the item's `last_step`.
    pub step: u64,
    /// Answers judged so far in this session, including this one.
    pub asked: u32,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Turn-by-turn study run over one scope of a collection.
///
/// The session only stores item ids; the `ItemCollection` is passed into
/// each call and is the single owner of item state.
pub struct StudySession {
    scope: Vec<ItemId>,
    label: String,
    ranker: RiskRanker,
    state: SessionState,
    cur_step: u64,
    asked: u32,
    correct: u32,
    autosaved: bool,
    started_at: DateTime<Utc>,
}

impl StudySession {
    /// Start a session over the items matched by `spec`.
    ///
    /// The step counter continues from the collection's total tries.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyScope` if `spec` matches nothing.
    pub fn new(
        items: &ItemCollection,
        spec: &ScopeSpec,
        settings: &StudySettings,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        Self::from_scope(
            items,
            spec.select(items),
            spec.to_string(),
            settings,
            items.total_tries(),
            started_at,
        )
    }

    /// Start a session over an explicit list of item ids.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyScope` for an empty list and
    /// `SessionError::Collection` if an id is not in `items`.
    pub fn from_scope(
        items: &ItemCollection,
        scope: Vec<ItemId>,
        label: impl Into<String>,
        settings: &StudySettings,
        cur_step: u64,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if scope.is_empty() {
            return Err(SessionError::EmptyScope);
        }
        if let Some(missing) = scope.iter().copied().find(|id| items.get(*id).is_none()) {
            return Err(CollectionError::UnknownItem(missing).into());
        }

        Ok(Self {
            scope,
            label: label.into(),
            ranker: RiskRanker::from_settings(settings),
            state: SessionState::Ready,
            cur_step,
            asked: 0,
            correct: 0,
            autosaved: false,
            started_at,
        })
    }

    #[must_use]
    pub fn scope(&self) -> &[ItemId] {
        &self.scope
    }

    /// Human-readable scope description, e.g. `"group 1-3"`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn ranker(&self) -> &RiskRanker {
        &self.ranker
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn cur_step(&self) -> u64 {
        self.cur_step
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
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            scope: self.label.clone(),
            scope_len: self.scope.len(),
            cur_step: self.cur_step,
            asked: self.asked,
            correct: self.correct,
            autosaved: self.autosaved,
            is_finished: self.is_finished(),
        }
    }

    /// Decide what to show next.
    ///
    /// While a prompt is outstanding the same turn is returned again.
    /// Unrated items in scope are offered for rating first, in scope order;
    /// only then is the ranker consulted. When no item has positive risk
    /// the step is advanced and ranking retried, at most `scope.len() + 1`
    /// times, after which the session finishes.
    pub fn next_turn(&mut self, items: &ItemCollection) -> Turn {
        match self.state {
            SessionState::AwaitingInitRating(id) => return Turn::Rate(id),
            SessionState::AwaitingReveal(id) => return Turn::Present(id),
            SessionState::AwaitingAnswerJudgment(id) => return Turn::Judge(id),
            SessionState::Finished => return Turn::Finished,
            SessionState::Ready => {}
        }

        if let Some(id) = self
            .scope
            .iter()
            .copied()
            .find(|id| items.get(*id).is_some_and(Item::needs_rating))
        {
            self.state = SessionState::AwaitingInitRating(id);
            return Turn::Rate(id);
        }

        for _ in 0..=self.scope.len() {
            if let Some(pick) = self.ranker.select_next(items, &self.scope, self.cur_step) {
                tracing::debug!(
                    item = %pick.item_id,
                    risk = pick.risk,
                    difficulty = pick.difficulty,
                    recency = pick.recency,
                    step = self.cur_step,
                    "selected item"
                );
                self.state = SessionState::AwaitingReveal(pick.item_id);
                return Turn::Present(pick.item_id);
            }
            self.cur_step += 1;
        }

        tracing::debug!(step = self.cur_step, "no item with positive risk, finishing");
        self.state = SessionState::Finished;
        Turn::Finished
    }

    /// Record the familiarity rating for the item awaiting one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless a rating is pending.
    pub fn rate(
        &mut self,
        items: &mut ItemCollection,
        level: InitLevel,
    ) -> Result<ItemId, SessionError> {
        let SessionState::AwaitingInitRating(id) = self.state else {
            return Err(self.invalid("rate"));
        };
        items.set_init_level(id, level)?;
        self.state = SessionState::Ready;
        Ok(id)
    }

    /// Reveal the answer of the presented item.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless an item is presented.
    pub fn reveal(&mut self) -> Result<ItemId, SessionError> {
        let SessionState::AwaitingReveal(id) = self.state else {
            return Err(self.invalid("reveal"));
        };
        self.state = SessionState::AwaitingAnswerJudgment(id);
        Ok(id)
    }

    /// Record whether the revealed item was answered correctly.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the answer is revealed.
    pub fn judge(
        &mut self,
        items: &mut ItemCollection,
        correct: bool,
    ) -> Result<AnswerOutcome, SessionError> {
        let SessionState::AwaitingAnswerJudgment(id) = self.state else {
            return Err(self.invalid("judge"));
        };

        let step = self.cur_step;
        items.record_answer(id, correct, step)?;
        self.cur_step += 1;
        self.asked += 1;
        if correct {
            self.correct += 1;
        }
        self.autosaved = false;
        self.state = SessionState::Ready;

        Ok(AnswerOutcome {
            item_id: id,
            correct,
            step,
            asked: self.asked,
        })
    }

    /// End the session at the learner's request.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` while a rating is pending
    /// or once the session has finished.
    pub fn quit(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::AwaitingInitRating(_) | SessionState::Finished => {
                Err(self.invalid("quit"))
            }
            _ => {
                self.state = SessionState::Finished;
                Ok(())
            }
        }
    }

    pub(crate) fn force_finish(&mut self) {
        self.state = SessionState::Finished;
    }

    pub(crate) fn mark_autosaved(&mut self) {
        self.autosaved = true;
    }

    pub(crate) fn build_report(
        &self,
        items: &ItemCollection,
        completed_at: DateTime<Utc>,
        report_size: usize,
    ) -> Result<SessionReport, SessionError> {
        let hardest = self.ranker.hardest(items, &self.scope, report_size);
        Ok(SessionReport::new(
            self.label.clone(),
            self.started_at,
            completed_at,
            self.asked,
            self.correct,
            self.cur_step,
            hardest,
        )?)
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            state: self.state.as_str(),
            action,
        }
    }
}

impl fmt::Debug for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudySession")
            .field("label", &self.label)
            .field("scope_len", &self.scope.len())
            .field("state", &self.state)
            .field("cur_step", &self.cur_step)
            .field("asked", &self.asked)
            .field("correct", &self.correct)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
