#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use drill_core::Clock;
pub use sessions as session;

pub use error::SessionError;

pub use sessions::{
    AnswerOutcome, AnswerResult, Autosave, ItemStats, LastSeen, ScopeAccuracy, SessionLoopService,
    SessionProgress, SessionState, StudySession, Turn,
};
