mod progress;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{AnswerOutcome, SessionState, StudySession, Turn};
pub use view::{ItemStats, LastSeen, ScopeAccuracy};
pub use workflow::{AnswerResult, Autosave, SessionLoopService};
