mod progress;
mod queries;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{
    AnswerResponse, AnswerSubmission, LearningFlagChange, QuizSession, SessionStatus,
    SubmittedAnswer,
};
pub use workflow::{AnswerOutcome, Completion, LoadOutcome, SessionEngine, SessionStart};
