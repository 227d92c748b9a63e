//! Quiz session state machine and the engine that drives it against
//! storage collaborators.
#![forbid(unsafe_code)]

pub mod error;
pub mod events;
pub mod sessions;
pub mod settings;

pub use lingo_core::Clock;
pub use sessions as session;

pub use error::SessionError;
pub use events::{EventSinkError, SessionCompletedEvent, SessionEventSink, TracingEventSink};
pub use sessions::{
    AnswerOutcome, AnswerResponse, AnswerSubmission, Completion, LearningFlagChange, LoadOutcome,
    QuizSession, SessionEngine, SessionProgress, SessionStart, SessionStatus, SubmittedAnswer,
};
pub use settings::EngineSettings;
