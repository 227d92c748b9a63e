//! Shared error types for the engine crate.

use thiserror::Error;

use lingo_core::model::CardId;
use lingo_core::scheduler::SchedulerError;
use lingo_storage::repository::StorageError;

/// Errors emitted by quiz sessions and the session engine.
///
/// Every variant is recoverable: the session keeps its in-memory state and
/// the failed call can be retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session cards have not been loaded yet")]
    NotLoadedYet,
    #[error("session already completed")]
    AlreadyCompleted,
    #[error("session is paused")]
    Paused,
    #[error("all questions are answered but completion has not been recorded")]
    AwaitingFinalization,
    #[error("session still has unanswered questions")]
    Incomplete,
    #[error("session is already loaded")]
    AlreadyLoaded,
    #[error("no quiz items to study")]
    NoQuestions,
    #[error("answer is for card {submitted}, current question is for card {expected}")]
    CardMismatch { expected: CardId, submitted: CardId },
    #[error("option {index} does not exist")]
    InvalidOption { index: usize },
    #[error("card {0} is not part of this session")]
    UnknownCard(CardId),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Persistence(#[from] StorageError),
}
