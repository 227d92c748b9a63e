mod answer;
mod card;
mod deck;
mod ids;
mod options;
mod quiz;
mod review;
mod score;
mod session;

pub use answer::{Answer, QuizDetail, Verdict};
pub use card::{Card, CardError};
pub use deck::{Deck, DeckError};
pub use ids::{CardId, DeckId, ParseIdError, UserId};
pub use options::{CardTypeToLearn, DEFAULT_CARDS_TO_LEARN, OptionsError, StudyOptions};
pub use quiz::{OPTION_COUNT, QuizItem, QuizItemError};
pub use review::{ReviewGrade, ReviewOutcome};
pub use score::{InvalidMasteryScore, MasteryScore};
pub use session::{
    HistoryEntry, HistoryReceipt, ParseQuizModeError, QuizMode, ResumeError,
    SessionProgressRecord,
};
