use serde::{Deserialize, Serialize};

use crate::model::ids::CardId;
use crate::model::score::MasteryScore;

/// How an answer was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    /// Accepted with half credit.
    Partial,
    Incorrect,
}

impl Verdict {
    /// Map the caller's `correct`/`partial` flags. `partial` without `correct`
    /// counts as incorrect.
    #[must_use]
    pub fn from_flags(correct: bool, partial: bool) -> Self {
        match (correct, partial) {
            (true, true) => Self::Partial,
            (true, false) => Self::Correct,
            (false, _) => Self::Incorrect,
        }
    }

    /// Full and partial answers both count toward the session score.
    #[must_use]
    pub fn is_correct(self) -> bool {
        !matches!(self, Self::Incorrect)
    }

    #[must_use]
    pub fn is_partial(self) -> bool {
        matches!(self, Self::Partial)
    }
}

/// One recorded response. Append-only within a session.
///
/// `question_number` is 1-based and continues across resumed sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_number: u32,
    pub card_id: CardId,
    pub prompt: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub correct: bool,
    pub partial: bool,
    pub resulting_mastery: MasteryScore,
    pub time_taken_ms: u64,
}

impl Answer {
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        Verdict::from_flags(self.correct, self.partial)
    }
}

/// Per-question line of a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDetail {
    pub question_number: u32,
    pub card_id: CardId,
    pub prompt: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub correct: bool,
    pub partial: bool,
    pub resulting_mastery: MasteryScore,
    pub time_taken_ms: u64,
}

impl From<&Answer> for QuizDetail {
    fn from(answer: &Answer) -> Self {
        Self {
            question_number: answer.question_number,
            card_id: answer.card_id,
            prompt: answer.prompt.clone(),
            user_answer: answer.user_answer.clone(),
            correct_answer: answer.correct_answer.clone(),
            correct: answer.correct,
            partial: answer.partial,
            resulting_mastery: answer.resulting_mastery,
            time_taken_ms: answer.time_taken_ms,
        }
    }
}
