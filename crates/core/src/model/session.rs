use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::answer::{Answer, QuizDetail};
use crate::model::ids::{DeckId, UserId};
use crate::model::options::StudyOptions;
use crate::model::quiz::{QuizItem, QuizItemError};
use crate::scheduler::MemoryState;

//
// ─── QUIZ MODE ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    #[default]
    Learn,
    Review,
}

impl QuizMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Learn => "learn",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown quiz mode: {0}")]
pub struct ParseQuizModeError(pub String);

impl FromStr for QuizMode {
    type Err = ParseQuizModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "learn" => Ok(Self::Learn),
            "review" => Ok(Self::Review),
            _ => Err(ParseQuizModeError(s.to_owned())),
        }
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResumeError {
    #[error("current question index {index} is outside 1..={items}")]
    InvalidQuestionIndex { index: u32, items: usize },

    #[error("record holds {answers} answers but is positioned at question {index}")]
    TooFewAnswers { answers: usize, index: u32 },

    #[error("score {score} does not match {correct} correct answers")]
    ScoreMismatch { score: u32, correct: usize },

    #[error("answer at position {position} is numbered {found}")]
    QuestionNumbering { position: usize, found: u32 },

    #[error("stored quiz item is invalid: {0}")]
    InvalidItem(#[from] QuizItemError),

    #[error("no unanswered questions remain")]
    NothingRemaining,
}

/// Serialized form of a paused session.
///
/// `current_question_index` is 1-based within `items`; `answers` holds every
/// answer of the logical session, including those from earlier resumes, so
/// it can be longer than `current_question_index - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgressRecord {
    pub current_question_index: u32,
    pub answers: Vec<Answer>,
    pub score: u32,
    pub items: Vec<QuizItem>,
    pub options: StudyOptions,
    pub mode: QuizMode,
    pub saved_at: DateTime<Utc>,
}

impl SessionProgressRecord {
    /// Check that the record can be resumed.
    ///
    /// # Errors
    ///
    /// Returns `ResumeError` describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), ResumeError> {
        if self.items.is_empty() {
            return Err(ResumeError::NothingRemaining);
        }
        let index = self.current_question_index;
        if index == 0 || index as usize > self.items.len() {
            return Err(ResumeError::InvalidQuestionIndex {
                index,
                items: self.items.len(),
            });
        }
        if self.answers.len() < (index - 1) as usize {
            return Err(ResumeError::TooFewAnswers {
                answers: self.answers.len(),
                index,
            });
        }

        let correct = self.answers.iter().filter(|a| a.correct).count();
        if correct != self.score as usize {
            return Err(ResumeError::ScoreMismatch {
                score: self.score,
                correct,
            });
        }

        for (position, answer) in self.answers.iter().enumerate() {
            if answer.question_number as usize != position + 1 {
                return Err(ResumeError::QuestionNumbering {
                    position: position + 1,
                    found: answer.question_number,
                });
            }
        }

        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }

    /// Items not yet answered, in order.
    #[must_use]
    pub fn remaining_items(&self) -> &[QuizItem] {
        let start = (self.current_question_index.max(1) - 1) as usize;
        self.items.get(start..).unwrap_or(&[])
    }

    /// Question number the next answer will carry.
    #[must_use]
    pub fn next_question_number(&self) -> u32 {
        u32::try_from(self.answers.len()).unwrap_or(u32::MAX).saturating_add(1)
    }
}

//
// ─── HISTORY ───────────────────────────────────────────────────────────────────
//

/// Immutable record of a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: UserId,
    pub deck_id: DeckId,
    pub cards_studied: u32,
    pub correct_answers: u32,
    pub quiz_type: QuizMode,
    pub details: Vec<QuizDetail>,
    pub next_quiz_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Deck-level FSRS state after this session, input to the next spacing run.
    pub memory: MemoryState,
}

impl HistoryEntry {
    /// Share of correct answers in `[0, 1]`; zero for an empty entry.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.cards_studied == 0 {
            return 0.0;
        }
        f64::from(self.correct_answers) / f64::from(self.cards_studied)
    }
}

/// What the history recorder hands back after an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryReceipt {
    pub entry_id: i64,
    pub next_quiz_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::CardId;
    use crate::model::quiz::OPTION_COUNT;
    use crate::model::score::MasteryScore;
    use crate::time::fixed_now;

    fn item(id: u64, answer: &str) -> QuizItem {
        let options: [String; OPTION_COUNT] =
            [answer.to_owned(), String::new(), String::new(), String::new()];
        QuizItem::new(CardId::new(id), format!("term {id}"), options, answer).unwrap()
    }

    fn answer(number: u32, correct: bool) -> Answer {
        Answer {
            question_number: number,
            card_id: CardId::new(u64::from(number)),
            prompt: format!("term {number}"),
            user_answer: "x".into(),
            correct_answer: "x".into(),
            correct,
            partial: false,
            resulting_mastery: MasteryScore::points(1),
            time_taken_ms: 500,
        }
    }

    fn record() -> SessionProgressRecord {
        SessionProgressRecord {
            current_question_index: 3,
            answers: vec![answer(1, true), answer(2, false)],
            score: 1,
            items: (1..=5).map(|i| item(i, &format!("def {i}"))).collect(),
            options: StudyOptions::default(),
            mode: QuizMode::Learn,
            saved_at: fixed_now(),
        }
    }

    #[test]
    fn valid_record_exposes_remaining_items() {
        let record = record();
        assert_eq!(record.validate(), Ok(()));
        assert_eq!(record.remaining_items().len(), 3);
        assert_eq!(record.remaining_items()[0].card_id(), CardId::new(3));
        assert_eq!(record.next_question_number(), 3);
    }

    #[test]
    fn resumed_records_may_carry_earlier_answers() {
        let mut record = record();
        record.items.drain(..2);
        record.current_question_index = 1;
        assert_eq!(record.validate(), Ok(()));
    }

    #[test]
    fn score_must_match_answers() {
        let mut record = record();
        record.score = 2;
        assert!(matches!(
            record.validate(),
            Err(ResumeError::ScoreMismatch { score: 2, correct: 1 })
        ));
    }

    #[test]
    fn index_past_answers_is_corrupt() {
        let mut record = record();
        record.current_question_index = 5;
        assert!(matches!(
            record.validate(),
            Err(ResumeError::TooFewAnswers { answers: 2, index: 5 })
        ));

        record.current_question_index = 6;
        assert!(matches!(
            record.validate(),
            Err(ResumeError::InvalidQuestionIndex { index: 6, .. })
        ));
    }

    #[test]
    fn gaps_in_numbering_are_corrupt() {
        let mut record = record();
        record.answers[1].question_number = 4;
        assert!(matches!(
            record.validate(),
            Err(ResumeError::QuestionNumbering { position: 2, found: 4 })
        ));
    }

    #[test]
    fn empty_item_list_has_nothing_to_resume() {
        let mut record = record();
        record.items.clear();
        assert_eq!(record.validate(), Err(ResumeError::NothingRemaining));
    }

    #[test]
    fn record_survives_json() {
        let record = record();
        let json = serde_json::to_string(&record).unwrap();
        let back: SessionProgressRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn quiz_mode_parses() {
        assert_eq!("Review".parse::<QuizMode>().unwrap(), QuizMode::Review);
        assert!("cram".parse::<QuizMode>().is_err());
    }
}
