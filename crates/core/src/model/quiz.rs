use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::answer::Verdict;
use crate::model::ids::CardId;

/// Number of answer slots on every multiple-choice question.
pub const OPTION_COUNT: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizItemError {
    #[error("correct answer cannot be empty")]
    EmptyCorrectAnswer,

    #[error("correct answer {0:?} is not among the options")]
    MissingCorrectAnswer(String),

    #[error("option {0:?} appears more than once")]
    DuplicateOption(String),
}

/// One multiple-choice question derived from a card.
///
/// Empty-string options are padding for decks too small to supply enough
/// distinct wrong answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    card_id: CardId,
    prompt: String,
    options: [String; OPTION_COUNT],
    correct_answer: String,
}

impl QuizItem {
    /// Build a quiz item, checking option invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuizItemError` if the correct answer is empty or missing, or if
    /// two non-empty options are equal.
    pub fn new(
        card_id: CardId,
        prompt: impl Into<String>,
        options: [String; OPTION_COUNT],
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuizItemError> {
        let item = Self {
            card_id,
            prompt: prompt.into(),
            options,
            correct_answer: correct_answer.into(),
        };
        item.validate()?;
        Ok(item)
    }

    pub(crate) fn from_parts(
        card_id: CardId,
        prompt: String,
        options: [String; OPTION_COUNT],
        correct_answer: String,
    ) -> Self {
        Self {
            card_id,
            prompt,
            options,
            correct_answer,
        }
    }

    /// Re-check invariants, e.g. after deserializing a saved session.
    ///
    /// # Errors
    ///
    /// See [`QuizItem::new`].
    pub fn validate(&self) -> Result<(), QuizItemError> {
        if self.correct_answer.is_empty() {
            return Err(QuizItemError::EmptyCorrectAnswer);
        }

        let mut seen = HashSet::with_capacity(OPTION_COUNT);
        for option in self.options.iter().filter(|o| !o.is_empty()) {
            if !seen.insert(option.as_str()) {
                return Err(QuizItemError::DuplicateOption(option.clone()));
            }
        }

        if !seen.contains(self.correct_answer.as_str()) {
            return Err(QuizItemError::MissingCorrectAnswer(
                self.correct_answer.clone(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// Slot holding the correct answer.
    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| *o == self.correct_answer)
    }

    /// Judge a picked slot. `None` when the index is out of range.
    #[must_use]
    pub fn judge_choice(&self, index: usize) -> Option<Verdict> {
        let picked = self.options.get(index)?;
        Some(if *picked == self.correct_answer {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: [&str; OPTION_COUNT]) -> [String; OPTION_COUNT] {
        values.map(str::to_owned)
    }

    #[test]
    fn accepts_padding_and_finds_correct_slot() {
        let item = QuizItem::new(CardId::new(1), "hund", opts(["", "dog", "", ""]), "dog").unwrap();
        assert_eq!(item.correct_index(), Some(1));
        assert_eq!(item.judge_choice(1), Some(Verdict::Correct));
        assert_eq!(item.judge_choice(0), Some(Verdict::Incorrect));
        assert_eq!(item.judge_choice(4), None);
    }

    #[test]
    fn rejects_duplicates_and_missing_answer() {
        let err = QuizItem::new(CardId::new(1), "hund", opts(["cat", "dog", "cat", ""]), "dog")
            .unwrap_err();
        assert_eq!(err, QuizItemError::DuplicateOption("cat".into()));

        let err = QuizItem::new(CardId::new(1), "hund", opts(["cat", "cow", "", ""]), "dog")
            .unwrap_err();
        assert_eq!(err, QuizItemError::MissingCorrectAnswer("dog".into()));

        let err =
            QuizItem::new(CardId::new(1), "hund", opts(["", "", "", ""]), "").unwrap_err();
        assert_eq!(err, QuizItemError::EmptyCorrectAnswer);
    }
}
