use chrono::{DateTime, Utc};
use std::collections::HashMap;

use lingo_core::generator::{generate_items_for, generate_quiz};
use lingo_core::model::{Card, CardId, QuizItem, ResumeError, SessionProgressRecord, StudyOptions};
use lingo_core::selector::select_cards;

/// Cards and questions for a fresh run.
#[derive(Debug, Clone)]
pub(crate) struct FreshPlan {
    pub cards: Vec<Card>,
    pub items: Vec<QuizItem>,
}

/// Cards and questions to continue a saved run.
#[derive(Debug, Clone)]
pub(crate) struct ResumePlan {
    pub cards: Vec<Card>,
    pub items: Vec<QuizItem>,
    /// Saved items whose card no longer exists.
    pub dropped: usize,
}

/// Pure planning over a deck snapshot. Randomness stays inside these calls so
/// nothing non-`Send` lives across an await.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Select cards with `options` and build one question per card.
    ///
    /// Returns `None` when no card qualifies.
    pub fn plan_fresh(
        snapshot: Vec<Card>,
        options: &StudyOptions,
        now: DateTime<Utc>,
    ) -> Option<FreshPlan> {
        let selected = select_cards(&snapshot, options, now);
        if selected.is_empty() {
            return None;
        }
        let items = generate_quiz(&selected);
        Some(FreshPlan {
            cards: snapshot,
            items,
        })
    }

    /// Rebuild the unanswered questions of `record` against the current deck.
    ///
    /// Options are regenerated with fresh distractors; prompts and answers
    /// follow the current card text.
    ///
    /// # Errors
    ///
    /// Returns `ResumeError` when the record is inconsistent, or
    /// `ResumeError::NothingRemaining` when every remaining card was deleted.
    pub fn plan_resume(
        snapshot: Vec<Card>,
        record: &SessionProgressRecord,
    ) -> Result<ResumePlan, ResumeError> {
        record.validate()?;

        let by_id: HashMap<CardId, &Card> = snapshot.iter().map(|c| (c.id(), c)).collect();
        let remaining = record.remaining_items();
        let targets: Vec<Card> = remaining
            .iter()
            .filter_map(|item| by_id.get(&item.card_id()).map(|c| (*c).clone()))
            .collect();
        if targets.is_empty() {
            return Err(ResumeError::NothingRemaining);
        }

        let dropped = remaining.len() - targets.len();
        let items = generate_items_for(&targets, &snapshot, &mut rand::rng());
        Ok(ResumePlan {
            cards: snapshot,
            items,
            dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_core::model::{Answer, CardTypeToLearn, DeckId, MasteryScore, QuizMode};
    use lingo_core::time::fixed_now;

    fn card(id: u64) -> Card {
        Card::new(CardId::new(id), DeckId::new(1), format!("term {id}"), format!("def {id}"), fixed_now())
            .unwrap()
    }

    fn record_over(cards: &[Card], answered: usize) -> SessionProgressRecord {
        let items = generate_quiz(cards);
        let answers = items[..answered]
            .iter()
            .enumerate()
            .map(|(i, item)| Answer {
                question_number: u32::try_from(i + 1).unwrap(),
                card_id: item.card_id(),
                prompt: item.prompt().to_owned(),
                user_answer: item.correct_answer().to_owned(),
                correct_answer: item.correct_answer().to_owned(),
                correct: true,
                partial: false,
                resulting_mastery: MasteryScore::points(1),
                time_taken_ms: 1_000,
            })
            .collect();
        SessionProgressRecord {
            current_question_index: u32::try_from(answered + 1).unwrap(),
            answers,
            score: u32::try_from(answered).unwrap(),
            items,
            options: StudyOptions::default(),
            mode: QuizMode::Learn,
            saved_at: fixed_now(),
        }
    }

    #[test]
    fn fresh_plan_is_none_without_matching_cards() {
        let options = StudyOptions::default().with_card_type(CardTypeToLearn::Completed);
        assert!(SessionQueries::plan_fresh(vec![card(1), card(2)], &options, fixed_now()).is_none());
    }

    #[test]
    fn fresh_plan_questions_only_the_selected_cards() {
        let options = StudyOptions::default().with_cards_to_learn(2).unwrap();
        let plan = SessionQueries::plan_fresh(vec![card(1), card(2), card(3)], &options, fixed_now())
            .unwrap();
        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.cards.len(), 3);
        // distractors come from the selection, so one wrong answer plus padding
        let filled = plan.items[0].options().iter().filter(|o| !o.is_empty()).count();
        assert_eq!(filled, 2);
    }

    #[test]
    fn resume_skips_deleted_cards() {
        let cards: Vec<Card> = (1..=4).map(card).collect();
        let record = record_over(&cards, 1);
        let deleted = record.items[2].card_id();
        let snapshot: Vec<Card> = cards.into_iter().filter(|c| c.id() != deleted).collect();

        let plan = SessionQueries::plan_resume(snapshot, &record).unwrap();
        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.dropped, 1);
        assert!(plan.items.iter().all(|i| i.card_id() != deleted));
        assert_eq!(plan.items[0].card_id(), record.items[1].card_id());
    }

    #[test]
    fn resume_with_every_card_deleted_has_nothing_remaining() {
        let cards: Vec<Card> = (1..=2).map(card).collect();
        let record = record_over(&cards, 1);
        let answered = record.items[0].card_id();
        let snapshot: Vec<Card> = cards.into_iter().filter(|c| c.id() == answered).collect();

        assert!(matches!(
            SessionQueries::plan_resume(snapshot, &record),
            Err(ResumeError::NothingRemaining)
        ));
    }

    #[test]
    fn resume_rejects_inconsistent_record() {
        let cards: Vec<Card> = (1..=3).map(card).collect();
        let mut record = record_over(&cards, 1);
        record.score = 3;
        assert!(matches!(
            SessionQueries::plan_resume(cards, &record),
            Err(ResumeError::ScoreMismatch { .. })
        ));
    }
}
