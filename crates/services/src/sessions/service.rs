use chrono::{DateTime, Utc};
use std::collections::HashMap;

use lingo_core::mastery::apply_answer;
use lingo_core::model::{
    Answer, Card, CardId, DeckId, HistoryReceipt, QuizDetail, QuizItem, QuizMode,
    SessionProgressRecord, StudyOptions, UserId, Verdict,
};
use lingo_core::rotation::schedule_after_answer;
use lingo_core::time::elapsed_ms;

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Waiting for the card snapshot; answers are rejected.
    NotStarted,
    InProgress,
    /// Saved to the progress store; resume through a new session.
    Paused,
    Completed,
}

//
// ─── SUBMISSIONS ───────────────────────────────────────────────────────────────
//

/// What the learner gave as an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerResponse {
    /// Index into the current item's options.
    Choice(usize),
    /// Free text, already judged by the caller.
    Text(String),
}

/// One answer event as reported by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub card_id: CardId,
    pub response: AnswerResponse,
    pub correct: bool,
    pub partial: bool,
}

impl AnswerSubmission {
    /// A multiple-choice pick judged against `item`.
    ///
    /// Returns `None` if `index` is not an option slot.
    #[must_use]
    pub fn choice(item: &QuizItem, index: usize) -> Option<Self> {
        let verdict = item.judge_choice(index)?;
        Some(Self {
            card_id: item.card_id(),
            response: AnswerResponse::Choice(index),
            correct: verdict.is_correct(),
            partial: verdict.is_partial(),
        })
    }

    /// A typed answer with an already computed verdict.
    #[must_use]
    pub fn typed(card_id: CardId, text: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            card_id,
            response: AnswerResponse::Text(text.into()),
            correct: verdict.is_correct(),
            partial: verdict.is_partial(),
        }
    }
}

/// Learning flag flip to forward to the card store immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearningFlagChange {
    pub card_id: CardId,
    pub learning: bool,
}

/// Result of a submitted answer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedAnswer {
    pub answer: Answer,
    pub card: Card,
    pub learning_change: Option<LearningFlagChange>,
    /// No more questions; completion must be recorded next.
    pub is_last: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One study session: steps through quiz items, applies the mastery model,
/// and stages changed cards until completion or pause.
///
/// Not thread-safe by itself; callers own it exclusively and submit answers
/// one at a time.
#[derive(Debug, Clone)]
pub struct QuizSession {
    user_id: UserId,
    deck_id: DeckId,
    mode: QuizMode,
    options: StudyOptions,
    retention: f32,
    status: SessionStatus,
    items: Vec<QuizItem>,
    /// 1-based position in `items`.
    current_index: u32,
    answers: Vec<Answer>,
    score: u32,
    cards: HashMap<CardId, Card>,
    staged: Vec<CardId>,
    question_started_at: Option<DateTime<Utc>>,
    receipt: Option<HistoryReceipt>,
    resumed: bool,
}

impl QuizSession {
    /// A session still waiting for its cards.
    #[must_use]
    pub fn new(
        user_id: UserId,
        deck_id: DeckId,
        mode: QuizMode,
        options: StudyOptions,
        retention: f32,
    ) -> Self {
        Self {
            user_id,
            deck_id,
            mode,
            options,
            retention,
            status: SessionStatus::NotStarted,
            items: Vec::new(),
            current_index: 1,
            answers: Vec::new(),
            score: 0,
            cards: HashMap::new(),
            staged: Vec::new(),
            question_started_at: None,
            receipt: None,
            resumed: false,
        }
    }

    /// Install the card snapshot and quiz items, presenting the first question at `now`.
    ///
    /// # Errors
    ///
    /// - `AlreadyLoaded` unless the session is `NotStarted`
    /// - `NoQuestions` if `items` is empty
    /// - `UnknownCard` if an item refers to a card missing from `cards`
    pub fn load(
        &mut self,
        cards: Vec<Card>,
        items: Vec<QuizItem>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.install(cards, items, Vec::new(), 0, now)
    }

    /// Like [`QuizSession::load`], continuing after `answers` from an earlier run.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::load`].
    pub fn load_resumed(
        &mut self,
        cards: Vec<Card>,
        items: Vec<QuizItem>,
        answers: Vec<Answer>,
        score: u32,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.install(cards, items, answers, score, now)?;
        self.resumed = true;
        Ok(())
    }

    fn install(
        &mut self,
        cards: Vec<Card>,
        items: Vec<QuizItem>,
        answers: Vec<Answer>,
        score: u32,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(SessionError::AlreadyLoaded);
        }
        if items.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        let cards: HashMap<CardId, Card> = cards.into_iter().map(|c| (c.id(), c)).collect();
        if let Some(missing) = items.iter().find(|i| !cards.contains_key(&i.card_id())) {
            return Err(SessionError::UnknownCard(missing.card_id()));
        }

        self.cards = cards;
        self.items = items;
        self.answers = answers;
        self.score = score;
        self.current_index = 1;
        self.question_started_at = Some(now);
        self.status = SessionStatus::InProgress;
        Ok(())
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    #[must_use]
    pub fn options(&self) -> &StudyOptions {
        &self.options
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    #[must_use]
    pub fn items(&self) -> &[QuizItem] {
        &self.items
    }

    /// All answers of the logical session, including earlier runs.
    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// 1-based position in this run's item list.
    #[must_use]
    pub fn current_question_index(&self) -> u32 {
        self.current_index
    }

    /// Number the next answer will carry; continues across resumes.
    #[must_use]
    pub fn next_question_number(&self) -> u32 {
        u32::try_from(self.answers.len()).unwrap_or(u32::MAX).saturating_add(1)
    }

    /// The question awaiting an answer.
    #[must_use]
    pub fn current_item(&self) -> Option<&QuizItem> {
        if self.status != SessionStatus::InProgress {
            return None;
        }
        self.items.get((self.current_index - 1) as usize)
    }

    /// Working copy of a card, reflecting answers given so far.
    #[must_use]
    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.cards.get(&card_id)
    }

    /// Next quiz date returned by the history recorder on completion.
    #[must_use]
    pub fn next_quiz_date(&self) -> Option<DateTime<Utc>> {
        self.receipt.map(|r| r.next_quiz_date)
    }

    #[must_use]
    pub fn receipt(&self) -> Option<HistoryReceipt> {
        self.receipt
    }

    /// Every question of this run answered, completion not yet recorded.
    #[must_use]
    pub fn is_awaiting_finalization(&self) -> bool {
        self.status == SessionStatus::InProgress && self.current_index as usize > self.items.len()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.items.len();
        let answered = ((self.current_index - 1) as usize).min(total);
        SessionProgress {
            total,
            answered,
            remaining: total - answered,
            score: self.score,
            next_question_number: self.next_question_number(),
            is_complete: self.status == SessionStatus::Completed,
        }
    }

    /// Record an answer to the current question.
    ///
    /// Everything is computed before any state changes, so a rejected
    /// answer leaves the session untouched.
    ///
    /// # Errors
    ///
    /// - `NotLoadedYet`, `Paused`, `AlreadyCompleted` or `AwaitingFinalization`
    ///   when the session cannot take answers
    /// - `CardMismatch` if the answer is for a different card
    /// - `InvalidOption` for an out-of-range choice
    /// - `Scheduler` if review scheduling fails
    pub fn submit_answer(
        &mut self,
        submission: AnswerSubmission,
        now: DateTime<Utc>,
    ) -> Result<SubmittedAnswer, SessionError> {
        match self.status {
            SessionStatus::NotStarted => return Err(SessionError::NotLoadedYet),
            SessionStatus::Paused => return Err(SessionError::Paused),
            SessionStatus::Completed => return Err(SessionError::AlreadyCompleted),
            SessionStatus::InProgress => {}
        }
        let Some(item) = self.items.get((self.current_index - 1) as usize) else {
            return Err(SessionError::AwaitingFinalization);
        };
        if item.card_id() != submission.card_id {
            return Err(SessionError::CardMismatch {
                expected: item.card_id(),
                submitted: submission.card_id,
            });
        }

        let user_answer = match &submission.response {
            AnswerResponse::Choice(index) => item
                .options()
                .get(*index)
                .cloned()
                .ok_or(SessionError::InvalidOption { index: *index })?,
            AnswerResponse::Text(text) => text.clone(),
        };

        let verdict = Verdict::from_flags(submission.correct, submission.partial);
        let before = self
            .cards
            .get(&item.card_id())
            .ok_or(SessionError::UnknownCard(item.card_id()))?;
        let change = apply_answer(before, verdict);
        let learning_changed = change.learning_changed;
        let card = schedule_after_answer(before, change.card, verdict, self.mode, now, self.retention)?;

        let started = self.question_started_at.unwrap_or(now);
        let answer = Answer {
            question_number: self.next_question_number(),
            card_id: item.card_id(),
            prompt: item.prompt().to_owned(),
            user_answer,
            correct_answer: item.correct_answer().to_owned(),
            correct: verdict.is_correct(),
            partial: verdict.is_partial(),
            resulting_mastery: card.mastery(),
            time_taken_ms: elapsed_ms(started, now),
        };
        let learning_change = learning_changed.then(|| LearningFlagChange {
            card_id: card.id(),
            learning: card.is_learning(),
        });

        // commit
        if !self.staged.contains(&card.id()) {
            self.staged.push(card.id());
        }
        self.cards.insert(card.id(), card.clone());
        if answer.correct {
            self.score += 1;
        }
        self.answers.push(answer.clone());
        self.current_index += 1;
        self.question_started_at = Some(now);

        Ok(SubmittedAnswer {
            answer,
            card,
            learning_change,
            is_last: self.current_index as usize > self.items.len(),
        })
    }

    /// Cards changed by this run, in first-change order.
    #[must_use]
    pub fn staged_cards(&self) -> Vec<Card> {
        self.staged
            .iter()
            .filter_map(|id| self.cards.get(id).cloned())
            .collect()
    }

    /// History lines for every answer of the logical session.
    #[must_use]
    pub fn history_details(&self) -> Vec<QuizDetail> {
        self.answers.iter().map(QuizDetail::from).collect()
    }

    /// Distinct answered cards in first-answer order.
    #[must_use]
    pub fn answered_card_ids(&self) -> Vec<CardId> {
        let mut ids: Vec<CardId> = Vec::new();
        for answer in &self.answers {
            if !ids.contains(&answer.card_id) {
                ids.push(answer.card_id);
            }
        }
        ids
    }

    /// Snapshot for the progress store.
    ///
    /// # Errors
    ///
    /// Returns the status error if the session is not mid-run, and
    /// `AwaitingFinalization` once every question is answered.
    pub fn progress_record(&self, now: DateTime<Utc>) -> Result<SessionProgressRecord, SessionError> {
        self.ensure_running()?;
        if self.is_awaiting_finalization() {
            return Err(SessionError::AwaitingFinalization);
        }
        Ok(SessionProgressRecord {
            current_question_index: self.current_index,
            answers: self.answers.clone(),
            score: self.score,
            items: self.items.clone(),
            options: self.options.clone(),
            mode: self.mode,
            saved_at: now,
        })
    }

    /// # Errors
    ///
    /// See [`QuizSession::progress_record`].
    pub fn mark_paused(&mut self) -> Result<(), SessionError> {
        self.ensure_running()?;
        if self.is_awaiting_finalization() {
            return Err(SessionError::AwaitingFinalization);
        }
        self.status = SessionStatus::Paused;
        self.question_started_at = None;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Incomplete` while questions remain, or the status error if
    /// the session is not mid-run.
    pub fn mark_completed(&mut self, receipt: HistoryReceipt) -> Result<(), SessionError> {
        self.ensure_running()?;
        if !self.is_awaiting_finalization() {
            return Err(SessionError::Incomplete);
        }
        self.receipt = Some(receipt);
        self.status = SessionStatus::Completed;
        self.question_started_at = None;
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::NotStarted => Err(SessionError::NotLoadedYet),
            SessionStatus::Paused => Err(SessionError::Paused),
            SessionStatus::Completed => Err(SessionError::AlreadyCompleted),
            SessionStatus::InProgress => Ok(()),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
