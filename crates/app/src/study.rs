use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use lingo_core::judge::judge_text;
use lingo_core::model::{DeckId, HistoryEntry, QuizItem, QuizMode, StudyOptions, UserId, Verdict};
use lingo_engine::{
    AnswerSubmission, Completion, QuizSession, SessionEngine, SessionError, SessionStart,
};

type Input = Lines<BufReader<Stdin>>;

/// What the learner typed at a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Choice(usize),
    Text(String),
    Pause,
    Empty,
}

fn parse_reply(line: &str) -> Reply {
    let trimmed = line.trim();
    match trimmed {
        "" => Reply::Empty,
        "p" | "P" => Reply::Pause,
        _ => match trimmed.parse::<usize>() {
            Ok(n @ 1..=4) => Reply::Choice(n - 1),
            _ => Reply::Text(trimmed.to_string()),
        },
    }
}

fn wants_to_quit(line: &str) -> bool {
    matches!(line.trim(), "q" | "Q")
}

fn print_question(session: &QuizSession, item: &QuizItem) {
    let progress = session.progress();
    println!();
    println!(
        "Question {} ({} of {})  score {}",
        session.next_question_number(),
        progress.answered + 1,
        progress.total,
        progress.score
    );
    println!("  {}", item.prompt());
    for (slot, option) in item.options().iter().enumerate() {
        if !option.is_empty() {
            println!("    {}. {option}", slot + 1);
        }
    }
}

fn print_verdict(verdict: Verdict, item: &QuizItem) {
    match verdict {
        Verdict::Correct => println!("  correct"),
        Verdict::Partial => println!("  almost: {}", item.correct_answer()),
        Verdict::Incorrect => println!("  wrong: {}", item.correct_answer()),
    }
}

fn print_completion(session: &QuizSession, completion: Completion) {
    println!();
    println!(
        "Done: {} of {} correct. Next quiz {}.",
        session.score(),
        session.answers().len(),
        completion.next_quiz_date.format("%Y-%m-%d")
    );
}

/// Offer to retry a failed completion write until it lands. Quitting or
/// closing input returns the last failure.
async fn retry_completion<R: AsyncBufRead + Unpin>(
    engine: &SessionEngine,
    session: &mut QuizSession,
    input: &mut Lines<R>,
    mut failure: SessionError,
) -> Result<Completion, Box<dyn std::error::Error>> {
    loop {
        tracing::warn!(error = %failure, "session completion failed");
        println!("  could not save progress ({failure}), please retry.");
        println!("  Press Enter to retry or q to quit.");

        let Some(line) = input.next_line().await? else {
            return Err(failure.into());
        };
        if wants_to_quit(&line) {
            return Err(failure.into());
        }
        match engine.finalize(session).await {
            Ok(completion) => return Ok(completion),
            Err(err) if session.is_awaiting_finalization() => failure = err,
            Err(err) => return Err(err.into()),
        }
    }
}

/// Run a quiz on stdin/stdout until it completes or the learner pauses.
pub async fn run_study(
    engine: &SessionEngine,
    user_id: UserId,
    deck_id: DeckId,
    mode: QuizMode,
    options: StudyOptions,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        engine.discard_progress(user_id, deck_id).await?;
    }
    let start = engine.start_session(user_id, deck_id, mode, options.clone()).await?;
    let mut session = match start {
        SessionStart::Fresh(session) => session,
        SessionStart::Resumed(session) => {
            println!(
                "Resuming saved {} session at question {}.",
                session.mode(),
                session.next_question_number()
            );
            session
        }
        SessionStart::NoCardsAvailable => {
            let overview = engine.deck_overview(deck_id, &options).await?;
            println!(
                "No cards match this selection ({} cards: {} not studied, {} learning, {} completed, {} due).",
                overview.total,
                overview.not_studied,
                overview.learning,
                overview.completed,
                overview.due
            );
            return Ok(());
        }
    };

    println!("Answer with 1-4 or type the answer. Enter p to save and exit.");
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();

    while let Some(item) = session.current_item().cloned() {
        print_question(&session, &item);

        let Some(line) = input.next_line().await? else {
            engine.save_and_exit(&mut session).await?;
            println!("Input closed, progress saved.");
            return Ok(());
        };
        let submission = match parse_reply(&line) {
            Reply::Empty => continue,
            Reply::Pause => {
                engine.save_and_exit(&mut session).await?;
                println!("Progress saved. Run study again to continue.");
                return Ok(());
            }
            Reply::Choice(index) => match AnswerSubmission::choice(&item, index) {
                Some(submission) => submission,
                None => {
                    println!("  no option {}", index + 1);
                    continue;
                }
            },
            Reply::Text(text) => {
                let verdict = judge_text(item.correct_answer(), &text);
                AnswerSubmission::typed(item.card_id(), text, verdict)
            }
        };

        match engine.submit_answer(&mut session, submission).await {
            Ok(outcome) => {
                print_verdict(outcome.answer.verdict(), &item);
                if let Some(completion) = outcome.completion {
                    print_completion(&session, completion);
                }
            }
            // the last answer is recorded; only the completion write failed
            Err(err) if session.is_awaiting_finalization() => {
                if let Some(answer) = session.answers().last() {
                    print_verdict(answer.verdict(), &item);
                }
                let completion = retry_completion(engine, &mut session, &mut input, err).await?;
                print_completion(&session, completion);
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

pub fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No sessions recorded yet.");
        return;
    }
    for entry in entries {
        println!(
            "#{:<4} {}  {:<6}  {:>3}/{:<3} ({:>5.1}%)  next {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.quiz_type,
            entry.correct_answers,
            entry.cards_studied,
            entry.accuracy() * 100.0,
            entry.next_quiz_date.format("%Y-%m-%d"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lingo_core::model::{Card, CardId};
    use lingo_core::time::{fixed_clock, fixed_now};
    use lingo_engine::SessionStatus;
    use lingo_storage::repository::{
        CardRepository, HistoryRecorder, InMemoryRepository, StorageError,
    };

    const USER: UserId = UserId::new(1);
    const DECK: DeckId = DeckId::new(1);

    /// Card store whose batch writes fail a set number of times.
    struct LockedCards {
        inner: InMemoryRepository,
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl CardRepository for LockedCards {
        async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
            self.inner.upsert_card(card).await
        }

        async fn fetch_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
            self.inner.fetch_cards(deck_id).await
        }

        async fn persist_card_batch(
            &self,
            deck_id: DeckId,
            cards: &[Card],
        ) -> Result<(), StorageError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(StorageError::Connection("database is locked".into()));
            }
            self.inner.persist_card_batch(deck_id, cards).await
        }

        async fn set_card_learning_flag(
            &self,
            deck_id: DeckId,
            card_id: CardId,
            learning: bool,
        ) -> Result<(), StorageError> {
            self.inner.set_card_learning_flag(deck_id, card_id, learning).await
        }
    }

    /// Answers every card of a two-card deck; the completion write fails
    /// `failures` times before it succeeds.
    async fn session_awaiting_save(
        failures: usize,
    ) -> (InMemoryRepository, SessionEngine, QuizSession, SessionError) {
        let repo = InMemoryRepository::new().with_clock(fixed_clock());
        for id in 1..=2 {
            let term = format!("term {id}");
            let card = Card::new(CardId::new(id), DECK, term, format!("def {id}"), fixed_now())
                .unwrap();
            repo.upsert_card(&card).await.unwrap();
        }
        let engine = SessionEngine::new(
            fixed_clock(),
            Arc::new(LockedCards {
                inner: repo.clone(),
                failures_left: AtomicUsize::new(failures),
            }),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        let SessionStart::Fresh(mut session) = engine
            .start_session(USER, DECK, QuizMode::Learn, StudyOptions::default())
            .await
            .unwrap()
        else {
            panic!("expected a fresh session");
        };

        let mut last = None;
        while let Some(item) = session.current_item().cloned() {
            let pick = AnswerSubmission::choice(&item, item.correct_index().unwrap()).unwrap();
            last = engine.submit_answer(&mut session, pick).await.err();
        }
        let failure = last.expect("completion should fail first");
        assert!(session.is_awaiting_finalization());
        (repo, engine, session, failure)
    }

    fn lines(text: &'static str) -> Lines<BufReader<&'static [u8]>> {
        BufReader::new(text.as_bytes()).lines()
    }

    #[tokio::test]
    async fn failed_save_is_retried_until_it_lands() {
        let (repo, engine, mut session, failure) = session_awaiting_save(2).await;
        let mut input = lines("\n\n");

        let completion = retry_completion(&engine, &mut session, &mut input, failure)
            .await
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Completed);
        let entries = repo.list_entries(USER, DECK, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, completion.entry_id);
        assert!(input.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn quitting_a_failed_save_keeps_the_session_waiting() {
        let (repo, engine, mut session, failure) = session_awaiting_save(5).await;
        let mut input = lines("\nq\n");

        let err = retry_completion(&engine, &mut session, &mut input, failure)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SessionError>(),
            Some(SessionError::Persistence(_))
        ));
        assert!(session.is_awaiting_finalization());
        assert!(repo.list_entries(USER, DECK, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_input_stops_retrying() {
        let (_repo, engine, mut session, failure) = session_awaiting_save(1).await;
        let mut input = lines("");

        assert!(retry_completion(&engine, &mut session, &mut input, failure).await.is_err());
        assert!(session.is_awaiting_finalization());
    }

    #[test]
    fn only_q_quits_a_retry() {
        assert!(wants_to_quit(" q "));
        assert!(wants_to_quit("Q"));
        assert!(!wants_to_quit(""));
        assert!(!wants_to_quit("quit later"));
    }

    #[test]
    fn replies_map_to_choices_text_and_pause() {
        assert_eq!(parse_reply(" 2 "), Reply::Choice(1));
        assert_eq!(parse_reply("4"), Reply::Choice(3));
        assert_eq!(parse_reply("5"), Reply::Text("5".into()));
        assert_eq!(parse_reply("P"), Reply::Pause);
        assert_eq!(parse_reply("   "), Reply::Empty);
        assert_eq!(parse_reply("the dog"), Reply::Text("the dog".into()));
    }
}
