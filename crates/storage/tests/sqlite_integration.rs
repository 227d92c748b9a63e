use chrono::Duration;
use lingo_core::model::{
    Answer, Card, CardId, Deck, DeckId, MasteryScore, QuizDetail, QuizItem, QuizMode,
    SessionProgressRecord, StudyOptions, UserId,
};
use lingo_core::scheduler::MemoryState;
use lingo_core::time::{fixed_clock, fixed_now};
use lingo_storage::repository::{
    CardRepository, DeckRepository, HistoryRecorder, ProgressStore, StorageError,
};
use lingo_storage::sqlite::SqliteRepository;

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url)
        .await
        .expect("connect")
        .with_clock(fixed_clock());
    repo.migrate().await.expect("migrate");

    let deck = Deck::new(DeckId::new(1), "Swedish", fixed_now()).unwrap();
    repo.upsert_deck(&deck).await.unwrap();
    repo
}

fn build_card(id: u64) -> Card {
    Card::new(
        CardId::new(id),
        DeckId::new(1),
        format!("term {id}"),
        format!("def {id}"),
        fixed_now(),
    )
    .unwrap()
}

fn record(mode: QuizMode) -> SessionProgressRecord {
    let answer = Answer {
        question_number: 1,
        card_id: CardId::new(1),
        prompt: "term 1".into(),
        user_answer: "def 1".into(),
        correct_answer: "def 1".into(),
        correct: true,
        partial: true,
        resulting_mastery: MasteryScore::from_half_steps(1).unwrap(),
        time_taken_ms: 2_500,
    };
    let item = QuizItem::new(
        CardId::new(2),
        "term 2",
        ["def 2".into(), "def 1".into(), String::new(), String::new()],
        "def 2",
    )
    .unwrap();

    SessionProgressRecord {
        current_question_index: 2,
        answers: vec![answer],
        score: 1,
        items: vec![item.clone(), item],
        options: StudyOptions::default().with_shuffle_cards(true),
        mode,
        saved_at: fixed_now(),
    }
}

fn detail(number: u32, correct: bool) -> QuizDetail {
    QuizDetail {
        question_number: number,
        card_id: CardId::new(u64::from(number)),
        prompt: format!("term {number}"),
        user_answer: "x".into(),
        correct_answer: "x".into(),
        correct,
        partial: false,
        resulting_mastery: MasteryScore::points(1),
        time_taken_ms: 1_000,
    }
}

#[tokio::test]
async fn sqlite_round_trips_cards_with_study_state() {
    let repo = repo("memdb_cards").await;
    let now = fixed_now();

    let plain = build_card(2);
    let scheduled = Card::from_persisted(
        CardId::new(1),
        DeckId::new(1),
        "hund".into(),
        "dog".into(),
        MasteryScore::MAX,
        false,
        Some(now + Duration::days(3)),
        Some(now),
        Some(MemoryState::new(3.2, 4.8)),
        now,
    )
    .unwrap();
    repo.upsert_card(&plain).await.unwrap();
    repo.upsert_card(&scheduled).await.unwrap();

    let cards = repo.fetch_cards(DeckId::new(1)).await.unwrap();
    assert_eq!(cards, vec![scheduled, plain]);
}

#[tokio::test]
async fn sqlite_batch_updates_existing_cards_only() {
    let repo = repo("memdb_batch").await;
    repo.upsert_card(&build_card(1)).await.unwrap();

    let learned = Card::from_persisted(
        CardId::new(1),
        DeckId::new(1),
        "term 1".into(),
        "def 1".into(),
        MasteryScore::points(2),
        true,
        None,
        None,
        None,
        fixed_now(),
    )
    .unwrap();
    repo.persist_card_batch(DeckId::new(1), &[learned.clone(), build_card(9)])
        .await
        .unwrap();

    let cards = repo.fetch_cards(DeckId::new(1)).await.unwrap();
    assert_eq!(cards, vec![learned]);
}

#[tokio::test]
async fn sqlite_learning_flag_checks_card_and_mastery() {
    let repo = repo("memdb_flag").await;
    repo.upsert_card(&build_card(1)).await.unwrap();

    repo.set_card_learning_flag(DeckId::new(1), CardId::new(1), true)
        .await
        .unwrap();
    assert!(repo.fetch_cards(DeckId::new(1)).await.unwrap()[0].is_learning());

    let err = repo
        .set_card_learning_flag(DeckId::new(1), CardId::new(42), true)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let mastered = Card::from_persisted(
        CardId::new(2),
        DeckId::new(1),
        "term 2".into(),
        "def 2".into(),
        MasteryScore::MAX,
        false,
        None,
        None,
        None,
        fixed_now(),
    )
    .unwrap();
    repo.upsert_card(&mastered).await.unwrap();
    let err = repo
        .set_card_learning_flag(DeckId::new(1), CardId::new(2), true)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_progress_overwrites_and_deletes() {
    let repo = repo("memdb_progress").await;
    let (user, deck) = (UserId::new(7), DeckId::new(1));

    assert!(repo.load(user, deck).await.unwrap().is_none());

    repo.save(user, deck, &record(QuizMode::Learn)).await.unwrap();
    repo.save(user, deck, &record(QuizMode::Review)).await.unwrap();
    let loaded = repo.load(user, deck).await.unwrap().unwrap();
    assert_eq!(loaded, record(QuizMode::Review));

    repo.delete(user, deck).await.unwrap();
    repo.delete(user, deck).await.unwrap();
    assert!(repo.load(user, deck).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_corrupt_progress_is_a_serialization_error() {
    let repo = repo("memdb_corrupt").await;

    sqlx::query(
        "INSERT INTO session_progress (user_id, deck_id, record, saved_at) VALUES (1, 1, '{not json', ?1)",
    )
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    let err = repo.load(UserId::new(1), DeckId::new(1)).await.unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[tokio::test]
async fn sqlite_history_chains_deck_memory() {
    let repo = repo("memdb_history").await;
    let (user, deck) = (UserId::new(1), DeckId::new(1));

    let first = repo
        .append(user, deck, QuizMode::Learn, &[detail(1, true), detail(2, true)])
        .await
        .unwrap();
    let second = repo
        .append(user, deck, QuizMode::Review, &[detail(1, false), detail(2, false)])
        .await
        .unwrap();
    assert!(first.next_quiz_date > fixed_now());
    assert!(second.next_quiz_date > fixed_now());

    let entries = repo.list_entries(user, deck, 5).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, second.entry_id);
    assert_eq!(entries[0].quiz_type, QuizMode::Review);
    assert_eq!(entries[0].correct_answers, 0);
    assert_eq!(entries[1].details, vec![detail(1, true), detail(2, true)]);
    assert_eq!(entries[1].next_quiz_date, first.next_quiz_date);

    assert!(repo.list_entries(UserId::new(2), deck, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_storage_shares_one_backend() {
    let storage = lingo_storage::repository::Storage::sqlite(
        "sqlite:file:memdb_storage?mode=memory&cache=shared",
    )
    .await
    .unwrap();

    let deck = Deck::new(DeckId::new(1), "Swedish", fixed_now()).unwrap();
    storage.decks.upsert_deck(&deck).await.unwrap();
    storage.cards.upsert_card(&build_card(1)).await.unwrap();

    assert_eq!(storage.decks.list_decks().await.unwrap(), vec![deck]);
    assert_eq!(storage.cards.fetch_cards(DeckId::new(1)).await.unwrap().len(), 1);
}
