use lingo_core::model::{
    Card, CardId, Deck, DeckId, HistoryEntry, MasteryScore, QuizDetail, QuizMode, UserId,
};
use lingo_core::scheduler::MemoryState;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Constraint violations are conflicts; everything else is a backend failure.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_check_violation() || db.is_unique_violation() => StorageError::Conflict,
        Some(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    Ok(CardId::new(i64_to_u64("card_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

fn memory_from_columns(
    stability: Option<f64>,
    difficulty: Option<f64>,
) -> Result<Option<MemoryState>, StorageError> {
    match (stability, difficulty) {
        (Some(s), Some(d)) => Ok(Some(MemoryState::new(s, d))),
        (None, None) => Ok(None),
        _ => Err(StorageError::Serialization(
            "stability and difficulty must be set together".into(),
        )),
    }
}

pub(crate) fn map_deck_row(row: &SqliteRow) -> Result<Deck, StorageError> {
    Deck::new(
        deck_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_card_row(row: &SqliteRow) -> Result<Card, StorageError> {
    let half_steps: i64 = row.try_get("mastery_half_steps").map_err(ser)?;
    let half_steps = u8::try_from(half_steps)
        .map_err(|_| StorageError::Serialization(format!("invalid mastery: {half_steps}")))?;
    let mastery = MasteryScore::from_half_steps(half_steps).map_err(ser)?;

    let memory = memory_from_columns(
        row.try_get("stability").map_err(ser)?,
        row.try_get("difficulty").map_err(ser)?,
    )?;

    Card::from_persisted(
        card_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
        row.try_get::<String, _>("term").map_err(ser)?,
        row.try_get::<String, _>("definition").map_err(ser)?,
        mastery,
        row.try_get::<bool, _>("learning").map_err(ser)?,
        row.try_get("next_review_at").map_err(ser)?,
        row.try_get("last_reviewed_at").map_err(ser)?,
        memory,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_history_row(row: &SqliteRow) -> Result<HistoryEntry, StorageError> {
    let quiz_type: String = row.try_get("quiz_type").map_err(ser)?;
    let details: String = row.try_get("details").map_err(ser)?;
    let details: Vec<QuizDetail> = serde_json::from_str(&details).map_err(ser)?;

    Ok(HistoryEntry {
        id: row.try_get("id").map_err(ser)?,
        user_id: user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        deck_id: deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
        cards_studied: u32_from_i64(
            "cards_studied",
            row.try_get::<i64, _>("cards_studied").map_err(ser)?,
        )?,
        correct_answers: u32_from_i64(
            "correct_answers",
            row.try_get::<i64, _>("correct_answers").map_err(ser)?,
        )?,
        quiz_type: quiz_type.parse::<QuizMode>().map_err(ser)?,
        details,
        next_quiz_date: row.try_get("next_quiz_at").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        memory: MemoryState::new(
            row.try_get("stability").map_err(ser)?,
            row.try_get("difficulty").map_err(ser)?,
        ),
    })
}
