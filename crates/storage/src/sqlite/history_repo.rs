use lingo_core::model::{DeckId, HistoryEntry, HistoryReceipt, QuizDetail, QuizMode, UserId};

use super::SqliteRepository;
use super::mapping::{conn_err, id_i64, map_history_row, ser, write_err};
use crate::repository::{HistoryRecorder, StorageError, schedule_deck, tally};

const HISTORY_COLUMNS: &str = r"
    id, user_id, deck_id, quiz_type, cards_studied, correct_answers, details,
    next_quiz_at, stability, difficulty, created_at
";

#[async_trait::async_trait]
impl HistoryRecorder for SqliteRepository {
    async fn append(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        quiz_type: QuizMode,
        details: &[QuizDetail],
    ) -> Result<HistoryReceipt, StorageError> {
        let now = self.clock.now();
        let (correct, total) = tally(details)?;
        let user = id_i64("user_id", user_id.value())?;
        let deck = id_i64("deck_id", deck_id.value())?;
        let json = serde_json::to_string(details).map_err(ser)?;

        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM quiz_history
             WHERE user_id = ?1 AND deck_id = ?2
             ORDER BY id DESC LIMIT 1"
        );
        let previous = sqlx::query(&sql)
            .bind(user)
            .bind(deck)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn_err)?
            .map(|row| map_history_row(&row))
            .transpose()?;

        let schedule = schedule_deck(
            &self.spacing,
            previous.as_ref().map(|e| (&e.memory, e.created_at)),
            quiz_type,
            correct,
            total,
            now,
        )?;

        let res = sqlx::query(
            r"
            INSERT INTO quiz_history (
                user_id, deck_id, quiz_type, cards_studied, correct_answers, details,
                next_quiz_at, stability, difficulty, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(user)
        .bind(deck)
        .bind(quiz_type.as_str())
        .bind(i64::from(total))
        .bind(i64::from(correct))
        .bind(json)
        .bind(schedule.next_quiz_at)
        .bind(schedule.memory.stability)
        .bind(schedule.memory.difficulty)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        tx.commit().await.map_err(conn_err)?;

        Ok(HistoryReceipt {
            entry_id: res.last_insert_rowid(),
            next_quiz_date: schedule.next_quiz_at,
        })
    }

    async fn list_entries(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM quiz_history
             WHERE user_id = ?1 AND deck_id = ?2
             ORDER BY id DESC LIMIT ?3"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("user_id", user_id.value())?)
            .bind(id_i64("deck_id", deck_id.value())?)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn_err)?;

        rows.iter().map(map_history_row).collect()
    }
}
