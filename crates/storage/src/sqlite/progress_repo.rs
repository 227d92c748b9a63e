use lingo_core::model::{DeckId, SessionProgressRecord, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn_err, id_i64, ser, write_err};
use crate::repository::{ProgressStore, StorageError};

#[async_trait::async_trait]
impl ProgressStore for SqliteRepository {
    async fn save(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        record: &SessionProgressRecord,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(record).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO session_progress (user_id, deck_id, record, saved_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, deck_id) DO UPDATE SET
                record = excluded.record,
                saved_at = excluded.saved_at
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("deck_id", deck_id.value())?)
        .bind(json)
        .bind(record.saved_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn load(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Option<SessionProgressRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT record FROM session_progress WHERE user_id = ?1 AND deck_id = ?2",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("deck_id", deck_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.try_get("record").map_err(ser)?;
        serde_json::from_str(&json).map(Some).map_err(ser)
    }

    async fn delete(&self, user_id: UserId, deck_id: DeckId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_progress WHERE user_id = ?1 AND deck_id = ?2")
            .bind(id_i64("user_id", user_id.value())?)
            .bind(id_i64("deck_id", deck_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;

        Ok(())
    }
}
