use lingo_core::model::{Card, CardId, DeckId};

use super::SqliteRepository;
use super::mapping::{conn_err, id_i64, map_card_row, write_err};
use crate::repository::{CardRepository, StorageError};

const CARD_COLUMNS: &str = r"
    id, deck_id, term, definition, mastery_half_steps, learning,
    next_review_at, last_reviewed_at, stability, difficulty, created_at
";

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO cards (
                id, deck_id, term, definition, mastery_half_steps, learning,
                next_review_at, last_reviewed_at, stability, difficulty, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id, deck_id) DO UPDATE SET
                -- keep created_at from the original insert
                term = excluded.term,
                definition = excluded.definition,
                mastery_half_steps = excluded.mastery_half_steps,
                learning = excluded.learning,
                next_review_at = excluded.next_review_at,
                last_reviewed_at = excluded.last_reviewed_at,
                stability = excluded.stability,
                difficulty = excluded.difficulty
            ",
        )
        .bind(id_i64("card_id", card.id().value())?)
        .bind(id_i64("deck_id", card.deck_id().value())?)
        .bind(card.term().to_owned())
        .bind(card.definition().to_owned())
        .bind(i64::from(card.mastery().half_steps()))
        .bind(card.is_learning())
        .bind(card.next_review_at())
        .bind(card.last_reviewed_at())
        .bind(card.memory().map(|m| m.stability))
        .bind(card.memory().map(|m| m.difficulty))
        .bind(card.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn fetch_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(id_i64("deck_id", deck_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn_err)?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_card_row(&row)?);
        }
        Ok(cards)
    }

    async fn persist_card_batch(
        &self,
        deck_id: DeckId,
        cards: &[Card],
    ) -> Result<(), StorageError> {
        if cards.iter().any(|card| card.deck_id() != deck_id) {
            return Err(StorageError::Conflict);
        }
        let deck = id_i64("deck_id", deck_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        let mut skipped = 0_usize;
        for card in cards {
            let res = sqlx::query(
                r"
                UPDATE cards SET
                    mastery_half_steps = ?3,
                    learning = ?4,
                    next_review_at = ?5,
                    last_reviewed_at = ?6,
                    stability = ?7,
                    difficulty = ?8
                WHERE id = ?1 AND deck_id = ?2
                ",
            )
            .bind(id_i64("card_id", card.id().value())?)
            .bind(deck)
            .bind(i64::from(card.mastery().half_steps()))
            .bind(card.is_learning())
            .bind(card.next_review_at())
            .bind(card.last_reviewed_at())
            .bind(card.memory().map(|m| m.stability))
            .bind(card.memory().map(|m| m.difficulty))
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

            if res.rows_affected() == 0 {
                skipped += 1;
            }
        }
        tx.commit().await.map_err(conn_err)?;

        if skipped > 0 {
            tracing::debug!(deck_id = %deck_id, skipped, "batch skipped cards missing from deck");
        }
        Ok(())
    }

    async fn set_card_learning_flag(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        learning: bool,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE cards SET learning = ?3 WHERE id = ?1 AND deck_id = ?2")
            .bind(id_i64("card_id", card_id.value())?)
            .bind(id_i64("deck_id", deck_id.value())?)
            .bind(learning)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
