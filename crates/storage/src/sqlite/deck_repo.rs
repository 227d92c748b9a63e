use lingo_core::model::{Deck, DeckId};

use super::SqliteRepository;
use super::mapping::{conn_err, id_i64, map_deck_row, write_err};
use crate::repository::{DeckRepository, StorageError};

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO decks (id, name, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name
            ",
        )
        .bind(id_i64("deck_id", deck.id().value())?)
        .bind(deck.name().to_owned())
        .bind(deck.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Deck, StorageError> {
        let row = sqlx::query("SELECT id, name, created_at FROM decks WHERE id = ?1")
            .bind(id_i64("deck_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn_err)?
            .ok_or(StorageError::NotFound)?;

        map_deck_row(&row)
    }

    async fn list_decks(&self) -> Result<Vec<Deck>, StorageError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM decks ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn_err)?;

        rows.iter().map(map_deck_row).collect()
    }
}
