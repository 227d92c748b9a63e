use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::DeckId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck name cannot be empty")]
    EmptyName,
}

/// A named collection of cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    id: DeckId,
    name: String,
    created_at: DateTime<Utc>,
}

impl Deck {
    /// Create a deck, trimming the name.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::EmptyName` if the trimmed name is empty.
    pub fn new(
        id: DeckId,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(DeckError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn deck_name_is_trimmed_and_required() {
        let deck = Deck::new(DeckId::new(1), "  Swedish  ", fixed_now()).unwrap();
        assert_eq!(deck.name(), "Swedish");

        let err = Deck::new(DeckId::new(1), "   ", fixed_now()).unwrap_err();
        assert_eq!(err, DeckError::EmptyName);
    }
}
