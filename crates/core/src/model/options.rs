use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use thiserror::Error;

/// Default cap on the number of cards in one session.
pub const DEFAULT_CARDS_TO_LEARN: u32 = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OptionsError {
    #[error("cards to learn must be > 0")]
    InvalidCardsToLearn,

    #[error("unknown card type: {0}")]
    UnknownCardType(String),
}

/// Which slice of the deck a session draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardTypeToLearn {
    #[default]
    All,
    /// Mastery exactly zero.
    NotStudied,
    /// Mastery in `[1, 5)`.
    Learning,
    /// Mastery at 5.
    Completed,
    /// Review date set and already passed.
    DueForReview,
}

impl CardTypeToLearn {
    pub const ALL: [Self; 5] = [
        Self::All,
        Self::NotStudied,
        Self::Learning,
        Self::Completed,
        Self::DueForReview,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::NotStudied => "not_studied",
            Self::Learning => "learning",
            Self::Completed => "completed",
            Self::DueForReview => "due_for_review",
        }
    }
}

impl fmt::Display for CardTypeToLearn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardTypeToLearn {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all" => Ok(Self::All),
            "not_studied" | "new" => Ok(Self::NotStudied),
            "learning" => Ok(Self::Learning),
            "completed" => Ok(Self::Completed),
            "due_for_review" | "due" => Ok(Self::DueForReview),
            _ => Err(OptionsError::UnknownCardType(s.to_owned())),
        }
    }
}

/// Card selection settings for a study session.
///
/// Persisted alongside paused sessions so a resume selects identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyOptions {
    include_completed_cards: bool,
    card_type: CardTypeToLearn,
    cards_to_learn: NonZeroU32,
    shuffle_cards: bool,
}

impl Default for StudyOptions {
    fn default() -> Self {
        Self {
            include_completed_cards: false,
            card_type: CardTypeToLearn::All,
            cards_to_learn: NonZeroU32::new(DEFAULT_CARDS_TO_LEARN).unwrap_or(NonZeroU32::MIN),
            shuffle_cards: false,
        }
    }
}

impl StudyOptions {
    /// Creates custom selection settings.
    ///
    /// # Errors
    ///
    /// Returns `OptionsError::InvalidCardsToLearn` if `cards_to_learn` is zero.
    pub fn new(
        include_completed_cards: bool,
        card_type: CardTypeToLearn,
        cards_to_learn: u32,
        shuffle_cards: bool,
    ) -> Result<Self, OptionsError> {
        let cards_to_learn =
            NonZeroU32::new(cards_to_learn).ok_or(OptionsError::InvalidCardsToLearn)?;
        Ok(Self {
            include_completed_cards,
            card_type,
            cards_to_learn,
            shuffle_cards,
        })
    }

    #[must_use]
    pub fn with_include_completed_cards(mut self, include: bool) -> Self {
        self.include_completed_cards = include;
        self
    }

    #[must_use]
    pub fn with_card_type(mut self, card_type: CardTypeToLearn) -> Self {
        self.card_type = card_type;
        self
    }

    /// # Errors
    ///
    /// Returns `OptionsError::InvalidCardsToLearn` if `limit` is zero.
    pub fn with_cards_to_learn(mut self, limit: u32) -> Result<Self, OptionsError> {
        self.cards_to_learn = NonZeroU32::new(limit).ok_or(OptionsError::InvalidCardsToLearn)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_shuffle_cards(mut self, shuffle: bool) -> Self {
        self.shuffle_cards = shuffle;
        self
    }

    #[must_use]
    pub fn include_completed_cards(&self) -> bool {
        self.include_completed_cards
    }

    #[must_use]
    pub fn card_type(&self) -> CardTypeToLearn {
        self.card_type
    }

    #[must_use]
    pub fn cards_to_learn(&self) -> u32 {
        self.cards_to_learn.get()
    }

    #[must_use]
    pub fn shuffle_cards(&self) -> bool {
        self.shuffle_cards
    }
}
