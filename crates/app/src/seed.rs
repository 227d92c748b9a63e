use lingo_core::Clock;
use lingo_core::model::{Card, CardId, Deck, DeckId};
use lingo_storage::repository::{Storage, StorageError};

const DEMO_DECK_NAME: &str = "Swedish basics";

const DEMO_CARDS: &[(&str, &str)] = &[
    ("hund", "dog"),
    ("katt", "cat"),
    ("hus", "house"),
    ("bok", "book"),
    ("vatten", "water"),
    ("bröd", "bread"),
    ("äpple", "apple"),
    ("fönster", "window"),
    ("stol", "chair"),
    ("bord", "table"),
    ("sol", "sun"),
    ("måne", "moon"),
];

/// Create the demo deck unless it already has cards. Returns how many cards
/// were written.
pub async fn seed_demo_deck(
    storage: &Storage,
    clock: &Clock,
    deck_id: DeckId,
) -> Result<usize, Box<dyn std::error::Error>> {
    let now = clock.now();
    match storage.decks.get_deck(deck_id).await {
        Ok(_) => {}
        Err(StorageError::NotFound) => {
            let deck = Deck::new(deck_id, DEMO_DECK_NAME, now)?;
            storage.decks.upsert_deck(&deck).await?;
        }
        Err(err) => return Err(err.into()),
    }

    if !storage.cards.fetch_cards(deck_id).await?.is_empty() {
        tracing::info!(deck_id = %deck_id, "deck already has cards, nothing to seed");
        return Ok(0);
    }

    let first_id = deck_id.value().saturating_mul(1_000);
    for (offset, (term, definition)) in (1_u64..).zip(DEMO_CARDS) {
        let card = Card::new(
            CardId::new(first_id + offset),
            deck_id,
            *term,
            *definition,
            now,
        )?;
        storage.cards.upsert_card(&card).await?;
    }

    tracing::info!(deck_id = %deck_id, cards = DEMO_CARDS.len(), "seeded demo deck");
    Ok(DEMO_CARDS.len())
}
