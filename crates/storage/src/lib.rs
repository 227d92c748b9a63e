//! Persistence boundary for the learning engine: card source and sink,
//! progress store, history recorder and decks, with in-memory and `SQLite`
//! backends.

pub mod repository;
pub mod sqlite;

pub use repository::{
    CardRepository, DeckRepository, HistoryRecorder, InMemoryRepository, ProgressStore, Storage,
    StorageError,
};
