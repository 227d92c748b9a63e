//! Domain model and pure study rules for the flashcard learning engine.
//!
//! Nothing in this crate performs I/O: card selection, quiz generation,
//! mastery updates and review scheduling are plain functions over values.
#![forbid(unsafe_code)]

pub mod generator;
pub mod judge;
pub mod mastery;
pub mod model;
pub mod rotation;
pub mod scheduler;
pub mod selector;
pub mod spacing;
pub mod time;

pub use time::Clock;
