//! Token-level Markov chain text generation library.
//!
//! This crate provides the engine behind a chat bot that imitates its
//! corpus:
//! - Tokenization of chat lines, keeping mentions and pings whole
//! - A first-order chain model with derived transition probabilities
//! - Batch training and incremental updates, counted in parallel
//! - Seeded sampling that never emits mentions and never spins
//! - JSON persistence of models next to their corpora
//! - A single active model shared between readers and writers

/// Chain model, tokenizer, trainer and generator.
pub mod model;

/// Active model slot and the operations that replace it.
pub mod active;

/// Runtime configuration (directories, tokenizer and training options).
pub mod config;

/// Error type shared by every operation of the crate.
pub mod error;

/// Recorded-data log of live messages.
pub mod recorder;

/// Corpus and model files on disk.
pub mod store;

/// I/O utilities (line reading, listing, atomic writes).
///
/// Not exposed
pub(crate) mod io;

pub use active::{ActiveChain, LoadedChain};
pub use config::ChainConfig;
pub use error::{ChainError, ChainResult};
pub use recorder::Recorder;
pub use store::ModelStore;
