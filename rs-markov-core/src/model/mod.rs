//! Token-level Markov chain: tokenization, counting, training and sampling.
//!
//! - Tokenizer (`Tokenizer`, `START` / `END` sentinels)
//! - The chain itself (`ChainModel`, its `Node`s and `Edge`s)
//! - Batch training and incremental updates (`Trainer`)
//! - Seeded or random sampling (`Generator`)

/// Weighted token graph with derived edge probabilities.
pub mod chain_model;

/// Message sampling with mention filtering and stall detection.
pub mod generator;

/// Per-token outgoing edge statistics.
pub mod node;

/// Line to token splitting and the reverse join.
pub mod tokenizer;

/// Corpus ingestion, sequential or parallel.
pub mod trainer;

pub use chain_model::ChainModel;
pub use generator::Generator;
pub use tokenizer::{END, START, Tokenizer};
pub use trainer::Trainer;
