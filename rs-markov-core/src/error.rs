use thiserror::Error;

/// Errors raised by training, generation and persistence of chain models.
#[derive(Error, Debug)]
pub enum ChainError {
	/// A corpus, model or recorded-data file could not be read or written.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// A model or configuration file is not valid JSON for its schema.
	#[error("format error: {0}")]
	Format(#[from] serde_json::Error),

	/// A model file parsed but breaks the node invariants.
	#[error("malformed model: {0}")]
	Malformed(String),

	/// The start sentinel has no outgoing edges, nothing can be sampled.
	#[error("model is empty: start token has no successors")]
	ModelEmpty,

	/// Generation reached a token with no speakable successor.
	#[error("generation stalled on token {token:?}: no speakable successor")]
	ModelStalled { token: String },

	/// Generation exceeded the configured token bound.
	#[error("generation exceeded {limit} tokens")]
	GenerationTooLong { limit: usize },

	#[error("corpus not found: {0}")]
	CorpusNotFound(String),

	#[error("model not found: {0}")]
	ModelNotFound(String),

	/// Model and corpus names must be plain file stems.
	#[error("invalid name: {0:?}")]
	InvalidName(String),

	#[error("config error: {0}")]
	Config(String),

	/// A thread panicked while holding the active model lock.
	#[error("active model lock poisoned")]
	LockPoisoned,
}

pub type ChainResult<T> = Result<T, ChainError>;
