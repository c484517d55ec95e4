use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};

/// Runtime configuration shared by the server and the CLI.
///
/// Every field has a default, so a config file only needs to list
/// the values it overrides.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ChainConfig {
	/// Directory holding raw `.txt` corpora (one message per line).
	pub corpus_dir: PathBuf,

	/// Directory holding trained `.json` models, named after their corpus.
	pub model_dir: PathBuf,

	/// Append-only file collecting live messages for the next update.
	pub recorded_data_path: PathBuf,

	/// Corpus whose model is made active on startup.
	pub default_corpus: String,

	/// Optional model file every `train` starts from instead of an empty model.
	pub initial_snapshot: Option<PathBuf>,

	/// Characters split off into their own tokens. Empty by default.
	pub delimiters: String,

	/// Round the running average message length after every training call.
	pub round_average_length: bool,

	/// Upper bound on generated tokens, unbounded when `None`.
	pub max_tokens: Option<usize>,

	pub bind_address: String,
	pub port: u16,
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self {
			corpus_dir: PathBuf::from("./data"),
			model_dir: PathBuf::from("./markov_chains"),
			recorded_data_path: PathBuf::from("./data/recorded_data.log"),
			default_corpus: "beemovie".to_owned(),
			initial_snapshot: None,
			delimiters: String::new(),
			round_average_length: true,
			max_tokens: None,
			bind_address: "127.0.0.1".to_owned(),
			port: 5000,
		}
	}
}

impl ChainConfig {
	/// Reads and validates a JSON config file.
	///
	/// # Errors
	/// Returns an error if the file cannot be read, is not valid JSON,
	/// or holds invalid values.
	pub fn load<P: AsRef<Path>>(path: P) -> ChainResult<Self> {
		let contents = std::fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&contents)?;
		config.validate()?;
		Ok(config)
	}

	/// Same as `load`, but a missing file yields the default configuration.
	pub fn load_or_default<P: AsRef<Path>>(path: P) -> ChainResult<Self> {
		let path = path.as_ref();
		if !path.exists() {
			log::info!("No config at {}, using defaults", path.display());
			let config = Self::default();
			config.validate()?;
			return Ok(config);
		}
		Self::load(path)
	}

	/// Checks values that serde cannot reject on its own.
	pub fn validate(&self) -> ChainResult<()> {
		if self.corpus_dir.as_os_str().is_empty() {
			return Err(ChainError::Config("corpus_dir must not be empty".to_owned()));
		}
		if self.model_dir.as_os_str().is_empty() {
			return Err(ChainError::Config("model_dir must not be empty".to_owned()));
		}
		if self.recorded_data_path.as_os_str().is_empty() {
			return Err(ChainError::Config("recorded_data_path must not be empty".to_owned()));
		}
		if self.default_corpus.trim().is_empty() {
			return Err(ChainError::Config("default_corpus must not be empty".to_owned()));
		}
		if self.delimiters.contains(' ') {
			return Err(ChainError::Config("delimiters must not contain a space".to_owned()));
		}
		if self.max_tokens == Some(0) {
			return Err(ChainError::Config("max_tokens must be positive".to_owned()));
		}
		if self.port == 0 {
			return Err(ChainError::Config("port must be non-zero".to_owned()));
		}
		Ok(())
	}
}
