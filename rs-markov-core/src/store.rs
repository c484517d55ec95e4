use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ChainConfig;
use crate::error::{ChainError, ChainResult};
use crate::io;
use crate::model::ChainModel;

const CORPUS_EXTENSION: &str = "txt";
const MODEL_EXTENSION: &str = "json";

/// File-backed storage for corpora and trained models.
///
/// A corpus `name` lives at `<corpus_dir>/<name>.txt` and the model
/// trained from it at `<model_dir>/<name>.json`. The store only reads
/// and writes; it never trains a missing model.
#[derive(Clone, Debug)]
pub struct ModelStore {
	corpus_dir: PathBuf,
	model_dir: PathBuf,
}

impl ModelStore {
	pub fn new<C: Into<PathBuf>, M: Into<PathBuf>>(corpus_dir: C, model_dir: M) -> Self {
		Self { corpus_dir: corpus_dir.into(), model_dir: model_dir.into() }
	}

	pub fn from_config(config: &ChainConfig) -> Self {
		Self::new(&config.corpus_dir, &config.model_dir)
	}

	fn corpus_path(&self, name: &str) -> ChainResult<PathBuf> {
		check_name(name)?;
		Ok(self.corpus_dir.join(format!("{name}.{CORPUS_EXTENSION}")))
	}

	pub fn model_path(&self, name: &str) -> ChainResult<PathBuf> {
		check_name(name)?;
		Ok(self.model_dir.join(format!("{name}.{MODEL_EXTENSION}")))
	}

	/// Writes `model` as `<model_dir>/<name>.json`.
	///
	/// The file is replaced atomically: after a crash it holds either
	/// the previous model or the new one.
	pub fn save(&self, model: &ChainModel, name: &str) -> ChainResult<()> {
		let path = self.model_path(name)?;
		fs::create_dir_all(&self.model_dir)?;
		let bytes = serde_json::to_vec(model)?;
		io::write_atomic(&path, &bytes)?;
		log::info!("Saved model {} ({} nodes)", path.display(), model.node_count());
		Ok(())
	}

	/// Reads and validates the model saved under `name`.
	///
	/// # Errors
	/// - `ModelNotFound` if no model file exists
	/// - `Format` / `Malformed` if the file is not a valid model
	pub fn load(&self, name: &str) -> ChainResult<ChainModel> {
		let path = self.model_path(name)?;
		if !path.is_file() {
			return Err(ChainError::ModelNotFound(name.to_owned()));
		}
		let model = Self::load_snapshot(&path)?;
		log::info!("Loaded model {}", path.display());
		Ok(model)
	}

	/// Reads a model file from an arbitrary path, e.g. an initial snapshot.
	pub fn load_snapshot<P: AsRef<Path>>(path: P) -> ChainResult<ChainModel> {
		let bytes = fs::read(path)?;
		let model: ChainModel = serde_json::from_slice(&bytes)?;
		model.validate()?;
		Ok(model)
	}

	/// Names of the available corpora, sorted.
	pub fn list_corpora(&self) -> ChainResult<Vec<String>> {
		Ok(io::list_files(&self.corpus_dir, CORPUS_EXTENSION)?)
	}

	/// Names of the trained models, sorted.
	pub fn list_models(&self) -> ChainResult<Vec<String>> {
		Ok(io::list_files(&self.model_dir, MODEL_EXTENSION)?)
	}

	pub fn corpus_exists(&self, name: &str) -> bool {
		self.corpus_path(name).is_ok_and(|p| p.is_file())
	}

	pub fn model_exists_for(&self, corpus_name: &str) -> bool {
		self.model_path(corpus_name).is_ok_and(|p| p.is_file())
	}

	/// Reads the lines of corpus `name`.
	pub fn read_corpus(&self, name: &str) -> ChainResult<Vec<String>> {
		let path = self.corpus_path(name)?;
		if !path.is_file() {
			return Err(ChainError::CorpusNotFound(name.to_owned()));
		}
		Ok(io::read_file(path)?)
	}
}

/// Accepts plain file stems only.
fn check_name(name: &str) -> ChainResult<()> {
	let invalid = name.is_empty()
		|| name == "."
		|| name == ".."
		|| name.contains(['/', '\\', '\0'])
		|| name.trim() != name;
	if invalid {
		return Err(ChainError::InvalidName(name.to_owned()));
	}
	Ok(())
}
