use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use rand::Rng;

use crate::config::ChainConfig;
use crate::error::{ChainError, ChainResult};
use crate::model::{ChainModel, Generator, Trainer};
use crate::recorder::Recorder;
use crate::store::ModelStore;

/// A model together with the corpus name it was trained from.
#[derive(Debug)]
pub struct LoadedChain {
	name: String,
	model: ChainModel,
}

impl LoadedChain {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn model(&self) -> &ChainModel {
		&self.model
	}
}

/// Owner of the one active chain model.
///
/// # Concurrency
/// - Readers clone the current `Arc` under a short read lock and sample
///   from that snapshot without holding any lock
/// - Writers are serialized by `writer`, build the replacement model
///   off to the side, then swap the `Arc` under the write lock
///
/// A failed load, train or save leaves the active model untouched.
#[derive(Debug)]
pub struct ActiveChain {
	slot: RwLock<Arc<LoadedChain>>,
	writer: Mutex<()>,
	store: ModelStore,
	trainer: Trainer,
	generator: Generator,
	recorder: Recorder,
}

impl ActiveChain {
	/// Builds every component from `config` and activates the default corpus.
	///
	/// # Errors
	/// Returns an error if the initial snapshot or the default model
	/// cannot be read, or if training the default corpus fails.
	pub fn open(config: &ChainConfig) -> ChainResult<Self> {
		let mut trainer = Trainer::from_config(config);
		if let Some(path) = &config.initial_snapshot {
			trainer = trainer.with_initial(ModelStore::load_snapshot(path)?);
		}

		Self::with_parts(
			ModelStore::from_config(config),
			trainer,
			Generator::from_config(config),
			Recorder::new(&config.recorded_data_path),
			&config.default_corpus,
		)
	}

	/// Assembles a chain from explicit parts and activates `name`.
	///
	/// When neither a model nor a corpus exists for `name`, the trainer's
	/// initial snapshot is activated instead.
	pub fn with_parts(
		store: ModelStore,
		trainer: Trainer,
		generator: Generator,
		recorder: Recorder,
		name: &str,
	) -> ChainResult<Self> {
		let model = match Self::load_or_train(&store, &trainer, name) {
			Ok(model) => model,
			Err(ChainError::CorpusNotFound(_)) => {
				log::warn!("No model or corpus named {name}, starting from the initial snapshot");
				trainer.train::<&str>(&[]).0
			}
			Err(e) => return Err(e),
		};

		Ok(Self {
			slot: RwLock::new(Arc::new(LoadedChain { name: name.to_owned(), model })),
			writer: Mutex::new(()),
			store,
			trainer,
			generator,
			recorder,
		})
	}

	/// Loads the saved model for `name`, or trains and saves one from
	/// the corpus of the same name.
	fn load_or_train(store: &ModelStore, trainer: &Trainer, name: &str) -> ChainResult<ChainModel> {
		if store.model_exists_for(name) {
			return store.load(name);
		}

		log::info!("Model {name} not found, training it");
		let lines = store.read_corpus(name)?;
		let (model, processed) = trainer.train(&lines);
		store.save(&model, name)?;
		log::info!("Trained {name} with {processed} messages");
		Ok(model)
	}

	/// The current model, shared with any in-flight readers.
	pub fn snapshot(&self) -> ChainResult<Arc<LoadedChain>> {
		let slot = self.slot.read().map_err(|_| ChainError::LockPoisoned)?;
		Ok(Arc::clone(&slot))
	}

	/// Name of the corpus the active model was trained from.
	pub fn current_name(&self) -> ChainResult<String> {
		Ok(self.snapshot()?.name.clone())
	}

	pub fn store(&self) -> &ModelStore {
		&self.store
	}

	fn lock_writer(&self) -> ChainResult<MutexGuard<'_, ()>> {
		self.writer.lock().map_err(|_| ChainError::LockPoisoned)
	}

	fn swap(&self, name: &str, model: ChainModel) -> ChainResult<()> {
		let replacement = Arc::new(LoadedChain { name: name.to_owned(), model });
		let mut slot = self.slot.write().map_err(|_| ChainError::LockPoisoned)?;
		*slot = replacement;
		log::info!("Swapped active chain to {name}");
		Ok(())
	}

	/// Makes the model of corpus `name` active, training it first if
	/// only the corpus exists.
	///
	/// # Errors
	/// `CorpusNotFound` if neither a model nor a corpus exists for `name`.
	pub fn switch_to(&self, name: &str) -> ChainResult<()> {
		let _guard = self.lock_writer()?;
		let model = Self::load_or_train(&self.store, &self.trainer, name)?;
		self.swap(name, model)
	}

	/// Retrains the active model from scratch with its corpus.
	///
	/// Returns the number of messages learned.
	pub fn reset(&self) -> ChainResult<usize> {
		let _guard = self.lock_writer()?;
		let name = self.current_name()?;
		let lines = self.store.read_corpus(&name)?;
		let (model, processed) = self.trainer.train(&lines);
		self.store.save(&model, &name)?;
		self.swap(&name, model)?;
		log::info!("Reset {name} with {processed} messages");
		Ok(processed)
	}

	/// Learns the recorded messages into the active model, then empties
	/// the recorded-data log.
	///
	/// Returns the number of messages studied.
	pub fn update_from_recorded(&self) -> ChainResult<usize> {
		let _guard = self.lock_writer()?;
		let lines = self.recorder.read_all()?;
		if lines.is_empty() {
			return Ok(0);
		}

		let current = self.snapshot()?;
		let mut model = current.model.clone();
		let processed = self.trainer.update(&mut model, &lines);
		self.store.save(&model, &current.name)?;
		self.swap(&current.name, model)?;
		self.recorder.clear()?;
		log::info!("Updated {} with {processed} new messages", current.name);
		Ok(processed)
	}

	/// Appends a live message to the recorded-data log.
	pub fn record(&self, message: &str) -> ChainResult<usize> {
		let _guard = self.lock_writer()?;
		self.recorder.record(message)
	}

	/// Generates one message from the current model.
	pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> ChainResult<Vec<String>> {
		let current = self.snapshot()?;
		self.generator.generate(&current.model, rng)
	}

	pub fn generate_text<R: Rng + ?Sized>(&self, rng: &mut R) -> ChainResult<String> {
		let current = self.snapshot()?;
		self.generator.generate_text(&current.model, rng)
	}

	pub fn list_corpora(&self) -> ChainResult<Vec<String>> {
		self.store.list_corpora()
	}

	pub fn list_models(&self) -> ChainResult<Vec<String>> {
		self.store.list_models()
	}
}
