use std::path::Path;
use std::sync::mpsc;
use std::thread;

use super::chain_model::ChainModel;
use super::tokenizer::Tokenizer;
use crate::config::ChainConfig;
use crate::error::ChainResult;
use crate::io::read_file;

/// Below this many lines, counting stays on the calling thread.
const PARALLEL_THRESHOLD: usize = 256;

/// Builds and updates chain models from corpora.
///
/// A corpus is an ordered sequence of lines, one message per line.
/// `train` rebuilds a model from the initial snapshot, `update` grows
/// an existing one. Both end with a full probability recomputation.
#[derive(Clone, Debug)]
pub struct Trainer {
	tokenizer: Tokenizer,
	initial: ChainModel,
	round_average_length: bool,
}

impl Default for Trainer {
	fn default() -> Self {
		Self::new(Tokenizer::default())
	}
}

impl Trainer {
	/// Creates a trainer starting from an empty model and rounding the
	/// average message length after every call.
	pub fn new(tokenizer: Tokenizer) -> Self {
		Self { tokenizer, initial: ChainModel::new(), round_average_length: true }
	}

	/// Trainer configured from the delimiter and rounding settings.
	///
	/// The initial snapshot is not read here, see `with_initial`.
	pub fn from_config(config: &ChainConfig) -> Self {
		Self::new(Tokenizer::new(&config.delimiters)).round_average_length(config.round_average_length)
	}

	/// Sets the model every `train` call starts from.
	pub fn with_initial(mut self, initial: ChainModel) -> Self {
		self.initial = initial;
		self
	}

	/// Chooses whether the running average is rounded after each call.
	///
	/// Rounding after every call compounds across repeated updates;
	/// disabling it keeps the exact mean as the model state.
	pub fn round_average_length(mut self, round: bool) -> Self {
		self.round_average_length = round;
		self
	}

	/// Builds a fresh model from the initial snapshot and `corpus`.
	///
	/// Returns the model and the number of messages processed.
	pub fn train<S: AsRef<str>>(&self, corpus: &[S]) -> (ChainModel, usize) {
		let mut model = self.initial.clone();
		let processed = self.update(&mut model, corpus);
		(model, processed)
	}

	/// Learns every line of `corpus` into `model`.
	///
	/// # Behavior
	/// - Tokenizes each line and folds its length into the running mean
	/// - Counts every consecutive token pair
	/// - Recomputes the probabilities of the whole model
	/// - Rounds the average message length, when enabled and lines were read
	///
	/// Returns the number of messages processed.
	pub fn update<S: AsRef<str>>(&self, model: &mut ChainModel, corpus: &[S]) -> usize {
		if corpus.len() < PARALLEL_THRESHOLD {
			for line in corpus {
				self.learn_line(model, line.as_ref());
			}
		} else {
			model.absorb(&self.count_parallel(corpus));
		}

		model.recompute_probabilities();
		if self.round_average_length && !corpus.is_empty() {
			model.round_average_message_length();
		}

		log::debug!(
			"Learned {} messages ({} nodes, {} edges)",
			corpus.len(),
			model.node_count(),
			model.edge_count()
		);
		corpus.len()
	}

	/// Reads a corpus file and trains a fresh model from it.
	///
	/// # Errors
	/// Returns an error if the file cannot be read.
	pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> ChainResult<(ChainModel, usize)> {
		log::info!("Training chain using {}", path.as_ref().display());
		let lines = read_file(path)?;
		Ok(self.train(&lines))
	}

	/// Reads a corpus file and updates `model` with it.
	///
	/// The model is untouched if the file cannot be read.
	pub fn update_from_file<P: AsRef<Path>>(&self, model: &mut ChainModel, path: P) -> ChainResult<usize> {
		log::info!("Updating chain using {}", path.as_ref().display());
		let lines = read_file(path)?;
		Ok(self.update(model, &lines))
	}

	fn learn_line(&self, model: &mut ChainModel, line: &str) {
		let tokens = self.tokenizer.tokenize(line);
		model.record_message(tokens.len());
		for pair in tokens.windows(2) {
			model.add_transition(&pair[0], &pair[1]);
		}
	}

	/// Splits the corpus into chunks, counts each chunk into a partial
	/// model on its own thread, then merges the partial models.
	///
	/// Counts are sums, so the merge order does not matter.
	fn count_parallel<S: AsRef<str>>(&self, corpus: &[S]) -> ChainModel {
		let chunks = num_cpus::get() * 8;
		let chunk_size = corpus.len().div_ceil(chunks).max(1);

		let (tx, rx) = mpsc::channel();
		for chunk in corpus.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.iter().map(|s| s.as_ref().to_owned()).collect();
			let counter = self.clone_for_counting();

			thread::spawn(move || {
				let mut partial_model = ChainModel::new();
				for line in &chunk {
					counter.learn_line(&mut partial_model, line);
				}
				// The receiver outlives every sender
				let _ = tx.send(partial_model);
			});
		}
		drop(tx);

		let mut counted = ChainModel::new();
		for partial_model in rx.iter() {
			counted.absorb(&partial_model);
		}
		counted
	}

	/// Copy used by counting threads, without the initial snapshot.
	fn clone_for_counting(&self) -> Self {
		Self {
			tokenizer: self.tokenizer.clone(),
			initial: ChainModel::new(),
			round_average_length: self.round_average_length,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::node::{Edge, Node};
	use crate::model::tokenizer::{END, START};

	fn count(model: &ChainModel, prev: &str, next: &str) -> Option<u64> {
		model.edge(prev, next).map(Edge::count)
	}

	fn probability(model: &ChainModel, prev: &str, next: &str) -> Option<f64> {
		model.edge(prev, next).map(Edge::probability)
	}

	fn assert_normalized(model: &ChainModel) {
		for (token, node) in model.nodes() {
			let sum: f64 = node.edges().map(|(_, e)| e.probability()).sum();
			assert!((sum - 1.0).abs() < 1e-6, "{token} sums to {sum}");
		}
	}

	fn counts(model: &ChainModel) -> Vec<(String, String, u64)> {
		model
			.nodes()
			.flat_map(|(prev, node)| {
				node.edges().map(move |(next, e)| (prev.to_owned(), next.to_owned(), e.count()))
			})
			.collect()
	}

	#[test]
	fn test_hello_scenario() {
		let (model, processed) = Trainer::default().train(&["hello world", "hello there"]);

		assert_eq!(processed, 2);
		assert_eq!(count(&model, START, "hello"), Some(2));
		assert_eq!(probability(&model, START, "hello"), Some(1.0));
		assert_eq!(count(&model, "hello", "world"), Some(1));
		assert_eq!(probability(&model, "hello", "world"), Some(0.5));
		assert_eq!(count(&model, "hello", "there"), Some(1));
		assert_eq!(probability(&model, "hello", "there"), Some(0.5));
		assert_eq!(count(&model, "world", END), Some(1));
		assert_eq!(probability(&model, "world", END), Some(1.0));
		assert_eq!(count(&model, "there", END), Some(1));
		assert_eq!(probability(&model, "there", END), Some(1.0));
		assert_eq!(model.node("hello").map(Node::total_next), Some(2));
		assert_eq!(model.average_message_length(), 4.0);
		assert_eq!(model.message_count(), 2);
	}

	#[test]
	fn test_probabilities_sum_to_one() {
		let corpus = [
			"according to all known laws of aviation",
			"there is no way a bee should be able to fly",
			"its wings are too small to get its fat little body off the ground",
			"the bee of course flies anyway",
			"",
		];
		let (model, _) = Trainer::new(Tokenizer::new(",.")).train(&corpus);
		assert_normalized(&model);
		assert!(model.validate().is_ok());
	}

	#[test]
	fn test_empty_corpus() {
		let empty: [&str; 0] = [];
		let (model, processed) = Trainer::default().train(&empty);
		assert_eq!(processed, 0);
		assert!(model.is_empty());
		assert_eq!(model.average_message_length(), 0.0);
		assert_eq!(model.message_count(), 0);
	}

	#[test]
	fn test_empty_line_links_start_to_end() {
		let (model, processed) = Trainer::default().train(&[""]);
		assert_eq!(processed, 1);
		assert_eq!(count(&model, START, END), Some(1));
	}

	#[test]
	fn test_incremental_matches_batch() {
		let a = ["ya like jazz", "ya like bees"];
		let b = ["bees like jazz", "jazz jazz jazz"];
		let trainer = Trainer::default();

		let (mut incremental, _) = trainer.train(&a);
		trainer.update(&mut incremental, &b);
		trainer.update(&mut incremental, &Vec::<String>::new());

		let all: Vec<&str> = a.iter().chain(b.iter()).copied().collect();
		let (batch, _) = trainer.train(&all);

		assert_eq!(counts(&incremental), counts(&batch));
		assert_eq!(incremental.message_count(), batch.message_count());
		assert_normalized(&incremental);
	}

	#[test]
	fn test_parallel_counts_match_sequential() {
		let corpus: Vec<String> = (0..(PARALLEL_THRESHOLD * 3))
			.map(|i| format!("line {} of {} words", i % 17, i % 5))
			.collect();
		let trainer = Trainer::default().round_average_length(false);

		let (parallel, processed) = trainer.train(&corpus);
		let mut sequential = ChainModel::new();
		for line in &corpus {
			trainer.learn_line(&mut sequential, line);
		}
		sequential.recompute_probabilities();

		assert_eq!(processed, corpus.len());
		assert_eq!(counts(&parallel), counts(&sequential));
		assert_eq!(parallel.message_count(), sequential.message_count());
		assert!((parallel.average_message_length() - sequential.average_message_length()).abs() < 1e-9);
	}

	#[test]
	fn test_rounding_is_configurable() {
		let corpus = ["a b", "a"];
		let (rounded, _) = Trainer::default().train(&corpus);
		let (exact, _) = Trainer::default().round_average_length(false).train(&corpus);
		assert_eq!(rounded.average_message_length(), 4.0);
		assert_eq!(exact.average_message_length(), 3.5);
	}

	#[test]
	fn test_train_starts_from_initial_snapshot() {
		let (initial, _) = Trainer::default().train(&["hi"]);
		let trainer = Trainer::default().with_initial(initial);

		let (model, _) = trainer.train(&["hi there"]);
		assert_eq!(count(&model, START, "hi"), Some(2));
		assert_eq!(model.message_count(), 2);

		let (again, _) = trainer.train(&["hi there"]);
		assert_eq!(count(&again, START, "hi"), Some(2));
	}

	#[test]
	fn test_trailing_blank_lines_are_not_messages() {
		let path = crate::io::tests::scratch_dir("trailing").join("corpus.txt");
		std::fs::write(&path, "hello world\n\n\n").unwrap();

		let (model, processed) = Trainer::default().train_from_file(&path).unwrap();
		assert_eq!(processed, 1);
		assert_eq!(model.message_count(), 1);
		assert!(model.edge(START, END).is_none());
		assert_eq!(model.edge(START, "hello").map(Edge::count), Some(1));
	}

	#[test]
	fn test_missing_corpus_file() {
		let result = Trainer::default().train_from_file("/nonexistent/rs-markov/corpus.txt");
		assert!(matches!(result, Err(crate::error::ChainError::Io(_))));
	}
}
