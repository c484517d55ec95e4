use rand::Rng;

use super::chain_model::ChainModel;
use super::node::Node;
use super::tokenizer::{END, START, detokenize};
use crate::config::ChainConfig;
use crate::error::{ChainError, ChainResult};

/// Returns true for tokens that must never be generated: user mentions
/// and broadcast pings.
pub fn is_unspeakable(token: &str) -> bool {
	token.contains("<@") || token.contains("@everyone") || token.contains("@here")
}

/// Samples messages from a chain model.
///
/// # Behavior
/// - Walks the chain from `START` until `END` is drawn
/// - At each step, keeps only speakable successors and renormalizes
///   their probabilities before drawing
/// - Edges are scanned in the model's fixed order, so a seeded random
///   source gives a reproducible message
#[derive(Clone, Debug, Default)]
pub struct Generator {
	max_tokens: Option<usize>,
}

impl Generator {
	/// Creates an unbounded generator.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_config(config: &ChainConfig) -> Self {
		Self { max_tokens: config.max_tokens }
	}

	/// Fails generation once more than `limit` content tokens are drawn.
	pub fn max_tokens(mut self, limit: usize) -> Self {
		self.max_tokens = Some(limit);
		self
	}

	/// Generates one message as a token sequence, sentinels stripped.
	///
	/// # Errors
	/// - `ModelEmpty` if `START` has no successors
	/// - `ModelStalled` if a reached token has no speakable successor
	/// - `GenerationTooLong` if the configured bound is exceeded
	pub fn generate<R: Rng + ?Sized>(&self, model: &ChainModel, rng: &mut R) -> ChainResult<Vec<String>> {
		if model.is_empty() {
			return Err(ChainError::ModelEmpty);
		}

		let mut out: Vec<String> = Vec::new();
		let mut current = START;
		loop {
			let node = model
				.node(current)
				.ok_or_else(|| ChainError::ModelStalled { token: current.to_owned() })?;
			let next = sample_speakable(node, rng)
				.ok_or_else(|| ChainError::ModelStalled { token: current.to_owned() })?;

			if next == END {
				break;
			}
			if let Some(limit) = self.max_tokens {
				if out.len() >= limit {
					return Err(ChainError::GenerationTooLong { limit });
				}
			}
			out.push(next.to_owned());
			current = next;
		}

		Ok(out)
	}

	/// Generates one message and joins it into a string.
	pub fn generate_text<R: Rng + ?Sized>(&self, model: &ChainModel, rng: &mut R) -> ChainResult<String> {
		Ok(detokenize(&self.generate(model, rng)?))
	}
}

/// Draws a successor among the speakable edges of `node`.
///
/// Weights are the stored probabilities, or the raw counts if the node
/// was never normalized. Returns `None` when no speakable edge exists.
///
/// An edge is taken once the running sum is strictly greater than the
/// draw (not greater-or-equal), so zero-weight edges are never picked.
fn sample_speakable<'a, R: Rng + ?Sized>(node: &'a Node, rng: &mut R) -> Option<&'a str> {
	let speakable: Vec<(&str, u64, f64)> = node
		.edges()
		.filter(|(token, _)| !is_unspeakable(token))
		.map(|(token, edge)| (token, edge.count(), edge.probability()))
		.collect();
	if speakable.is_empty() {
		return None;
	}

	let mut weights: Vec<f64> = speakable.iter().map(|(_, _, p)| *p).collect();
	let mut mass: f64 = weights.iter().sum();
	if mass <= 0.0 {
		weights = speakable.iter().map(|(_, c, _)| *c as f64).collect();
		mass = weights.iter().sum();
	}

	let target = rng.random::<f64>() * mass;
	let mut sum = 0.0;
	for ((token, _, _), weight) in speakable.iter().zip(&weights) {
		sum += weight;
		if sum > target {
			return Some(*token);
		}
	}

	// Floating-point shortfall on the last bucket
	speakable.last().map(|(token, _, _)| *token)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::trainer::Trainer;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn bee_model() -> ChainModel {
		let corpus = [
			"according to all known laws of aviation",
			"there is no way a bee should be able to fly",
			"the bee of course flies anyway",
			"because bees don't care what humans think is impossible",
		];
		Trainer::default().train(&corpus).0
	}

	#[test]
	fn test_seeded_generation_is_deterministic() {
		let model = bee_model();
		let generator = Generator::new();

		let first: Vec<Vec<String>> = {
			let mut rng = StdRng::seed_from_u64(42);
			(0..10).map(|_| generator.generate(&model, &mut rng).unwrap()).collect()
		};
		let second: Vec<Vec<String>> = {
			let mut rng = StdRng::seed_from_u64(42);
			(0..10).map(|_| generator.generate(&model, &mut rng).unwrap()).collect()
		};

		assert_eq!(first, second);
	}

	#[test]
	fn test_output_follows_learned_edges() {
		let model = bee_model();
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..50 {
			let tokens = Generator::new().generate(&model, &mut rng).unwrap();
			let mut prev = START.to_owned();
			for token in &tokens {
				assert!(model.edge(&prev, token).is_some(), "{prev} -> {token}");
				prev = token.clone();
			}
			assert!(model.edge(&prev, END).is_some());
		}
	}

	#[test]
	fn test_single_path_model() {
		let model = Trainer::default().train(&["ya like jazz?"]).0;
		let mut rng = StdRng::seed_from_u64(1);
		let text = Generator::new().generate_text(&model, &mut rng).unwrap();
		assert_eq!(text, "ya like jazz?");
	}

	#[test]
	fn test_empty_model_fails() {
		let mut rng = StdRng::seed_from_u64(0);
		let result = Generator::new().generate(&ChainModel::new(), &mut rng);
		assert!(matches!(result, Err(ChainError::ModelEmpty)));
	}

	#[test]
	fn test_only_unspeakable_successor_stalls() {
		let model = Trainer::default().train(&["<@123456>"]).0;
		let mut rng = StdRng::seed_from_u64(0);
		match Generator::new().generate(&model, &mut rng) {
			Err(ChainError::ModelStalled { token }) => assert_eq!(token, START),
			other => panic!("expected a stall, got {other:?}"),
		}
	}

	#[test]
	fn test_unspeakable_mass_is_skipped() {
		let mut corpus = vec!["@everyone"; 20];
		corpus.extend(["<@42> hey"; 20]);
		corpus.push("fine");
		let model = Trainer::default().train(&corpus).0;

		let mut rng = StdRng::seed_from_u64(3);
		for _ in 0..20 {
			let tokens = Generator::new().generate(&model, &mut rng).unwrap();
			assert_eq!(tokens, vec!["fine"]);
		}
	}

	#[test]
	fn test_unspeakable_tokens() {
		assert!(is_unspeakable("<@123>"));
		assert!(is_unspeakable("<@!123>"));
		assert!(is_unspeakable("hey@everyone"));
		assert!(is_unspeakable("@here"));
		assert!(!is_unspeakable("<#123>"));
		assert!(!is_unspeakable("<:bee:99>"));
		assert!(!is_unspeakable(END));
	}

	#[test]
	fn test_max_tokens_bounds_cycles() {
		let mut model = ChainModel::new();
		model.add_transition(START, "buzz");
		model.add_transition("buzz", "buzz");
		model.recompute_probabilities();

		let mut rng = StdRng::seed_from_u64(0);
		let result = Generator::new().max_tokens(5).generate(&model, &mut rng);
		assert!(matches!(result, Err(ChainError::GenerationTooLong { limit: 5 })));
	}

	/// Random source whose every draw is zero.
	struct ZeroRng;

	impl rand::RngCore for ZeroRng {
		fn next_u32(&mut self) -> u32 {
			0
		}

		fn next_u64(&mut self) -> u64 {
			0
		}

		fn fill_bytes(&mut self, dst: &mut [u8]) {
			dst.fill(0);
		}
	}

	#[test]
	fn test_zero_weight_edge_is_never_drawn() {
		let node: Node = serde_json::from_str(r#"{"totalNext":2,"next":{"a":[1,0.0],"b":[1,1.0]}}"#).unwrap();
		assert_eq!(sample_speakable(&node, &mut ZeroRng), Some("b"));

		let mut rng = StdRng::seed_from_u64(11);
		for _ in 0..200 {
			assert_eq!(sample_speakable(&node, &mut rng), Some("b"));
		}
	}

	#[test]
	fn test_dangling_node_stalls() {
		let mut model = ChainModel::new();
		model.add_transition(START, "orphan");
		model.recompute_probabilities();

		let mut rng = StdRng::seed_from_u64(0);
		let result = Generator::new().generate(&model, &mut rng);
		assert!(matches!(result, Err(ChainError::ModelStalled { token }) if token == "orphan"));
	}
}
