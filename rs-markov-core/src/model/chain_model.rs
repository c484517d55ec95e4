use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::{Edge, Node};
use super::tokenizer::START;
use crate::error::{ChainError, ChainResult};

/// First-order Markov chain over tokens.
///
/// Maps every token seen in training to the statistics of the tokens
/// observed right after it, plus running message statistics.
///
/// # Responsibilities
/// - Accumulate transition counts (`add_transition`)
/// - Derive edge probabilities from counts (`recompute_probabilities`)
/// - Merge partial models built in parallel (`absorb`)
///
/// # Invariants
/// - Counts only grow
/// - Every node satisfies `total_next == sum(edge counts)`
/// - `graph[START]` exists once a message has been learned
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ChainModel {
	graph: BTreeMap<String, Node>,
	#[serde(rename = "averageMessageLength")]
	average_message_length: f64,
	#[serde(rename = "messageCount")]
	message_count: u64,
}

impl ChainModel {
	/// Creates an empty model.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one observation of `prev` followed by `next`.
	///
	/// Missing nodes and edges are created with a zero count first.
	pub fn add_transition(&mut self, prev: &str, next: &str) {
		self.node_entry(prev).add_transition(next);
	}

	fn node_entry(&mut self, token: &str) -> &mut Node {
		self.graph.entry(token.to_owned()).or_default()
	}

	/// Folds one tokenized message of `len` tokens into the running mean.
	pub(crate) fn record_message(&mut self, len: usize) {
		let n = self.message_count as f64;
		self.average_message_length = (self.average_message_length * n + len as f64) / (n + 1.0);
		self.message_count += 1;
	}

	/// Recomputes the probability of every edge in the model.
	///
	/// Costs O(total edges). Running it twice without new transitions
	/// leaves every probability unchanged.
	pub fn recompute_probabilities(&mut self) {
		for node in self.graph.values_mut() {
			node.recompute_probabilities();
		}
	}

	/// Rounds the running average message length to the nearest integer.
	pub(crate) fn round_average_message_length(&mut self) {
		self.average_message_length = self.average_message_length.round();
	}

	/// Merges the counts and message statistics of `other` into this model.
	///
	/// Probabilities are not recomputed; callers do it once all partial
	/// models have been absorbed.
	pub fn absorb(&mut self, other: &Self) {
		for (prev, node) in &other.graph {
			let target = self.node_entry(prev);
			for (next, edge) in node.edges() {
				target.add_transitions(next, edge.count());
			}
		}

		let total = self.message_count + other.message_count;
		if total > 0 {
			self.average_message_length = (self.average_message_length * self.message_count as f64
				+ other.average_message_length * other.message_count as f64)
				/ total as f64;
		}
		self.message_count = total;
	}

	/// Checks the node invariants, typically after reading a model file.
	///
	/// # Errors
	/// Returns `ChainError::Malformed` naming the first offending token.
	pub fn validate(&self) -> ChainResult<()> {
		for (token, node) in &self.graph {
			node.check().map_err(|e| ChainError::Malformed(format!("{token:?}: {e}")))?;
		}
		if !self.average_message_length.is_finite() || self.average_message_length < 0.0 {
			return Err(ChainError::Malformed(format!(
				"averageMessageLength is {}",
				self.average_message_length
			)));
		}
		Ok(())
	}

	pub fn node(&self, token: &str) -> Option<&Node> {
		self.graph.get(token)
	}

	pub fn edge(&self, prev: &str, next: &str) -> Option<&Edge> {
		self.graph.get(prev)?.edge(next)
	}

	/// Iterates over `(token, node)` pairs in token order.
	pub fn nodes(&self) -> impl Iterator<Item = (&str, &Node)> {
		self.graph.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn average_message_length(&self) -> f64 {
		self.average_message_length
	}

	pub fn message_count(&self) -> u64 {
		self.message_count
	}

	pub fn node_count(&self) -> usize {
		self.graph.len()
	}

	pub fn edge_count(&self) -> usize {
		self.graph.values().map(Node::edge_count).sum()
	}

	/// True while nothing can be generated (no edge leaves `START`).
	pub fn is_empty(&self) -> bool {
		self.graph.get(START).is_none_or(Node::is_empty)
	}
}
