use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Statistics of one transition `prev -> next`.
///
/// Stored on disk as a two-element array `[count, probability]`.
/// The probability is derived from the counts of the owning node and
/// is only written by `Node::recompute_probabilities`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(from = "(u64, Option<f64>)", into = "(u64, f64)")]
pub struct Edge {
	count: u64,
	probability: f64,
}

impl Edge {
	pub fn count(&self) -> u64 {
		self.count
	}

	pub fn probability(&self) -> f64 {
		self.probability
	}
}

// A null probability is what an edge looks like before its first normalization.
impl From<(u64, Option<f64>)> for Edge {
	fn from((count, probability): (u64, Option<f64>)) -> Self {
		Self { count, probability: probability.unwrap_or(0.0) }
	}
}

impl From<Edge> for (u64, f64) {
	fn from(edge: Edge) -> Self {
		(edge.count, edge.probability)
	}
}

/// A token of the chain and its outgoing transitions.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Invariants
/// - `total_next` equals the sum of all edge counts
/// - After normalization, edge probabilities sum to 1
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Node {
	#[serde(rename = "totalNext")]
	total_next: u64,
	/// Outgoing edges indexed by the next token.
	next: BTreeMap<String, Edge>,
}

impl Node {
	/// Records an occurrence of a transition toward `next`.
	pub fn add_transition(&mut self, next: &str) {
		self.add_transitions(next, 1);
	}

	/// Records `count` occurrences of a transition toward `next` at once.
	pub(crate) fn add_transitions(&mut self, next: &str, count: u64) {
		match self.next.get_mut(next) {
			Some(edge) => edge.count += count,
			None => {
				self.next.insert(next.to_owned(), Edge { count, probability: 0.0 });
			}
		}
		self.total_next += count;
	}

	/// Sets every edge probability to `count / total_next`.
	pub(crate) fn recompute_probabilities(&mut self) {
		if self.total_next == 0 {
			return;
		}
		let total = self.total_next as f64;
		for edge in self.next.values_mut() {
			edge.probability = edge.count as f64 / total;
		}
	}

	pub fn total_next(&self) -> u64 {
		self.total_next
	}

	pub fn edge(&self, next: &str) -> Option<&Edge> {
		self.next.get(next)
	}

	/// Outgoing edges in their fixed (lexicographic) order.
	pub fn edges(&self) -> impl Iterator<Item = (&str, &Edge)> {
		self.next.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn edge_count(&self) -> usize {
		self.next.len()
	}

	pub fn is_empty(&self) -> bool {
		self.next.is_empty()
	}

	/// Checks the counting invariants of a node read from disk.
	pub(crate) fn check(&self) -> Result<(), String> {
		if self.next.is_empty() {
			return Err("node has no outgoing edges".to_owned());
		}
		let sum: u64 = self.next.values().map(Edge::count).sum();
		if sum != self.total_next {
			return Err(format!("totalNext is {} but edge counts sum to {}", self.total_next, sum));
		}
		if let Some((token, _)) = self.next.iter().find(|(_, e)| e.count == 0) {
			return Err(format!("edge to {token:?} has a zero count"));
		}
		Ok(())
	}
}
