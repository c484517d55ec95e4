/// Sentinel opening every tokenized message.
pub const START: &str = "__START__";

/// Sentinel closing every tokenized message.
pub const END: &str = "__END__";

/// Splits chat lines into tokens.
///
/// A line becomes `START`, then one token per space-separated chunk,
/// then `END`. Chunks shaped like `<...>` (user, channel and emote
/// references) and the `@everyone` / `@here` pings are kept whole.
/// Any other chunk is further split around the configured delimiter
/// characters, each delimiter becoming a token of its own.
///
/// ## Invariants
/// - Output always starts with `START` and ends with `END`
/// - No content token equals a sentinel (literal sentinels are escaped)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tokenizer {
	delimiters: Vec<char>,
}

impl Tokenizer {
	/// Creates a tokenizer splitting on every character of `delimiters`.
	pub fn new(delimiters: &str) -> Self {
		let mut chars: Vec<char> = delimiters.chars().collect();
		chars.sort_unstable();
		chars.dedup();
		Self { delimiters: chars }
	}

	/// Tokenizes one message line.
	pub fn tokenize(&self, line: &str) -> Vec<String> {
		let mut tokens = vec![START.to_owned()];

		for chunk in line.trim().split(' ').filter(|c| !c.is_empty()) {
			if is_atomic_chunk(chunk) {
				tokens.push(chunk.to_owned());
				continue;
			}
			self.split_chunk(chunk, &mut tokens);
		}

		tokens.push(END.to_owned());
		tokens
	}

	/// Pushes the runs of non-delimiters and the delimiters of `chunk`, in order.
	fn split_chunk(&self, chunk: &str, tokens: &mut Vec<String>) {
		let mut run = String::new();
		for c in chunk.chars() {
			if self.delimiters.binary_search(&c).is_ok() {
				if !run.is_empty() {
					tokens.push(escape_sentinel(&run));
					run.clear();
				}
				tokens.push(c.to_string());
			} else {
				run.push(c);
			}
		}
		if !run.is_empty() {
			tokens.push(escape_sentinel(&run));
		}
	}
}

/// Joins generated content tokens back into a message.
pub fn detokenize<S: AsRef<str>>(tokens: &[S]) -> String {
	tokens
		.iter()
		.map(|t| unescape_sentinel(t.as_ref()))
		.collect::<Vec<_>>()
		.join(" ")
}

/// Mentions, channel links, emotes and broadcast pings.
fn is_atomic_chunk(chunk: &str) -> bool {
	(chunk.chars().count() >= 2 && chunk.starts_with('<') && chunk.ends_with('>'))
		|| chunk == "@everyone"
		|| chunk == "@here"
}

fn is_escaped_sentinel(token: &str) -> bool {
	let bare = token.trim_start_matches('\\');
	bare == START || bare == END
}

/// `__END__` → `\__END__`, `\__END__` → `\\__END__`, anything else unchanged.
fn escape_sentinel(token: &str) -> String {
	if is_escaped_sentinel(token) {
		format!("\\{token}")
	} else {
		token.to_owned()
	}
}

fn unescape_sentinel(token: &str) -> &str {
	if token.starts_with('\\') && is_escaped_sentinel(token) {
		&token[1..]
	} else {
		token
	}
}
