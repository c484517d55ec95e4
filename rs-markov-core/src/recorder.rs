use std::fs;
use std::path::PathBuf;

use crate::error::ChainResult;
use crate::io;

/// Append-only log of live messages, consumed by the next update.
#[derive(Clone, Debug)]
pub struct Recorder {
	path: PathBuf,
}

impl Recorder {
	pub fn new<P: Into<PathBuf>>(path: P) -> Self {
		Self { path: path.into() }
	}

	/// Appends every non-empty line of `message`, trimmed.
	///
	/// Returns the number of lines written.
	pub fn record(&self, message: &str) -> ChainResult<usize> {
		let lines: Vec<&str> = message.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
		if lines.is_empty() {
			return Ok(0);
		}
		io::append_lines(&self.path, &lines)?;
		for line in &lines {
			log::debug!("Recorded: {line}");
		}
		Ok(lines.len())
	}

	/// All recorded lines, oldest first. A missing file reads as empty.
	pub fn read_all(&self) -> ChainResult<Vec<String>> {
		if !self.path.exists() {
			return Ok(Vec::new());
		}
		Ok(io::read_file(&self.path)?)
	}

	/// Empties the log.
	pub fn clear(&self) -> ChainResult<()> {
		if self.path.exists() {
			fs::write(&self.path, b"")?;
		}
		Ok(())
	}
}
