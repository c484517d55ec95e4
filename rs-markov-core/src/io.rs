use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Ignores leading and trailing blank lines of the whole file
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.trim().lines().map(str::to_owned).collect())
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./markov_chains/beemovie.json"` → `"beemovie"`
/// - `"beemovie.txt"` → `"beemovie"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Lists the stems of all files with a given extension in a directory.
///
/// Names are sorted. A missing directory lists as empty.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let dir = dir.as_ref();
	if !dir.is_dir() {
		return Ok(Vec::new());
	}

	let mut files = Vec::new();
	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			files.push(get_filename(&path)?);
		}
	}

	files.sort();
	Ok(files)
}

/// Writes `bytes` to `path` through a sibling temp file and a rename.
///
/// Readers see either the previous content or the new one, never a
/// partially written file.
pub(crate) fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
	let path = path.as_ref();
	let file_name = path
		.file_name()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	let mut tmp_name = file_name.to_os_string();
	tmp_name.push(".tmp");
	let tmp_path: PathBuf = path.with_file_name(tmp_name);

	let result = (|| {
		let mut file = File::create(&tmp_path)?;
		file.write_all(bytes)?;
		file.sync_all()?;
		fs::rename(&tmp_path, path)
	})();

	if result.is_err() {
		let _ = fs::remove_file(&tmp_path);
	}
	result
}

/// Appends each line followed by `\n`, creating the file if needed.
pub(crate) fn append_lines<P: AsRef<Path>>(path: P, lines: &[&str]) -> io::Result<()> {
	let path = path.as_ref();
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}

	let mut file = OpenOptions::new().create(true).append(true).open(path)?;
	for line in lines {
		file.write_all(line.as_bytes())?;
		file.write_all(b"\n")?;
	}
	file.flush()
}
