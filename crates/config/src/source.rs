//! Where configuration text comes from.

use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

/// Opens a named configuration source and returns its full text.
pub trait SourceProvider {
	fn open(&self, name: &str) -> io::Result<String>;
}

/// Reads sources from the filesystem, optionally relative to a root directory.
#[derive(Debug, Clone, Default)]
pub struct FileSourceProvider {
	root: Option<PathBuf>,
}

impl FileSourceProvider {
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolves relative source names against `root`.
	pub fn with_root(root: impl Into<PathBuf>) -> Self {
		Self { root: Some(root.into()) }
	}

	fn resolve(&self, name: &str) -> PathBuf {
		match &self.root {
			Some(root) => root.join(name),
			None => Path::new(name).to_path_buf(),
		}
	}
}

impl SourceProvider for FileSourceProvider {
	fn open(&self, name: &str) -> io::Result<String> {
		let path = self.resolve(name);
		tracing::trace!(path = %path.display(), "reading configuration file");
		std::fs::read_to_string(path)
	}
}

/// In-memory sources keyed by name.
#[derive(Debug, Clone, Default)]
pub struct StaticSourceProvider {
	sources: FxHashMap<String, String>,
}

impl StaticSourceProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
		self.insert(name, text);
		self
	}

	pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
		self.sources.insert(name.into(), text.into());
	}
}

impl SourceProvider for StaticSourceProvider {
	fn open(&self, name: &str) -> io::Result<String> {
		self.sources
			.get(name)
			.cloned()
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no source named {name}")))
	}
}

impl<S: SourceProvider + ?Sized> SourceProvider for &S {
	fn open(&self, name: &str) -> io::Result<String> {
		(**self).open(name)
	}
}
