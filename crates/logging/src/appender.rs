//! Appender factories, selected by `type` in an appender mapping.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use keel_config::validation::{Min, NotNull};
use keel_config::{ConfigVariant, Validate, ValidationContext};
use serde::Deserialize;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use crate::Level;

/// Produces the writer one appender's events go to.
pub trait AppenderFactory: Validate + fmt::Debug + Send + Sync {
	/// Events more verbose than this are not written by the appender.
	fn threshold(&self) -> Level;

	fn make_writer(&self) -> io::Result<BoxMakeWriter>;
}

keel_config::polymorphic!(dyn AppenderFactory);

keel_config::manifest! {
	dyn AppenderFactory => [ConsoleAppenderFactory, FileAppenderFactory]
}

/// Applies `threshold` to `writer`.
pub(crate) fn bounded<M>(writer: M, threshold: Level) -> BoxMakeWriter
where
	M: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
	match threshold.as_tracing() {
		Some(level) => BoxMakeWriter::new(writer.with_max_level(level)),
		None => BoxMakeWriter::new(io::sink),
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
	#[default]
	Stdout,
	Stderr,
}

/// Writes to standard output or standard error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ConsoleAppenderFactory {
	pub threshold: Level,
	pub target: ConsoleTarget,
}

impl Default for ConsoleAppenderFactory {
	fn default() -> Self {
		Self {
			threshold: Level::All,
			target: ConsoleTarget::Stdout,
		}
	}
}

impl ConfigVariant for ConsoleAppenderFactory {
	const TYPE: &'static str = "console";
}

impl Validate for ConsoleAppenderFactory {
	fn validate(&self, _ctx: &mut ValidationContext<'_>) {}
}

impl AppenderFactory for ConsoleAppenderFactory {
	fn threshold(&self) -> Level {
		self.threshold
	}

	fn make_writer(&self) -> io::Result<BoxMakeWriter> {
		Ok(match self.target {
			ConsoleTarget::Stdout => bounded(io::stdout, self.threshold),
			ConsoleTarget::Stderr => bounded(io::stderr, self.threshold),
		})
	}
}

/// Appends to a file, creating it and its parent directories when missing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct FileAppenderFactory {
	pub threshold: Level,
	pub current_log_filename: Option<PathBuf>,
	/// Truncate instead of appending when the file is opened.
	pub truncate: bool,
	/// Bytes buffered before a write reaches the file.
	pub buffer_size: usize,
}

impl Default for FileAppenderFactory {
	fn default() -> Self {
		Self {
			threshold: Level::All,
			current_log_filename: None,
			truncate: false,
			buffer_size: 8 * 1024,
		}
	}
}

impl ConfigVariant for FileAppenderFactory {
	const TYPE: &'static str = "file";
}

impl Validate for FileAppenderFactory {
	fn validate(&self, ctx: &mut ValidationContext<'_>) {
		ctx.field("currentLogFilename", &self.current_log_filename).check(&NotNull);
		ctx.field("bufferSize", &self.buffer_size).check(&Min(1));
	}
}

impl AppenderFactory for FileAppenderFactory {
	fn threshold(&self) -> Level {
		self.threshold
	}

	fn make_writer(&self) -> io::Result<BoxMakeWriter> {
		let path = self
			.current_log_filename
			.as_ref()
			.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "currentLogFilename is not set"))?;
		if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent)?;
		}
		let file = OpenOptions::new()
			.create(true)
			.write(true)
			.append(!self.truncate)
			.truncate(self.truncate)
			.open(path)?;
		tracing::debug!(path = %path.display(), "opened log file");
		let writer = io::LineWriter::with_capacity(self.buffer_size, file);
		Ok(bounded(Mutex::new(writer), self.threshold))
	}
}
