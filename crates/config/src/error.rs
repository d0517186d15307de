//! Failures of a configuration build.

use thiserror::Error;

use crate::tree::MappingError;
use crate::validation::Violation;

/// Which stage of a build failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// Malformed input: bad syntax, an empty document or an unusable override.
	Parse,
	/// Well-formed document with the wrong shape or an unresolvable type.
	Mapping,
	/// Well-typed configuration whose values break declared constraints.
	Validation,
	/// The source could not be read.
	Io,
}

/// A failed configuration build. The `Display` output is a complete,
/// ready-to-print report naming the source.
#[derive(Debug, Error)]
pub enum ConfigurationError {
	/// The document text could not be parsed, or parsed to nothing.
	#[error("Malformed {format} in {source_name}: {message}")]
	Parse {
		/// Name the source was opened under.
		source_name: String,
		/// Document format, e.g. `YAML`.
		format: &'static str,
		/// Parser diagnostic.
		message: String,
	},

	/// An override could not be applied to the parsed tree.
	#[error("Malformed override \"{key}\" for {source_name}: {reason}")]
	Override {
		/// Name the source was opened under.
		source_name: String,
		/// The override key as supplied, prefix included.
		key: String,
		/// Why the key's path could not be followed.
		reason: String,
	},

	/// The tree does not fit the target type.
	#[error("{source_name} has the following error:\n  * {error}")]
	Mapping {
		/// Name the source was opened under.
		source_name: String,
		/// The first node that failed to map, with its property path.
		#[source]
		error: MappingError,
	},

	/// The mapped value breaks one or more declared constraints.
	#[error("{source_name} has the following errors:\n{}", render_violations(.violations))]
	Validation {
		/// Name the source was opened under.
		source_name: String,
		/// Every violation found, sorted by property path.
		violations: Vec<Violation>,
	},

	/// The source could not be read.
	#[error("Unable to read {source_name}: {error}")]
	Io {
		/// Name the source was requested under.
		source_name: String,
		/// The underlying I/O error.
		#[source]
		error: std::io::Error,
	},
}

impl ConfigurationError {
	pub fn kind(&self) -> FailureKind {
		match self {
			Self::Parse { .. } | Self::Override { .. } => FailureKind::Parse,
			Self::Mapping { .. } => FailureKind::Mapping,
			Self::Validation { .. } => FailureKind::Validation,
			Self::Io { .. } => FailureKind::Io,
		}
	}

	/// Name of the source the failure was found in.
	pub fn source_name(&self) -> &str {
		match self {
			Self::Parse { source_name, .. }
			| Self::Override { source_name, .. }
			| Self::Mapping { source_name, .. }
			| Self::Validation { source_name, .. }
			| Self::Io { source_name, .. } => source_name,
		}
	}

	/// Violations of a validation failure; empty for every other kind.
	pub fn violations(&self) -> &[Violation] {
		match self {
			Self::Validation { violations, .. } => violations,
			_ => &[],
		}
	}
}

fn render_violations(violations: &[Violation]) -> String {
	violations.iter().map(|violation| format!("  * {violation}\n")).collect()
}

/// Result type for configuration builds.
pub type Result<T> = std::result::Result<T, ConfigurationError>;
