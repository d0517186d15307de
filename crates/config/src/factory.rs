//! Parse, override, map and validate in one pass.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{ConfigurationError, Result};
use crate::mapper::TypeMapper;
use crate::overrides::{self, Overrides};
use crate::registry::{RegistryError, SubtypeRegistry};
use crate::source::SourceProvider;
use crate::tree::{DocumentParser, YamlParser};
use crate::validation::{self, Validate};

/// Source name reported for [`ConfigurationFactory::build_default`].
pub const DEFAULT_SOURCE: &str = "default configuration";

/// Builds validated `T` values from configuration sources.
///
/// A factory is immutable once configured and holds no reference to the values
/// it returns, so one instance can serve any number of builds.
pub struct ConfigurationFactory<T, P = YamlParser> {
	mapper: TypeMapper,
	parser: P,
	prefix: String,
	overrides: Overrides,
	_target: PhantomData<fn() -> T>,
}

impl<T> ConfigurationFactory<T> {
	/// Creates a YAML factory. Overrides are only applied when their key starts
	/// with `prefix.`.
	pub fn new(registry: Arc<SubtypeRegistry>, prefix: impl Into<String>) -> Self {
		Self {
			mapper: TypeMapper::new(registry),
			parser: YamlParser,
			prefix: prefix.into(),
			overrides: Overrides::new(),
			_target: PhantomData,
		}
	}

	/// Creates a YAML factory over the process-wide registry.
	pub fn with_global_registry(prefix: impl Into<String>) -> std::result::Result<Self, RegistryError> {
		Ok(Self::new(SubtypeRegistry::global()?, prefix))
	}
}

impl<T, P> ConfigurationFactory<T, P> {
	/// Switches the document format.
	pub fn with_parser<Q: DocumentParser>(self, parser: Q) -> ConfigurationFactory<T, Q> {
		ConfigurationFactory {
			mapper: self.mapper,
			parser,
			prefix: self.prefix,
			overrides: self.overrides,
			_target: PhantomData,
		}
	}

	pub fn with_overrides(mut self, overrides: Overrides) -> Self {
		self.overrides = overrides;
		self
	}
}

impl<T, P> ConfigurationFactory<T, P>
where
	T: DeserializeOwned + Validate,
	P: DocumentParser,
{
	/// Reads `name` from `provider` and builds it.
	pub fn build(&self, provider: &impl SourceProvider, name: &str) -> Result<T> {
		let text = provider
			.open(name)
			.map_err(|error| ConfigurationError::Io {
				source_name: name.to_string(),
				error,
			})
			.inspect_err(log_failure)?;
		self.build_from_str(name, &text)
	}

	/// Builds from document text; `name` only appears in error reports.
	pub fn build_from_str(&self, name: &str, text: &str) -> Result<T> {
		self.run(name, text).inspect_err(log_failure)
	}

	/// Validates and returns `T::default()`, for running without a configuration file.
	pub fn build_default(&self) -> Result<T>
	where
		T: Default,
	{
		tracing::debug!(source = DEFAULT_SOURCE, "using default configuration");
		let value = T::default();
		check(DEFAULT_SOURCE, &value).inspect_err(log_failure)?;
		Ok(value)
	}

	fn run(&self, name: &str, text: &str) -> Result<T> {
		let format = self.parser.format();
		tracing::debug!(source = name, format, "parsing configuration");
		let parse_failure = |message: String| ConfigurationError::Parse {
			source_name: name.to_string(),
			format,
			message,
		};
		let mut tree = self.parser.parse(text).map_err(parse_failure)?;
		if tree.is_null() {
			return Err(parse_failure("document is empty".to_string()));
		}

		let applied = overrides::apply(&mut tree, &self.overrides, &self.prefix).map_err(|error| ConfigurationError::Override {
			source_name: name.to_string(),
			key: error.key().to_string(),
			reason: error.reason().to_string(),
		})?;
		tracing::debug!(source = name, applied, "applied configuration overrides");

		let value: T = self.mapper.map(tree).map_err(|error| ConfigurationError::Mapping {
			source_name: name.to_string(),
			error,
		})?;
		tracing::debug!(source = name, "mapped configuration");

		check(name, &value)?;
		tracing::debug!(source = name, "configuration is valid");
		Ok(value)
	}
}

fn check<T: Validate>(name: &str, value: &T) -> Result<()> {
	let violations = validation::validate(value);
	if violations.is_empty() {
		Ok(())
	} else {
		Err(ConfigurationError::Validation {
			source_name: name.to_string(),
			violations,
		})
	}
}

fn log_failure(error: &ConfigurationError) {
	tracing::debug!(source = error.source_name(), kind = ?error.kind(), "configuration build failed");
}

impl<T, P: fmt::Debug> fmt::Debug for ConfigurationFactory<T, P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConfigurationFactory")
			.field("target", &std::any::type_name::<T>())
			.field("parser", &self.parser)
			.field("prefix", &self.prefix)
			.field("overrides", &self.overrides.len())
			.finish()
	}
}
