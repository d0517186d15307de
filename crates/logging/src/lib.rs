//! Logging configuration for keel services.
//!
//! A [`LoggingConfig`] maps onto a `tracing-subscriber` registry: one `fmt`
//! layer writing to every configured appender, filtered by the root level and
//! per-target overrides.
//!
//! ```yaml
//! logging:
//!   level: INFO
//!   loggers:
//!     keel_config: DEBUG
//!   appenders:
//!     - type: console
//!       target: stderr
//!     - type: file
//!       threshold: WARN
//!       currentLogFilename: /var/log/keel/app.log
//! ```

mod appender;
mod level;

use indexmap::IndexMap;
use keel_config::{Validate, ValidationContext};
use serde::Deserialize;
use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;

pub use appender::{AppenderFactory, ConsoleAppenderFactory, ConsoleTarget, FileAppenderFactory};
pub use level::Level;

/// Failures turning a [`LoggingConfig`] into an installed subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
	#[error("unable to open appender {index}: {error}")]
	Appender {
		index: usize,
		#[source]
		error: std::io::Error,
	},
	#[error("a global subscriber is already installed")]
	AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Root level, per-target levels and appenders.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct LoggingConfig {
	pub level: Level,
	/// Per-target levels, e.g. `keel_config: DEBUG`.
	pub loggers: IndexMap<String, Level>,
	pub appenders: Vec<Box<dyn AppenderFactory>>,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: Level::Info,
			loggers: IndexMap::new(),
			appenders: vec![Box::new(ConsoleAppenderFactory::default()) as Box<dyn AppenderFactory>],
		}
	}
}

impl Validate for LoggingConfig {
	fn validate(&self, ctx: &mut ValidationContext<'_>) {
		for target in self.loggers.keys().filter(|target| target.trim().is_empty()) {
			ctx.violation("loggers", "may not contain an empty target", target);
		}
		ctx.nested("appenders", &self.appenders);
	}
}

impl LoggingConfig {
	/// Level filter applied before any appender sees an event.
	pub fn targets(&self) -> Targets {
		Targets::new()
			.with_default(self.level.filter())
			.with_targets(self.loggers.iter().map(|(target, level)| (target.clone(), level.filter())))
	}

	/// Builds the subscriber without installing it.
	pub fn subscriber(&self) -> Result<impl Subscriber + Send + Sync + use<>, LoggingError> {
		let writer = self
			.appenders
			.iter()
			.enumerate()
			.map(|(index, appender)| appender.make_writer().map_err(|error| LoggingError::Appender { index, error }))
			.try_fold(None::<BoxMakeWriter>, |combined, writer| {
				let writer = writer?;
				Ok::<_, LoggingError>(Some(match combined {
					Some(combined) => BoxMakeWriter::new(combined.and(writer)),
					None => writer,
				}))
			})?
			.unwrap_or_else(|| BoxMakeWriter::new(std::io::sink));

		Ok(tracing_subscriber::registry()
			.with(self.targets())
			.with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false).with_target(true)))
	}

	/// Installs the subscriber as the process-wide default.
	pub fn install(&self) -> Result<(), LoggingError> {
		tracing::subscriber::set_global_default(self.subscriber()?)?;
		tracing::debug!(level = %self.level, appenders = self.appenders.len(), "logging installed");
		Ok(())
	}
}
