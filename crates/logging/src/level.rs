use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

/// Logging threshold as written in configuration (`INFO`, `debug`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Level {
	Off,
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
	All,
}

impl Level {
	const NAMES: [(&'static str, Level); 7] = [
		("OFF", Level::Off),
		("ERROR", Level::Error),
		("WARN", Level::Warn),
		("INFO", Level::Info),
		("DEBUG", Level::Debug),
		("TRACE", Level::Trace),
		("ALL", Level::All),
	];

	pub fn as_str(self) -> &'static str {
		Self::NAMES.iter().find(|(_, level)| *level == self).map_or("INFO", |(name, _)| *name)
	}

	/// The most verbose `tracing` level let through, or `None` for [`Level::Off`].
	pub fn as_tracing(self) -> Option<tracing::Level> {
		match self {
			Level::Off => None,
			Level::Error => Some(tracing::Level::ERROR),
			Level::Warn => Some(tracing::Level::WARN),
			Level::Info => Some(tracing::Level::INFO),
			Level::Debug => Some(tracing::Level::DEBUG),
			Level::Trace | Level::All => Some(tracing::Level::TRACE),
		}
	}

	pub fn filter(self) -> LevelFilter {
		self.as_tracing().map_or(LevelFilter::OFF, LevelFilter::from_level)
	}
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Level {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::NAMES
			.iter()
			.find(|(name, _)| name.eq_ignore_ascii_case(s.trim()))
			.map(|(_, level)| *level)
			.ok_or_else(|| {
				let names: Vec<_> = Self::NAMES.iter().map(|(name, _)| *name).collect();
				format!("unknown level \"{s}\", expected one of: {}", names.join(", "))
			})
	}
}

impl TryFrom<String> for Level {
	type Error = String;

	fn try_from(value: String) -> Result<Self, <Self as TryFrom<String>>::Error> {
		value.parse()
	}
}
