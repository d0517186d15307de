//! Document text to [`Node`] adapters.

use super::Node;

/// Parses document text into a generic tree.
///
/// The returned error is the parser's own diagnostic, passed through verbatim.
pub trait DocumentParser {
	/// Human-readable format name used in diagnostics, e.g. `YAML`.
	fn format(&self) -> &'static str;

	fn parse(&self, text: &str) -> Result<Node, String>;
}

/// YAML documents via `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl DocumentParser for YamlParser {
	fn format(&self) -> &'static str {
		"YAML"
	}

	fn parse(&self, text: &str) -> Result<Node, String> {
		serde_yaml::from_str(text).map_err(|e| e.to_string())
	}
}

/// JSON documents via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl DocumentParser for JsonParser {
	fn format(&self) -> &'static str {
		"JSON"
	}

	fn parse(&self, text: &str) -> Result<Node, String> {
		serde_json::from_str(text).map_err(|e| e.to_string())
	}
}
