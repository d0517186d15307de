//! Dotted-path overrides applied to the parsed tree before typed mapping.
//!
//! Overrides only move strings and reshape containers. Turning `"8080"` into a
//! port number is the mapper's job, which keeps override values and document
//! values subject to the same coercions.

use std::ffi::OsString;

use thiserror::Error;

use crate::tree::{Node, Scalar};

/// Override failures. The factory reports these as malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideError {
	/// The override path cannot be applied to the document.
	#[error("malformed override \"{key}\": {reason}")]
	Path { key: String, reason: String },
	/// A command-line style argument is not of the form `key=value`.
	#[error("malformed override argument \"{argument}\": expected key=value")]
	MalformedArgument { argument: String },
}

impl OverrideError {
	/// The offending override key, or the raw argument for
	/// [`MalformedArgument`](Self::MalformedArgument).
	pub fn key(&self) -> &str {
		match self {
			Self::Path { key, .. } => key,
			Self::MalformedArgument { argument } => argument,
		}
	}

	pub fn reason(&self) -> &str {
		match self {
			Self::Path { reason, .. } => reason,
			Self::MalformedArgument { .. } => "expected key=value",
		}
	}
}

/// Ordered key/value overrides. Later entries win over earlier ones at the same path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
	entries: Vec<(String, String)>,
}

impl Overrides {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		pairs.into_iter().collect()
	}

	/// Parses `key=value` arguments, splitting at the first `=`.
	pub fn from_args<S: AsRef<str>>(args: impl IntoIterator<Item = S>) -> Result<Self, OverrideError> {
		args.into_iter()
			.map(|arg| {
				let arg = arg.as_ref();
				arg.split_once('=')
					.filter(|(key, _)| !key.is_empty())
					.map(|(key, value)| (key.to_string(), value.to_string()))
					.ok_or_else(|| OverrideError::MalformedArgument { argument: arg.to_string() })
			})
			.collect()
	}

	/// Snapshot of the process environment, sorted by key.
	///
	/// Variables whose name or value is not valid unicode are skipped.
	pub fn from_env() -> Self {
		Self::from_vars(std::env::vars_os())
	}

	fn from_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
		let mut entries: Vec<_> = vars
			.into_iter()
			.filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
			.collect();
		entries.sort_by(|a, b| a.0.cmp(&b.0));
		Self { entries }
	}

	pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.entries.push((key.into(), value.into()));
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Overrides {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect(),
		}
	}
}

/// Applies every override whose key starts with `prefix.` to `tree`, in order.
///
/// Returns how many overrides were applied. Missing mappings along the path are
/// created; numeric segments index existing sequences.
pub fn apply(tree: &mut Node, overrides: &Overrides, prefix: &str) -> Result<usize, OverrideError> {
	let mut applied = 0;
	for (key, value) in overrides.iter() {
		let Some(path) = key.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('.')) else {
			continue;
		};
		set(tree, path, value).map_err(|reason| OverrideError::Path {
			key: key.to_string(),
			reason,
		})?;
		tracing::debug!(key, path, "applied config override");
		applied += 1;
	}
	Ok(applied)
}

fn set(tree: &mut Node, path: &str, value: &str) -> Result<(), String> {
	let segments: Vec<&str> = path.split('.').collect();
	if segments.iter().any(|segment| segment.is_empty()) {
		return Err(format!("path \"{path}\" has an empty segment"));
	}
	let Some((last, parents)) = segments.split_last() else {
		return Err("path is empty".to_string());
	};

	let mut walked = String::new();
	let mut node = tree;
	for segment in parents {
		node = child(node, segment, &walked)?;
		if !walked.is_empty() {
			walked.push('.');
		}
		walked.push_str(segment);
	}
	*child(node, last, &walked)? = Node::Scalar(Scalar::String(value.to_string()));
	Ok(())
}

/// Steps from `node` (found at `walked`) into `segment`, creating a mapping
/// child when it is missing.
fn child<'a>(node: &'a mut Node, segment: &str, walked: &str) -> Result<&'a mut Node, String> {
	if node.is_null() {
		*node = Node::mapping();
	}
	match node {
		Node::Mapping(map) => Ok(map.entry(segment.to_string()).or_insert_with(Node::mapping)),
		Node::Sequence(items) => {
			let len = items.len();
			let index: usize = segment
				.parse()
				.map_err(|_| format!("{} is a sequence and \"{segment}\" is not an index", describe(walked)))?;
			items
				.get_mut(index)
				.ok_or_else(|| format!("index {index} is out of range for {} of length {len}", describe(walked)))
		}
		Node::Scalar(_) => Err(format!("{} is a scalar and has no field \"{segment}\"", describe(walked))),
	}
}

fn describe(walked: &str) -> String {
	if walked.is_empty() {
		"the document root".to_string()
	} else {
		format!("\"{walked}\"")
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;
	use crate::tree::{DocumentParser, YamlParser};

	fn tree(text: &str) -> Node {
		YamlParser.parse(text).expect("test document should parse")
	}

	fn string(value: &str) -> Node {
		Node::from(value)
	}

	#[test]
	fn replaces_existing_leaf_with_raw_string() {
		let mut node = tree("server:\n  port: 8080\n");
		let applied = apply(&mut node, &Overrides::from_pairs([("dw.server.port", "9090")]), "dw").expect("applies");
		assert_eq!(applied, 1);
		assert_eq!(node.pointer("server.port"), Some(&string("9090")));
	}

	#[test]
	fn creates_missing_mappings() {
		let mut node = tree("name: keel\n");
		apply(&mut node, &Overrides::from_pairs([("dw.logging.console.target", "stderr")]), "dw").expect("applies");
		assert_eq!(node.pointer("logging.console.target"), Some(&string("stderr")));
		assert_eq!(node.pointer("name"), Some(&string("keel")));
	}

	#[test]
	fn null_parent_becomes_a_mapping() {
		let mut node = tree("server:\n");
		apply(&mut node, &Overrides::from_pairs([("dw.server.port", "1")]), "dw").expect("applies");
		assert_eq!(node.pointer("server.port"), Some(&string("1")));
	}

	#[test]
	fn later_override_wins() {
		let mut node = tree("port: 1\n");
		let overrides = Overrides::from_pairs([("dw.port", "2"), ("dw.port", "3")]);
		assert_eq!(apply(&mut node, &overrides, "dw"), Ok(2));
		assert_eq!(node.pointer("port"), Some(&string("3")));
	}

	#[rstest]
	#[case::other_prefix("app.port")]
	#[case::prefix_without_separator("dwport")]
	#[case::bare_prefix("dw")]
	fn unmatched_keys_are_ignored(#[case] key: &str) {
		let mut node = tree("port: 1\n");
		let before = node.clone();
		assert_eq!(apply(&mut node, &Overrides::from_pairs([(key, "2")]), "dw"), Ok(0));
		assert_eq!(node, before);
	}

	#[test]
	fn pushed_overrides_apply_after_earlier_ones() {
		let mut overrides = Overrides::from_args(["dw.port=2"]).expect("well formed");
		overrides.push("dw.port", "4");
		overrides.push("dw.name", "keel");
		let mut node = tree("port: 1\n");
		assert_eq!(apply(&mut node, &overrides, "dw"), Ok(3));
		assert_eq!(node.pointer("port"), Some(&string("4")));
		assert_eq!(node.pointer("name"), Some(&string("keel")));
	}

	#[test]
	fn numeric_segment_indexes_sequences() {
		let mut node = tree("servers:\n  - port: 1\n  - port: 2\n");
		apply(&mut node, &Overrides::from_pairs([("dw.servers.1.port", "22")]), "dw").expect("applies");
		assert_eq!(node.pointer("servers.1.port"), Some(&string("22")));
		assert_eq!(node.pointer("servers.0.port"), Some(&Node::from(1i64)));
	}

	#[rstest]
	#[case::out_of_range("dw.servers.5.port", "index 5 is out of range for \"servers\" of length 2")]
	#[case::not_an_index("dw.servers.first", "\"servers\" is a sequence and \"first\" is not an index")]
	#[case::through_scalar("dw.name.first", "\"name\" is a scalar and has no field \"first\"")]
	#[case::empty_segment("dw.servers..port", "path \"servers..port\" has an empty segment")]
	#[case::trailing_dot("dw.", "path \"\" has an empty segment")]
	fn malformed_paths_are_rejected(#[case] key: &str, #[case] reason: &str) {
		let mut node = tree("name: keel\nservers:\n  - port: 1\n  - port: 2\n");
		let err = apply(&mut node, &Overrides::from_pairs([(key, "x")]), "dw").expect_err("malformed");
		assert_eq!(err, OverrideError::Path { key: key.to_string(), reason: reason.to_string() });
	}

	#[test]
	fn scalar_root_cannot_be_descended() {
		let mut node = tree("just text\n");
		let err = apply(&mut node, &Overrides::from_pairs([("dw.port", "1")]), "dw").expect_err("scalar root");
		assert_eq!(err.reason(), "the document root is a scalar and has no field \"port\"");
	}

	#[test]
	fn from_args_splits_at_first_equals() {
		let overrides = Overrides::from_args(["dw.url=jdbc:x?a=b", "dw.empty="]).expect("well formed");
		let pairs: Vec<_> = overrides.iter().collect();
		assert_eq!(pairs, [("dw.url", "jdbc:x?a=b"), ("dw.empty", "")]);
	}

	#[rstest]
	#[case("dw.port")]
	#[case("=value")]
	fn from_args_rejects_malformed(#[case] arg: &str) {
		assert_eq!(
			Overrides::from_args([arg]),
			Err(OverrideError::MalformedArgument { argument: arg.to_string() })
		);
	}

	#[test]
	fn environment_snapshot_is_sorted() {
		let overrides = Overrides::from_vars([
			(OsString::from("dw.b"), OsString::from("2")),
			(OsString::from("dw.a"), OsString::from("1")),
		]);
		let keys: Vec<_> = overrides.iter().map(|(key, _)| key).collect();
		assert_eq!(keys, ["dw.a", "dw.b"]);
	}
}
