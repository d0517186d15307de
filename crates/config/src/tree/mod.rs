//! Generic document tree.
//!
//! Every supported document format is parsed into a [`Node`] first. The tree is
//! patched by the override engine and then mapped onto the caller's types by
//! [`NodeDeserializer`]. It never outlives a single factory build.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

mod deserializer;
pub mod parse;
pub(crate) mod path;

pub use deserializer::{MappingError, NodeDeserializer, from_node};
pub use parse::{DocumentParser, JsonParser, YamlParser};

/// Untyped document structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	Scalar(Scalar),
	Sequence(Vec<Node>),
	/// Keys keep the order they had in the source document.
	Mapping(IndexMap<String, Node>),
}

/// Leaf value of a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	Null,
	Bool(bool),
	Int(i64),
	UInt(u64),
	Float(f64),
	String(String),
}

impl Node {
	pub const NULL: Node = Node::Scalar(Scalar::Null);

	/// Creates an empty mapping node.
	pub fn mapping() -> Self {
		Node::Mapping(IndexMap::new())
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Node::Scalar(Scalar::Null))
	}

	pub fn as_mapping(&self) -> Option<&IndexMap<String, Node>> {
		match self {
			Node::Mapping(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Node::Scalar(Scalar::String(s)) => Some(s),
			_ => None,
		}
	}

	/// Looks up a child by a dotted path such as `server.connector.port`.
	///
	/// Numeric segments index into sequences.
	pub fn pointer(&self, path: &str) -> Option<&Node> {
		path.split('.').try_fold(self, |node, segment| match node {
			Node::Mapping(map) => map.get(segment),
			Node::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
			Node::Scalar(_) => None,
		})
	}

	/// Short name of the node's shape, used in diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			Node::Scalar(Scalar::Null) => "null",
			Node::Scalar(_) => "scalar",
			Node::Sequence(_) => "sequence",
			Node::Mapping(_) => "mapping",
		}
	}

	pub(crate) fn unexpected(&self) -> Unexpected<'_> {
		match self {
			Node::Scalar(scalar) => scalar.unexpected(),
			Node::Sequence(_) => Unexpected::Seq,
			Node::Mapping(_) => Unexpected::Map,
		}
	}
}

impl Scalar {
	pub(crate) fn unexpected(&self) -> Unexpected<'_> {
		match self {
			Scalar::Null => Unexpected::Other("null"),
			Scalar::Bool(b) => Unexpected::Bool(*b),
			Scalar::Int(i) => Unexpected::Signed(*i),
			Scalar::UInt(u) => Unexpected::Unsigned(*u),
			Scalar::Float(f) => Unexpected::Float(*f),
			Scalar::String(s) => Unexpected::Str(s),
		}
	}
}

impl fmt::Display for Scalar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Scalar::Null => f.write_str("null"),
			Scalar::Bool(b) => write!(f, "{b}"),
			Scalar::Int(i) => write!(f, "{i}"),
			Scalar::UInt(u) => write!(f, "{u}"),
			Scalar::Float(x) => write!(f, "{x}"),
			Scalar::String(s) => f.write_str(s),
		}
	}
}

impl From<&str> for Node {
	fn from(value: &str) -> Self {
		Node::Scalar(Scalar::String(value.to_string()))
	}
}

impl From<String> for Node {
	fn from(value: String) -> Self {
		Node::Scalar(Scalar::String(value))
	}
}

impl From<bool> for Node {
	fn from(value: bool) -> Self {
		Node::Scalar(Scalar::Bool(value))
	}
}

impl From<i64> for Node {
	fn from(value: i64) -> Self {
		Node::Scalar(Scalar::Int(value))
	}
}

impl FromIterator<Node> for Node {
	fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
		Node::Sequence(iter.into_iter().collect())
	}
}

impl<K: Into<String>> FromIterator<(K, Node)> for Node {
	fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
		Node::Mapping(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}
}

impl<'de> Deserialize<'de> for Node {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_any(NodeVisitor)
	}
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
	type Value = Node;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("any document value")
	}

	fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
		Ok(Node::Scalar(Scalar::Bool(v)))
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
		Ok(Node::Scalar(Scalar::Int(v)))
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
		// Keep non-negative values that fit as signed so equality is format-independent.
		Ok(Node::Scalar(match i64::try_from(v) {
			Ok(i) => Scalar::Int(i),
			Err(_) => Scalar::UInt(v),
		}))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
		Ok(Node::Scalar(Scalar::Float(v)))
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
		Ok(Node::from(v))
	}

	fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
		Ok(Node::from(v))
	}

	fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
		Ok(Node::NULL)
	}

	fn visit_none<E: de::Error>(self) -> Result<Node, E> {
		Ok(Node::NULL)
	}

	fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
		Node::deserialize(deserializer)
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
		let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
		while let Some(item) = seq.next_element::<Node>()? {
			items.push(item);
		}
		Ok(Node::Sequence(items))
	}

	fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
		let mut entries = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
		while let Some((key, value)) = map.next_entry::<Node, Node>()? {
			let key = match key {
				Node::Scalar(scalar) => scalar.to_string(),
				other => {
					return Err(de::Error::custom(format!("mapping keys must be scalars, found a {}", other.kind())));
				}
			};
			entries.insert(key, value);
		}
		Ok(Node::Mapping(entries))
	}
}

impl Serialize for Node {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Node::Scalar(Scalar::Null) => serializer.serialize_unit(),
			Node::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
			Node::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
			Node::Scalar(Scalar::UInt(u)) => serializer.serialize_u64(*u),
			Node::Scalar(Scalar::Float(x)) => serializer.serialize_f64(*x),
			Node::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
			Node::Sequence(items) => {
				let mut seq = serializer.serialize_seq(Some(items.len()))?;
				for item in items {
					seq.serialize_element(item)?;
				}
				seq.end()
			}
			Node::Mapping(entries) => {
				let mut map = serializer.serialize_map(Some(entries.len()))?;
				for (key, value) in entries {
					map.serialize_entry(key, value)?;
				}
				map.end()
			}
		}
	}
}
