//! Structural mapping of a [`Node`] onto any `serde` type.
//!
//! Scalars are coerced the way operators expect from hand-written documents and
//! string-valued overrides: `"8080"` maps onto a `u16`, `"on"` onto a `bool`, and
//! `"a, b"` onto a `Vec<String>`.

use std::fmt;

use indexmap::map::IntoIter as MappingIter;
use serde::de::{self, DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, VariantAccess, Visitor};

use super::path::{self, PathGuard};
use super::{Node, Scalar};

/// A failure to map a tree node onto the declared type.
///
/// `path` is the dotted property path of the offending node, empty for the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingError {
	path: String,
	cause: String,
}

impl MappingError {
	pub fn new(path: impl Into<String>, cause: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			cause: cause.into(),
		}
	}

	/// Creates an error located at the node currently being mapped.
	pub fn here(cause: impl Into<String>) -> Self {
		Self::new(path::current(), cause)
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn cause(&self) -> &str {
		&self.cause
	}
}

impl fmt::Display for MappingError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.path.is_empty() {
			f.write_str(&self.cause)
		} else {
			write!(f, "{}: {}", self.path, self.cause)
		}
	}
}

impl std::error::Error for MappingError {}

impl de::Error for MappingError {
	fn custom<T: fmt::Display>(msg: T) -> Self {
		Self::here(msg.to_string())
	}

	fn missing_field(field: &'static str) -> Self {
		Self::new(path::child(field), "missing required field")
	}

	fn unknown_field(field: &str, expected: &'static [&'static str]) -> Self {
		let cause = match suggest(field, expected) {
			Some(candidate) => format!("unrecognized field (did you mean \"{candidate}\"?)"),
			None if expected.is_empty() => "unrecognized field".to_string(),
			None => format!("unrecognized field (expected one of: {})", expected.join(", ")),
		};
		Self::here(cause)
	}

	fn unknown_variant(variant: &str, expected: &'static [&'static str]) -> Self {
		Self::here(format!("unknown variant \"{variant}\", expected one of: {}", expected.join(", ")))
	}
}

/// Picks the closest declared name within a small edit distance.
fn suggest<'a>(field: &str, expected: &[&'a str]) -> Option<&'a str> {
	expected
		.iter()
		.copied()
		.min_by_key(|candidate| strsim::levenshtein(field, candidate))
		.filter(|candidate| strsim::levenshtein(field, candidate) <= 3)
}

/// Maps `node` onto `T`.
pub fn from_node<T: DeserializeOwned>(node: Node) -> Result<T, MappingError> {
	T::deserialize(NodeDeserializer::new(node))
}

/// A `serde` deserializer that consumes an owned [`Node`].
pub struct NodeDeserializer {
	node: Node,
}

impl NodeDeserializer {
	pub fn new(node: Node) -> Self {
		Self { node }
	}

	fn invalid_type(&self, expected: &dyn de::Expected) -> MappingError {
		invalid_type(&self.node, expected)
	}
}

fn invalid_type(node: &Node, expected: &dyn de::Expected) -> MappingError {
	de::Error::invalid_type(node.unexpected(), expected)
}

/// Accepts the spellings operators commonly use for booleans.
pub(crate) fn parse_bool(value: &str) -> Result<bool, String> {
	match value.trim().to_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Ok(true),
		"false" | "0" | "no" | "off" => Ok(false),
		_ => Err(format!("invalid boolean: \"{value}\" (expected true/false, yes/no, on/off, 1/0)")),
	}
}

/// Splits on commas not preceded by a backslash. `a, b\,c` yields `["a", "b,c"]`.
pub(crate) fn split_list(value: &str) -> Vec<String> {
	let mut items = Vec::new();
	let mut current = String::new();
	let mut chars = value.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'\\' if chars.peek() == Some(&',') => {
				current.push(',');
				chars.next();
			}
			',' => items.push(std::mem::take(&mut current).trim().to_string()),
			_ => current.push(c),
		}
	}
	if !current.trim().is_empty() || !items.is_empty() {
		items.push(current.trim().to_string());
	}
	items
}

macro_rules! deserialize_integer {
	($($method:ident => $visit:ident($ty:ty),)*) => {
		$(
			fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
				let value: $ty = match &self.node {
					Node::Scalar(Scalar::Int(i)) => <$ty>::try_from(*i)
						.map_err(|_| MappingError::here(format!("{i} is out of range for {}", stringify!($ty))))?,
					Node::Scalar(Scalar::UInt(u)) => <$ty>::try_from(*u)
						.map_err(|_| MappingError::here(format!("{u} is out of range for {}", stringify!($ty))))?,
					Node::Scalar(Scalar::String(s)) => s
						.trim()
						.parse::<$ty>()
						.map_err(|_| MappingError::here(format!("invalid {}: \"{s}\"", stringify!($ty))))?,
					_ => return Err(self.invalid_type(&visitor)),
				};
				visitor.$visit(value)
			}
		)*
	};
}

macro_rules! deserialize_float {
	($($method:ident => $visit:ident($ty:ty),)*) => {
		$(
			fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
				let value = match &self.node {
					Node::Scalar(Scalar::Float(x)) => *x as $ty,
					Node::Scalar(Scalar::Int(i)) => *i as $ty,
					Node::Scalar(Scalar::UInt(u)) => *u as $ty,
					Node::Scalar(Scalar::String(s)) => s
						.trim()
						.parse::<$ty>()
						.map_err(|_| MappingError::here(format!("invalid {}: \"{s}\"", stringify!($ty))))?,
					_ => return Err(self.invalid_type(&visitor)),
				};
				visitor.$visit(value)
			}
		)*
	};
}

impl<'de> Deserializer<'de> for NodeDeserializer {
	type Error = MappingError;

	fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		match self.node {
			Node::Scalar(Scalar::Null) => visitor.visit_unit(),
			Node::Scalar(Scalar::Bool(b)) => visitor.visit_bool(b),
			Node::Scalar(Scalar::Int(i)) => visitor.visit_i64(i),
			Node::Scalar(Scalar::UInt(u)) => visitor.visit_u64(u),
			Node::Scalar(Scalar::Float(x)) => visitor.visit_f64(x),
			Node::Scalar(Scalar::String(s)) => visitor.visit_string(s),
			Node::Sequence(items) => visit_sequence(items, visitor),
			Node::Mapping(entries) => visitor.visit_map(MappingAccess::new(entries)),
		}
	}

	fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		match &self.node {
			Node::Scalar(Scalar::Bool(b)) => visitor.visit_bool(*b),
			Node::Scalar(Scalar::String(s)) => visitor.visit_bool(parse_bool(s).map_err(MappingError::here)?),
			_ => Err(self.invalid_type(&visitor)),
		}
	}

	deserialize_integer! {
		deserialize_i8 => visit_i8(i8),
		deserialize_i16 => visit_i16(i16),
		deserialize_i32 => visit_i32(i32),
		deserialize_i64 => visit_i64(i64),
		deserialize_u8 => visit_u8(u8),
		deserialize_u16 => visit_u16(u16),
		deserialize_u32 => visit_u32(u32),
		deserialize_u64 => visit_u64(u64),
	}

	deserialize_float! {
		deserialize_f32 => visit_f32(f32),
		deserialize_f64 => visit_f64(f64),
	}

	fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		if let Node::Scalar(Scalar::String(s)) = &self.node {
			let mut chars = s.chars();
			if let (Some(c), None) = (chars.next(), chars.next()) {
				return visitor.visit_char(c);
			}
		}
		Err(self.invalid_type(&visitor))
	}

	fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		self.deserialize_string(visitor)
	}

	fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		match self.node {
			Node::Scalar(Scalar::String(s)) => visitor.visit_string(s),
			Node::Scalar(Scalar::Null) => Err(invalid_type(&self.node, &visitor)),
			Node::Scalar(scalar) => visitor.visit_string(scalar.to_string()),
			ref other => Err(invalid_type(other, &visitor)),
		}
	}

	fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		self.deserialize_byte_buf(visitor)
	}

	fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		match self.node {
			Node::Scalar(Scalar::String(s)) => visitor.visit_byte_buf(s.into_bytes()),
			other => NodeDeserializer::new(other).deserialize_any(visitor),
		}
	}

	fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		if self.node.is_null() { visitor.visit_none() } else { visitor.visit_some(self) }
	}

	fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		if self.node.is_null() {
			visitor.visit_unit()
		} else {
			Err(self.invalid_type(&visitor))
		}
	}

	fn deserialize_unit_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, MappingError> {
		self.deserialize_unit(visitor)
	}

	fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, MappingError> {
		visitor.visit_newtype_struct(self)
	}

	fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		match self.node {
			Node::Sequence(items) => visit_sequence(items, visitor),
			Node::Scalar(Scalar::String(s)) => visit_sequence(split_list(&s).into_iter().map(Node::from).collect(), visitor),
			ref other => Err(invalid_type(other, &visitor)),
		}
	}

	fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, MappingError> {
		self.deserialize_seq(visitor)
	}

	fn deserialize_tuple_struct<V: Visitor<'de>>(self, _name: &'static str, _len: usize, visitor: V) -> Result<V::Value, MappingError> {
		self.deserialize_seq(visitor)
	}

	fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		match self.node {
			Node::Mapping(entries) => visitor.visit_map(MappingAccess::new(entries)),
			ref other => Err(invalid_type(other, &visitor)),
		}
	}

	fn deserialize_struct<V: Visitor<'de>>(self, _name: &'static str, _fields: &'static [&'static str], visitor: V) -> Result<V::Value, MappingError> {
		self.deserialize_map(visitor)
	}

	fn deserialize_enum<V: Visitor<'de>>(
		self,
		_name: &'static str,
		_variants: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, MappingError> {
		match self.node {
			Node::Scalar(Scalar::String(variant)) => visitor.visit_enum(variant.into_deserializer()),
			Node::Mapping(entries) if entries.len() == 1 => {
				let mut entries = entries.into_iter();
				match entries.next() {
					Some((variant, value)) => visitor.visit_enum(EnumAccessor { variant, value }),
					None => Err(MappingError::here("expected a variant name")),
				}
			}
			ref other => Err(MappingError::here(format!(
				"expected a variant name or a single-key mapping, found a {}",
				other.kind()
			))),
		}
	}

	fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		self.deserialize_string(visitor)
	}

	fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, MappingError> {
		visitor.visit_unit()
	}
}

fn visit_sequence<'de, V: Visitor<'de>>(items: Vec<Node>, visitor: V) -> Result<V::Value, MappingError> {
	let total = items.len();
	let mut access = SequenceAccess {
		items: items.into_iter(),
		index: 0,
	};
	let value = visitor.visit_seq(&mut access)?;
	let remaining = access.items.len();
	if remaining > 0 {
		return Err(de::Error::invalid_length(total, &format!("{} elements", access.index).as_str()));
	}
	Ok(value)
}

struct SequenceAccess {
	items: std::vec::IntoIter<Node>,
	index: usize,
}

impl<'de> SeqAccess<'de> for SequenceAccess {
	type Error = MappingError;

	fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, MappingError> {
		let Some(node) = self.items.next() else {
			return Ok(None);
		};
		let _segment = PathGuard::index(self.index);
		self.index += 1;
		seed.deserialize(NodeDeserializer::new(node)).map(Some)
	}

	fn size_hint(&self) -> Option<usize> {
		Some(self.items.len())
	}
}

struct MappingAccess {
	entries: MappingIter<String, Node>,
	pending: Option<(String, Node)>,
}

impl MappingAccess {
	fn new(entries: indexmap::IndexMap<String, Node>) -> Self {
		Self {
			entries: entries.into_iter(),
			pending: None,
		}
	}
}

impl<'de> MapAccess<'de> for MappingAccess {
	type Error = MappingError;

	fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, MappingError> {
		let Some((key, value)) = self.entries.next() else {
			return Ok(None);
		};
		let _segment = PathGuard::key(&key);
		let decoded = seed.deserialize(NodeDeserializer::new(Node::from(key.as_str())))?;
		self.pending = Some((key, value));
		Ok(Some(decoded))
	}

	fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, MappingError> {
		let (key, value) = self.pending.take().ok_or_else(|| MappingError::here("mapping value requested before its key"))?;
		let _segment = PathGuard::key(&key);
		seed.deserialize(NodeDeserializer::new(value))
	}

	fn size_hint(&self) -> Option<usize> {
		Some(self.entries.len())
	}
}

struct EnumAccessor {
	variant: String,
	value: Node,
}

impl<'de> EnumAccess<'de> for EnumAccessor {
	type Error = MappingError;
	type Variant = VariantAccessor;

	fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, VariantAccessor), MappingError> {
		let decoded = {
			let _segment = PathGuard::key(&self.variant);
			seed.deserialize(NodeDeserializer::new(Node::from(self.variant.as_str())))?
		};
		Ok((
			decoded,
			VariantAccessor {
				variant: self.variant,
				value: self.value,
			},
		))
	}
}

struct VariantAccessor {
	variant: String,
	value: Node,
}

impl<'de> VariantAccess<'de> for VariantAccessor {
	type Error = MappingError;

	fn unit_variant(self) -> Result<(), MappingError> {
		let _segment = PathGuard::key(&self.variant);
		if self.value.is_null() {
			Ok(())
		} else {
			Err(invalid_type(&self.value, &"a unit variant"))
		}
	}

	fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, MappingError> {
		let _segment = PathGuard::key(&self.variant);
		seed.deserialize(NodeDeserializer::new(self.value))
	}

	fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, MappingError> {
		let _segment = PathGuard::key(&self.variant);
		NodeDeserializer::new(self.value).deserialize_seq(visitor)
	}

	fn struct_variant<V: Visitor<'de>>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value, MappingError> {
		let _segment = PathGuard::key(&self.variant);
		NodeDeserializer::new(self.value).deserialize_map(visitor)
	}
}
