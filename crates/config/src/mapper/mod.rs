//! Polymorphic-aware mapping from a document tree to typed configuration.

use std::any::TypeId;
use std::sync::Arc;

use serde::de::{self, Deserialize, DeserializeOwned, Deserializer};

use crate::registry::{Polymorphic, SubtypeRegistry};
use crate::tree::path::PathFrame;
use crate::tree::{MappingError, Node, Scalar, from_node};

mod scope;

/// Maps trees onto typed configuration, resolving polymorphic fields through an
/// injected [`SubtypeRegistry`].
#[derive(Debug, Clone)]
pub struct TypeMapper {
	registry: Arc<SubtypeRegistry>,
}

impl TypeMapper {
	pub fn new(registry: Arc<SubtypeRegistry>) -> Self {
		Self { registry }
	}

	/// Maps `node` onto `T`, failing on the first node that does not fit.
	pub fn map<T: DeserializeOwned>(&self, node: Node) -> Result<T, MappingError> {
		let _frame = PathFrame::fresh();
		let scope = scope::enter(Arc::clone(&self.registry));
		from_node(node).map_err(|error| scope.take_deferred(&error).unwrap_or(error))
	}
}

/// `Deserialize` body for `Box<dyn Base>`, generated by [`polymorphic!`](crate::polymorphic).
///
/// Reads the discriminator, resolves it against the active registry (or the
/// global one outside a [`TypeMapper`]) and maps the remaining keys onto the
/// selected variant.
pub fn deserialize_polymorphic<'de, B, D>(deserializer: D) -> Result<Box<B>, D::Error>
where
	B: Polymorphic + ?Sized,
	D: Deserializer<'de>,
{
	let node = Node::deserialize(deserializer)?;
	let registry = match scope::registry() {
		Some(registry) => registry,
		None => SubtypeRegistry::global().map_err(de::Error::custom)?,
	};
	match resolve_variant::<B>(&registry, node) {
		Ok(value) => {
			scope::clear_deferred();
			Ok(value)
		}
		Err(error) => {
			let cause = error.cause().to_string();
			scope::defer(error);
			Err(de::Error::custom(cause))
		}
	}
}

fn resolve_variant<B: Polymorphic + ?Sized>(registry: &SubtypeRegistry, node: Node) -> Result<Box<B>, MappingError> {
	let key = B::DISCRIMINATOR;
	let base = TypeId::of::<B>();
	let known = || registry.known_discriminators_by_id(base).join(", ");
	let mut entries = match node {
		Node::Mapping(entries) => entries,
		other => {
			return Err(MappingError::here(format!(
				"expected a mapping with a \"{key}\" discriminator, found a {}, known: [{}]",
				other.kind(),
				known()
			)));
		}
	};
	let discriminator = match entries.shift_remove(key) {
		Some(Node::Scalar(Scalar::String(discriminator))) => discriminator,
		Some(Node::Scalar(Scalar::Null)) | None => {
			return Err(MappingError::here(format!("missing discriminator \"{key}\", known: [{}]", known())));
		}
		Some(Node::Scalar(scalar)) => scalar.to_string(),
		Some(other) => {
			return Err(MappingError::here(format!(
				"discriminator \"{key}\" must be a scalar, found a {}, known: [{}]",
				other.kind(),
				known()
			)));
		}
	};

	let entry = registry
		.resolve_by_id(base, &discriminator)
		.ok_or_else(|| MappingError::here(format!("unregistered type: {discriminator}, known: [{}]", known())))?;
	tracing::trace!(discriminator = %discriminator, variant = (entry.variant_name)(), "resolved config variant");

	let built = (entry.build)(Node::Mapping(entries))?;
	built
		.downcast::<Box<B>>()
		.map(|boxed| *boxed)
		.map_err(|_| MappingError::here(format!("{} was not registered as a {}", (entry.variant_name)(), std::any::type_name::<B>())))
}

#[cfg(test)]
mod tests;
