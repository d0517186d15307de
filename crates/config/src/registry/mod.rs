//! Discoverable subtype registry.
//!
//! Polymorphic configuration fields (`Box<dyn ConnectorFactory>`, ...) pick their
//! concrete type from a discriminator key in the document. The set of available
//! variants is open: any linked crate can contribute variants through
//! [`manifest!`](crate::manifest), which submits one [`SubtypeEntry`] per variant
//! via `inventory`. The linker concatenates every crate's entries and
//! [`SubtypeRegistry::discover`] turns them into a lookup table.
//!
//! The table is built once and never mutated afterwards. [`SubtypeRegistry::global`]
//! memoizes the discovered registry for the whole process; tests and embedders
//! can instead assemble their own with [`SubtypeRegistry::from_entries`].

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;

use crate::tree::{MappingError, Node};

mod macros;

/// Marks `dyn Trait` as a polymorphic configuration base.
///
/// Implemented by [`polymorphic!`](crate::polymorphic).
pub trait Polymorphic: 'static {
	/// Mapping key whose value selects the variant.
	const DISCRIMINATOR: &'static str = "type";
}

/// A concrete variant of some polymorphic base.
pub trait ConfigVariant: DeserializeOwned + 'static {
	/// Discriminator value naming this variant in documents, e.g. `"https"`.
	const TYPE: &'static str;
}

/// Builds a variant from its mapping node and boxes it as `Box<dyn Base>` inside `Box<dyn Any>`.
pub type VariantBuilder = fn(Node) -> Result<Box<dyn Any>, MappingError>;

/// One manifest line: a variant registered under a polymorphic base.
pub struct SubtypeEntry {
	pub base: fn() -> TypeId,
	pub base_name: fn() -> &'static str,
	pub variant: fn() -> TypeId,
	/// Fully-qualified variant type name.
	pub variant_name: fn() -> &'static str,
	pub discriminator: &'static str,
	/// Crate that contributed the entry.
	pub crate_name: &'static str,
	pub build: VariantBuilder,
}

inventory::collect!(SubtypeEntry);

impl fmt::Debug for SubtypeEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SubtypeEntry")
			.field("base", &(self.base_name)())
			.field("variant", &(self.variant_name)())
			.field("discriminator", &self.discriminator)
			.field("crate_name", &self.crate_name)
			.finish()
	}
}

/// Registry build failures. These indicate a broken build and are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	/// Two variants of the same base claim the same discriminator.
	#[error("duplicate discriminator \"{discriminator}\" for {base}: {existing} and {new}")]
	DuplicateDiscriminator {
		base: &'static str,
		discriminator: &'static str,
		existing: &'static str,
		new: &'static str,
	},
	/// A manifest entry cannot be registered as declared.
	#[error("invalid manifest entry {variant} from {crate_name}: {reason}")]
	InvalidEntry {
		variant: &'static str,
		crate_name: &'static str,
		reason: String,
	},
}

struct BaseTable {
	name: &'static str,
	variants: BTreeMap<&'static str, &'static SubtypeEntry>,
}

/// Discriminator lookup table, keyed by polymorphic base.
#[derive(Default)]
pub struct SubtypeRegistry {
	bases: FxHashMap<TypeId, BaseTable>,
}

static GLOBAL: OnceLock<Result<Arc<SubtypeRegistry>, RegistryError>> = OnceLock::new();

impl SubtypeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a registry from every entry linked into the process.
	pub fn discover() -> Result<Self, RegistryError> {
		Self::from_entries(inventory::iter::<SubtypeEntry>)
	}

	/// Returns the process-wide registry, discovering it on first use.
	///
	/// Every call observes the same frozen table, or the same build error.
	pub fn global() -> Result<Arc<Self>, RegistryError> {
		GLOBAL
			.get_or_init(|| {
				let result = Self::discover().map(Arc::new);
				if let Err(error) = &result {
					tracing::error!(%error, "subtype registry build failed");
				}
				result
			})
			.clone()
	}

	/// Builds a registry from an explicit set of entries.
	///
	/// Entries are registered in a stable order so that collision reports do not
	/// depend on link order.
	pub fn from_entries(entries: impl IntoIterator<Item = &'static SubtypeEntry>) -> Result<Self, RegistryError> {
		let mut entries: Vec<_> = entries.into_iter().collect();
		entries.sort_by(|a, b| {
			(a.base_name)()
				.cmp((b.base_name)())
				.then_with(|| a.discriminator.cmp(b.discriminator))
				.then_with(|| (a.variant_name)().cmp((b.variant_name)()))
		});

		let mut registry = Self::new();
		for entry in entries {
			registry.register(entry)?;
		}
		tracing::debug!(bases = registry.bases.len(), variants = registry.len(), "subtype registry built");
		Ok(registry)
	}

	/// Adds one entry, rejecting malformed discriminators and collisions.
	pub fn register(&mut self, entry: &'static SubtypeEntry) -> Result<(), RegistryError> {
		check_discriminator(entry)?;

		let table = self.bases.entry((entry.base)()).or_insert_with(|| BaseTable {
			name: (entry.base_name)(),
			variants: BTreeMap::new(),
		});
		if let Some(existing) = table.variants.get(entry.discriminator) {
			return Err(RegistryError::DuplicateDiscriminator {
				base: table.name,
				discriminator: entry.discriminator,
				existing: (existing.variant_name)(),
				new: (entry.variant_name)(),
			});
		}
		table.variants.insert(entry.discriminator, entry);
		tracing::trace!(
			base = table.name,
			discriminator = entry.discriminator,
			variant = (entry.variant_name)(),
			crate_name = entry.crate_name,
			"registered config variant"
		);
		Ok(())
	}

	/// Looks up the variant registered for `discriminator` under base `B`.
	pub fn resolve<B: Polymorphic + ?Sized>(&self, discriminator: &str) -> Option<&'static SubtypeEntry> {
		self.resolve_by_id(TypeId::of::<B>(), discriminator)
	}

	pub fn resolve_by_id(&self, base: TypeId, discriminator: &str) -> Option<&'static SubtypeEntry> {
		self.bases.get(&base)?.variants.get(discriminator).copied()
	}

	/// Registered discriminators for base `B`, sorted.
	pub fn known_discriminators<B: Polymorphic + ?Sized>(&self) -> Vec<&'static str> {
		self.known_discriminators_by_id(TypeId::of::<B>())
	}

	pub fn known_discriminators_by_id(&self, base: TypeId) -> Vec<&'static str> {
		self.bases.get(&base).map(|table| table.variants.keys().copied().collect()).unwrap_or_default()
	}

	/// Fully-qualified names of every variant discovered for base `B`, sorted.
	pub fn discovered_variants<B: Polymorphic + ?Sized>(&self) -> Vec<&'static str> {
		let mut names: Vec<_> = self
			.bases
			.get(&TypeId::of::<B>())
			.map(|table| table.variants.values().map(|entry| (entry.variant_name)()).collect())
			.unwrap_or_default();
		names.sort_unstable();
		names
	}

	/// Whether `V` is registered as a variant of base `B`.
	pub fn is_discoverable<B: Polymorphic + ?Sized, V: 'static>(&self) -> bool {
		let variant = TypeId::of::<V>();
		self.bases
			.get(&TypeId::of::<B>())
			.is_some_and(|table| table.variants.values().any(|entry| (entry.variant)() == variant))
	}

	/// Total number of registered variants across all bases.
	pub fn len(&self) -> usize {
		self.bases.values().map(|table| table.variants.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.bases.is_empty()
	}
}

impl fmt::Debug for SubtypeRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		let mut tables: Vec<_> = self.bases.values().collect();
		tables.sort_by_key(|table| table.name);
		for table in tables {
			map.entry(&table.name, &table.variants.keys().collect::<Vec<_>>());
		}
		map.finish()
	}
}

fn check_discriminator(entry: &SubtypeEntry) -> Result<(), RegistryError> {
	let reason = if entry.discriminator.is_empty() {
		Some("discriminator is empty".to_string())
	} else if entry.discriminator.chars().any(|c| c.is_whitespace() || c.is_control()) {
		Some(format!("discriminator {:?} contains whitespace or control characters", entry.discriminator))
	} else {
		None
	};
	match reason {
		Some(reason) => Err(RegistryError::InvalidEntry {
			variant: (entry.variant_name)(),
			crate_name: entry.crate_name,
			reason,
		}),
		None => Ok(()),
	}
}

#[cfg(test)]
mod tests;
