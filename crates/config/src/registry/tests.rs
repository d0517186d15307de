use std::any::{TypeId, type_name};
use std::sync::Arc;

use serde::Deserialize;

use super::*;
use crate::tree::{DocumentParser, YamlParser};

trait Shape: Send + Sync {
	fn area(&self) -> f64;
}

crate::polymorphic!(dyn Shape);

#[derive(Debug, Deserialize)]
struct Square {
	side: f64,
}

impl ConfigVariant for Square {
	const TYPE: &'static str = "square";
}

impl Shape for Square {
	fn area(&self) -> f64 {
		self.side * self.side
	}
}

#[derive(Debug, Deserialize)]
struct Circle {
	radius: f64,
}

impl ConfigVariant for Circle {
	const TYPE: &'static str = "circle";
}

impl Shape for Circle {
	fn area(&self) -> f64 {
		std::f64::consts::PI * self.radius * self.radius
	}
}

crate::manifest! {
	dyn Shape => [
		Square,
		Circle,
	]
}

struct Impostor;

fn unused_builder(_: Node) -> Result<Box<dyn Any>, MappingError> {
	Err(MappingError::new("", "not buildable"))
}

const fn impostor(discriminator: &'static str) -> SubtypeEntry {
	SubtypeEntry {
		base: TypeId::of::<dyn Shape>,
		base_name: type_name::<dyn Shape>,
		variant: TypeId::of::<Impostor>,
		variant_name: type_name::<Impostor>,
		discriminator,
		crate_name: "registry-tests",
		build: unused_builder,
	}
}

static IMPOSTOR: SubtypeEntry = impostor("square");
static BLANK: SubtypeEntry = impostor("");
static SPACED: SubtypeEntry = impostor("round thing");

fn shape_entries() -> impl Iterator<Item = &'static SubtypeEntry> {
	inventory::iter::<SubtypeEntry>
		.into_iter()
		.filter(|entry| (entry.base)() == TypeId::of::<dyn Shape>())
}

#[test]
fn discovers_linked_manifest_entries() {
	let registry = SubtypeRegistry::discover().expect("linked manifests should register cleanly");
	assert!(registry.is_discoverable::<dyn Shape, Square>());
	assert!(registry.is_discoverable::<dyn Shape, Circle>());
	assert!(!registry.is_discoverable::<dyn Shape, Impostor>());
}

#[test]
fn known_discriminators_are_sorted() {
	let registry = SubtypeRegistry::from_entries(shape_entries()).expect("registers");
	assert_eq!(registry.known_discriminators::<dyn Shape>(), ["circle", "square"]);
	assert_eq!(registry.len(), 2);
}

#[test]
fn discovered_variants_are_fully_qualified() {
	let registry = SubtypeRegistry::from_entries(shape_entries()).expect("registers");
	let variants = registry.discovered_variants::<dyn Shape>();
	assert_eq!(variants, [type_name::<Circle>(), type_name::<Square>()]);
	assert!(variants.iter().all(|name| name.contains("::")));
}

#[test]
fn resolve_builds_the_selected_variant() {
	let registry = SubtypeRegistry::from_entries(shape_entries()).expect("registers");
	let entry = registry.resolve::<dyn Shape>("square").expect("square is registered");
	let node = YamlParser.parse("side: 3\n").expect("valid yaml");
	let built = (entry.build)(node).expect("builds");
	let shape = built.downcast::<Box<dyn Shape>>().expect("boxed as the base");
	assert_eq!(shape.area(), 9.0);
}

#[test]
fn resolve_miss_is_not_an_error() {
	let registry = SubtypeRegistry::from_entries(shape_entries()).expect("registers");
	assert!(registry.resolve::<dyn Shape>("hexagon").is_none());
}

#[test]
fn unknown_base_has_no_variants() {
	trait Unused {}
	crate::polymorphic!(dyn Unused);
	let registry = SubtypeRegistry::from_entries(shape_entries()).expect("registers");
	assert!(registry.known_discriminators::<dyn Unused>().is_empty());
	assert!(registry.discovered_variants::<dyn Unused>().is_empty());
}

#[test]
fn duplicate_discriminator_is_rejected() {
	let err = SubtypeRegistry::from_entries(shape_entries().chain([&IMPOSTOR])).expect_err("collision");
	assert_eq!(
		err,
		RegistryError::DuplicateDiscriminator {
			base: type_name::<dyn Shape>(),
			discriminator: "square",
			existing: type_name::<Impostor>(),
			new: type_name::<Square>(),
		}
	);
}

#[test]
fn register_rejects_duplicates_incrementally() {
	let mut registry = SubtypeRegistry::new();
	registry.register(&IMPOSTOR).expect("first registration");
	assert!(matches!(
		registry.register(&IMPOSTOR),
		Err(RegistryError::DuplicateDiscriminator { discriminator: "square", .. })
	));
}

#[test]
fn malformed_discriminators_are_rejected() {
	for entry in [&BLANK, &SPACED] {
		let err = SubtypeRegistry::from_entries([entry]).expect_err("malformed");
		assert!(matches!(err, RegistryError::InvalidEntry { crate_name: "registry-tests", .. }), "{err}");
	}
}

#[test]
fn global_registry_is_built_once() {
	let first = SubtypeRegistry::global().expect("global registry");
	let second = SubtypeRegistry::global().expect("global registry");
	assert!(Arc::ptr_eq(&first, &second));
	assert!(first.is_discoverable::<dyn Shape, Circle>());
}

#[test]
fn global_registry_supports_concurrent_readers() {
	let handles: Vec<_> = (0..8)
		.map(|_| {
			std::thread::spawn(|| {
				let registry = SubtypeRegistry::global().expect("global registry");
				registry.resolve::<dyn Shape>("circle").map(|entry| (entry.variant_name)())
			})
		})
		.collect();
	for handle in handles {
		assert_eq!(handle.join().expect("reader thread"), Some(type_name::<Circle>()));
	}
}
