//! Registration macros.

/// Declares `dyn Trait` as a polymorphic configuration base.
///
/// Implements [`Polymorphic`](crate::registry::Polymorphic) and `Deserialize` for
/// `Box<dyn Trait>`, so the trait object can be used directly as a field type.
/// The discriminator key defaults to `type`.
///
/// ```ignore
/// pub trait ConnectorFactory: Validate + Send + Sync {}
/// keel_config::polymorphic!(dyn ConnectorFactory);
/// keel_config::polymorphic!(dyn AppenderFactory, key = "kind");
/// ```
#[macro_export]
macro_rules! polymorphic {
	(dyn $base:path) => {
		$crate::polymorphic!(dyn $base, key = "type");
	};
	(dyn $base:path, key = $key:literal) => {
		impl $crate::registry::Polymorphic for dyn $base {
			const DISCRIMINATOR: &'static str = $key;
		}

		impl<'de> $crate::__private::serde::Deserialize<'de> for ::std::boxed::Box<dyn $base> {
			fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
			where
				D: $crate::__private::serde::Deserializer<'de>,
			{
				$crate::mapper::deserialize_polymorphic::<dyn $base, D>(deserializer)
			}
		}
	};
}

/// Contributes variants of a polymorphic base to the subtype registry.
///
/// One variant per entry. Each variant must implement
/// [`ConfigVariant`](crate::registry::ConfigVariant) and the base trait; the
/// latter is checked at compile time. Manifests from different crates are
/// concatenated at link time.
///
/// ```ignore
/// keel_config::manifest! {
///     dyn ConnectorFactory => [
///         HttpConnectorFactory,
///         HttpsConnectorFactory,
///     ]
/// }
/// ```
#[macro_export]
macro_rules! manifest {
	(dyn $base:path => [$($variant:ty),+ $(,)?]) => {
		$(
			$crate::__private::inventory::submit! {
				$crate::registry::SubtypeEntry {
					base: ::std::any::TypeId::of::<dyn $base>,
					base_name: ::std::any::type_name::<dyn $base>,
					variant: ::std::any::TypeId::of::<$variant>,
					variant_name: ::std::any::type_name::<$variant>,
					discriminator: <$variant as $crate::registry::ConfigVariant>::TYPE,
					crate_name: env!("CARGO_PKG_NAME"),
					build: |node| {
						let variant: $variant = $crate::tree::from_node(node)?;
						let base: ::std::boxed::Box<dyn $base> = ::std::boxed::Box::new(variant);
						::std::result::Result::Ok(::std::boxed::Box::new(base) as ::std::boxed::Box<dyn ::std::any::Any>)
					},
				}
			}
		)+
	};
}
