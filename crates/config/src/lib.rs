//! Typed, validated service configuration with open-world polymorphism.
//!
//! A build runs one pass over a named source:
//!
//! 1. **Parse** the document (YAML by default) into a generic [`Node`] tree.
//! 2. **Override** leaves from `prefix.`-scoped key/value pairs, usually the
//!    process environment or command-line flags.
//! 3. **Map** the tree onto the target type with serde. Fields typed
//!    `Box<dyn Trait>` pick their concrete type from a discriminator key, looked
//!    up in a [`SubtypeRegistry`] assembled from every linked crate's
//!    [`manifest!`].
//! 4. **Validate** the whole value and report every violation at once.
//!
//! ```ignore
//! pub trait ConnectorFactory: Validate + Send + Sync {
//!     fn describe(&self) -> String;
//! }
//! keel_config::polymorphic!(dyn ConnectorFactory);
//!
//! keel_config::manifest! {
//!     dyn ConnectorFactory => [HttpConnectorFactory, HttpsConnectorFactory]
//! }
//!
//! let factory = ConfigurationFactory::<ServerConfig>::with_global_registry("dw")?
//!     .with_overrides(Overrides::from_env());
//! let config = factory.build(&FileSourceProvider::new(), "server.yml")?;
//! ```
//!
//! Failures are one of three kinds plus I/O (see [`FailureKind`]); each
//! renders as a complete report naming the source and the property paths
//! involved:
//!
//! ```text
//! server.yml has the following errors:
//!   * connector.port must be between 1 and 65535 (was 0)
//! ```

pub mod error;
pub mod factory;
pub mod mapper;
pub mod overrides;
pub mod registry;
pub mod source;
pub mod tree;
pub mod validation;

pub use error::{ConfigurationError, FailureKind, Result};
pub use factory::ConfigurationFactory;
pub use mapper::TypeMapper;
pub use overrides::{OverrideError, Overrides};
pub use registry::{ConfigVariant, Polymorphic, RegistryError, SubtypeEntry, SubtypeRegistry};
pub use source::{FileSourceProvider, SourceProvider, StaticSourceProvider};
pub use tree::{DocumentParser, JsonParser, MappingError, Node, Scalar, YamlParser};
pub use validation::{Constraint, ReportValue, Validate, ValidationContext, Violation};

#[doc(hidden)]
pub mod __private {
	pub use inventory;
	pub use serde;
}
