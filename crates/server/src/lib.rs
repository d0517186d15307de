//! Server configuration for keel services.
//!
//! Contributes the `http` and `https` connector variants to the subtype
//! registry. Linking this crate is enough for them to resolve:
//!
//! ```yaml
//! server:
//!   applicationConnectors:
//!     - type: https
//!       port: 8443
//!       keyStorePath: /etc/keel/keystore.jks
//!   adminConnectors:
//!     - type: http
//!       port: 8081
//! ```

mod connector;

use keel_config::{Validate, ValidationContext};
use serde::Deserialize;

pub use connector::{ConnectorFactory, HttpConnectorFactory, HttpsConnectorFactory};

/// Connectors for application and admin traffic.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ServerConfig {
	pub application_connectors: Vec<Box<dyn ConnectorFactory>>,
	pub admin_connectors: Vec<Box<dyn ConnectorFactory>>,
	/// Seconds to wait for in-flight requests on shutdown.
	pub shutdown_grace_period_seconds: u64,
}

impl ServerConfig {
	/// Every configured connector, application connectors first.
	pub fn connectors(&self) -> impl Iterator<Item = &(dyn ConnectorFactory + 'static)> {
		self.application_connectors
			.iter()
			.chain(&self.admin_connectors)
			.map(|connector| connector.as_ref())
	}
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			application_connectors: vec![Box::new(HttpConnectorFactory::on_port(8080)) as Box<dyn ConnectorFactory>],
			admin_connectors: vec![Box::new(HttpConnectorFactory::on_port(8081)) as Box<dyn ConnectorFactory>],
			shutdown_grace_period_seconds: 30,
		}
	}
}

impl Validate for ServerConfig {
	fn validate(&self, ctx: &mut ValidationContext<'_>) {
		if self.application_connectors.is_empty() {
			ctx.violation("applicationConnectors", "may not be empty", "[]");
		}
		ctx.nested("applicationConnectors", &self.application_connectors);
		ctx.nested("adminConnectors", &self.admin_connectors);

		let mut ports: Vec<_> = self.connectors().map(|connector| connector.port()).filter(|&port| port != 0).collect();
		ports.sort_unstable();
		let mut clashes: Vec<_> = ports.windows(2).filter(|pair| pair[0] == pair[1]).map(|pair| pair[0]).collect();
		clashes.dedup();
		for port in clashes {
			ctx.violation("ports", "must be distinct across connectors", &port);
		}
	}
}
