//! Connector factories, selected by `type` in a connector mapping.

use std::fmt;

use keel_config::validation::{Min, NotEmpty, NotNull, OneOf, Range};
use keel_config::{ConfigVariant, Validate, ValidationContext};
use serde::Deserialize;

/// Describes one listening connector.
pub trait ConnectorFactory: Validate + fmt::Debug + Send + Sync {
	/// URL scheme served by the connector.
	fn scheme(&self) -> &'static str;

	fn bind_host(&self) -> Option<&str>;

	fn port(&self) -> u16;

	/// `scheme://host:port`, with an unset host shown as `0.0.0.0`.
	fn url(&self) -> String {
		format!("{}://{}:{}", self.scheme(), self.bind_host().unwrap_or("0.0.0.0"), self.port())
	}
}

keel_config::polymorphic!(dyn ConnectorFactory);

keel_config::manifest! {
	dyn ConnectorFactory => [
		HttpConnectorFactory,
		HttpsConnectorFactory,
	]
}

/// Plain HTTP.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct HttpConnectorFactory {
	pub port: u16,
	pub bind_host: Option<String>,
	pub acceptor_threads: usize,
	pub idle_timeout_seconds: u64,
	pub max_request_header_size: usize,
}

impl HttpConnectorFactory {
	pub fn on_port(port: u16) -> Self {
		Self { port, ..Self::default() }
	}

	fn check(&self, ctx: &mut ValidationContext<'_>) {
		ctx.field("acceptorThreads", &self.acceptor_threads).check(&Min(1));
		ctx.field("idleTimeoutSeconds", &self.idle_timeout_seconds).check(&Min(1));
		ctx.field("maxRequestHeaderSize", &self.max_request_header_size).check(&Range::new(1024, 1 << 20));
	}
}

impl Default for HttpConnectorFactory {
	fn default() -> Self {
		Self {
			port: 8080,
			bind_host: None,
			acceptor_threads: 1,
			idle_timeout_seconds: 30,
			max_request_header_size: 8 * 1024,
		}
	}
}

impl ConfigVariant for HttpConnectorFactory {
	const TYPE: &'static str = "http";
}

impl Validate for HttpConnectorFactory {
	fn validate(&self, ctx: &mut ValidationContext<'_>) {
		self.check(ctx);
	}
}

impl ConnectorFactory for HttpConnectorFactory {
	fn scheme(&self) -> &'static str {
		"http"
	}

	fn bind_host(&self) -> Option<&str> {
		self.bind_host.as_deref()
	}

	fn port(&self) -> u16 {
		self.port
	}
}

/// HTTP over TLS. Accepts every HTTP setting plus the key store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct HttpsConnectorFactory {
	pub port: u16,
	pub bind_host: Option<String>,
	pub acceptor_threads: usize,
	pub idle_timeout_seconds: u64,
	pub max_request_header_size: usize,
	pub key_store_path: Option<String>,
	pub key_store_password: Option<String>,
	pub key_store_type: String,
	pub supported_protocols: Vec<String>,
	pub needs_client_auth: bool,
}

impl HttpsConnectorFactory {
	fn http(&self) -> HttpConnectorFactory {
		HttpConnectorFactory {
			port: self.port,
			bind_host: self.bind_host.clone(),
			acceptor_threads: self.acceptor_threads,
			idle_timeout_seconds: self.idle_timeout_seconds,
			max_request_header_size: self.max_request_header_size,
		}
	}
}

impl Default for HttpsConnectorFactory {
	fn default() -> Self {
		let http = HttpConnectorFactory::default();
		Self {
			port: 8443,
			bind_host: http.bind_host,
			acceptor_threads: http.acceptor_threads,
			idle_timeout_seconds: http.idle_timeout_seconds,
			max_request_header_size: http.max_request_header_size,
			key_store_path: None,
			key_store_password: None,
			key_store_type: "JKS".to_string(),
			supported_protocols: vec!["TLSv1.2".to_string(), "TLSv1.3".to_string()],
			needs_client_auth: false,
		}
	}
}

impl ConfigVariant for HttpsConnectorFactory {
	const TYPE: &'static str = "https";
}

impl Validate for HttpsConnectorFactory {
	fn validate(&self, ctx: &mut ValidationContext<'_>) {
		self.http().check(ctx);
		ctx.field("keyStorePath", &self.key_store_path).check(&NotNull);
		ctx.field("keyStoreType", &self.key_store_type).check(&OneOf::new(["JKS", "PKCS12"]).ignore_case());
		ctx.field("supportedProtocols", &self.supported_protocols).check(&NotEmpty);
	}
}

impl ConnectorFactory for HttpsConnectorFactory {
	fn scheme(&self) -> &'static str {
		"https"
	}

	fn bind_host(&self) -> Option<&str> {
		self.bind_host.as_deref()
	}

	fn port(&self) -> u16 {
		self.port
	}
}
