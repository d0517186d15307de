use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::Deserialize;

use super::*;
use crate::registry::ConfigVariant;
use crate::tree::{DocumentParser, YamlParser};

trait Connector: Send + Sync {
	fn scheme(&self) -> &'static str;
	fn port(&self) -> u16;
}

crate::polymorphic!(dyn Connector);

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Plain {
	port: u16,
}

impl ConfigVariant for Plain {
	const TYPE: &'static str = "http";
}

impl Connector for Plain {
	fn scheme(&self) -> &'static str {
		"http"
	}

	fn port(&self) -> u16 {
		self.port
	}
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct Tls {
	port: u16,
	key_store_path: String,
}

impl ConfigVariant for Tls {
	const TYPE: &'static str = "https";
}

impl Connector for Tls {
	fn scheme(&self) -> &'static str {
		"https"
	}

	fn port(&self) -> u16 {
		self.port
	}
}

crate::manifest! {
	dyn Connector => [Plain, Tls]
}

trait Sink: Send + Sync {}

crate::polymorphic!(dyn Sink, key = "kind");

#[derive(Debug, Deserialize)]
struct Discard {}

impl ConfigVariant for Discard {
	const TYPE: &'static str = "discard";
}

impl Sink for Discard {}

crate::manifest! {
	dyn Sink => [Discard]
}

#[derive(Deserialize)]
struct Server {
	connector: Box<dyn Connector>,
	#[serde(default)]
	connectors: Vec<Box<dyn Connector>>,
}

fn mapper() -> TypeMapper {
	TypeMapper::new(Arc::new(SubtypeRegistry::discover().expect("test manifests register")))
}

fn yaml(text: &str) -> Node {
	YamlParser.parse(text).expect("test document should parse")
}

#[test]
fn resolves_variant_by_discriminator() {
	let server: Server = mapper()
		.map(yaml("connector:\n  type: https\n  port: 8443\n  keyStorePath: /etc/keystore\n"))
		.expect("maps");
	assert_eq!(server.connector.scheme(), "https");
	assert_eq!(server.connector.port(), 8443);
}

#[test]
fn resolves_each_sequence_element_independently() {
	let server: Server = mapper()
		.map(yaml("connector:\n  type: http\n  port: 80\nconnectors:\n  - type: http\n    port: 8080\n  - type: https\n    port: 8443\n    keyStorePath: ks\n"))
		.expect("maps");
	let schemes: Vec<_> = server.connectors.iter().map(|c| (c.scheme(), c.port())).collect();
	assert_eq!(schemes, [("http", 8080), ("https", 8443)]);
}

#[test]
fn missing_discriminator_fails_at_the_field() {
	let err = mapper().map::<Server>(yaml("connector:\n  port: 80\n")).err().expect("no discriminator");
	assert_eq!(err, MappingError::new("connector", "missing discriminator \"type\", known: [http, https]"));
}

#[test]
fn unregistered_discriminator_lists_known_types_sorted() {
	let err = mapper().map::<Server>(yaml("connector:\n  type: spdy\n")).err().expect("unknown type");
	assert_eq!(err, MappingError::new("connector", "unregistered type: spdy, known: [http, https]"));
}

#[test]
fn injected_registry_is_used_instead_of_global() {
	let empty = TypeMapper::new(Arc::new(SubtypeRegistry::new()));
	let err = empty.map::<Server>(yaml("connector:\n  type: http\n  port: 80\n")).err().expect("nothing registered");
	assert_eq!(err.cause(), "unregistered type: http, known: []");
}

#[test]
fn errors_inside_variants_keep_their_full_path() {
	let err = mapper()
		.map::<Server>(yaml("connector:\n  type: http\n  port: 80\nconnectors:\n  - type: http\n    port: 81\n  - type: https\n    port: huge\n    keyStorePath: ks\n"))
		.err()
		.expect("bad port");
	assert_eq!(err, MappingError::new("connectors[1].port", "invalid u16: \"huge\""));
}

#[test]
fn missing_variant_fields_are_located() {
	let err = mapper().map::<Server>(yaml("connector:\n  type: https\n  port: 1\n")).err().expect("no keystore");
	assert_eq!(err, MappingError::new("connector.keyStorePath", "missing required field"));
}

#[rstest]
#[case::number("connector:\n  type: 5\n", "unregistered type: 5, known: [http, https]")]
#[case::boolean("connector:\n  type: true\n", "unregistered type: true, known: [http, https]")]
#[case::null_tag("connector:\n  type: ~\n", "missing discriminator \"type\", known: [http, https]")]
#[case::sequence_tag("connector:\n  type: [http]\n", "discriminator \"type\" must be a scalar, found a sequence, known: [http, https]")]
fn non_string_discriminators_are_rendered_as_text(#[case] document: &str, #[case] cause: &str) {
	let err = mapper().map::<Server>(yaml(document)).err().expect("unresolvable tag");
	assert_eq!(err, MappingError::new("connector", cause));
}

#[test]
fn custom_key_discriminator_is_rendered_as_text() {
	#[derive(Deserialize)]
	struct Codec {
		codec: Box<dyn Sink>,
	}
	let err = mapper().map::<Codec>(yaml("codec:\n  kind: 7\n")).err().expect("unknown kind");
	assert_eq!(err.cause(), "unregistered type: 7, known: [discard]");
}

#[rstest]
#[case::scalar("connector: http\n", "scalar")]
#[case::null("connector:\n", "null")]
#[case::sequence("connector: [http]\n", "sequence")]
fn polymorphic_node_must_be_a_mapping(#[case] document: &str, #[case] found: &str) {
	let err = mapper().map::<Server>(yaml(document)).err().expect("not a mapping");
	assert_eq!(err.path(), "connector");
	assert_eq!(
		err.cause(),
		format!("expected a mapping with a \"type\" discriminator, found a {found}, known: [http, https]")
	);
}

#[test]
fn custom_discriminator_key() {
	#[derive(Deserialize)]
	struct Logging {
		sink: Box<dyn Sink>,
	}
	let mapper = mapper();
	assert!(mapper.map::<Logging>(yaml("sink:\n  kind: discard\n")).is_ok());
	let err = mapper.map::<Logging>(yaml("sink:\n  type: discard\n")).err().expect("wrong key");
	assert_eq!(err.cause(), "missing discriminator \"kind\", known: [discard]");
}

#[test]
fn polymorphic_root() {
	let connector: Box<dyn Connector> = mapper().map(yaml("type: http\nport: 9000\n")).expect("maps");
	assert_eq!(connector.port(), 9000);
}

#[test]
fn outside_a_mapper_the_global_registry_is_used() {
	let connector: Box<dyn Connector> = serde_json::from_str(r#"{"type": "http", "port": 7000}"#).expect("maps through global registry");
	assert_eq!(connector.port(), 7000);
}

#[test]
fn scope_is_released_after_mapping() {
	let _ = mapper().map::<Server>(yaml("connector:\n  type: nope\n"));
	assert!(scope::registry().is_none());
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Upstream {
	Connector(Box<dyn Connector>),
	Name(String),
}

#[derive(Deserialize)]
struct Proxy {
	upstream: Upstream,
	port: u16,
}

#[test]
fn recovered_polymorphic_failure_does_not_mask_a_later_error() {
	let err = mapper().map::<Proxy>(yaml("upstream: backend\nport: abc\n")).err().expect("bad port");
	assert_eq!(err, MappingError::new("port", "invalid u16: \"abc\""));
}

#[test]
fn untagged_fallback_accepts_either_shape() {
	let named = mapper().map::<Proxy>(yaml("upstream: backend\nport: 80\n")).expect("maps");
	assert!(matches!(named.upstream, Upstream::Name(ref name) if name == "backend"));
	let tagged = mapper().map::<Proxy>(yaml("upstream:\n  type: http\n  port: 81\nport: 80\n")).expect("maps");
	assert!(matches!(tagged.upstream, Upstream::Connector(ref connector) if connector.port() == 81));
}

#[test]
fn nested_failure_keeps_its_deeper_path() {
	#[derive(Deserialize)]
	struct Wrapper {
		servers: Vec<Server>,
	}
	let err = mapper()
		.map::<Wrapper>(yaml("servers:\n  - connector:\n      type: https\n      port: 1\n      keyStorePath: ks\n      extra: 2\n"))
		.err()
		.expect("unknown field");
	assert_eq!(err.path(), "servers[0].connector.extra");
}
