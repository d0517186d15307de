use std::any::type_name;
use std::path::Path;

use keel_config::{ConfigurationFactory, FailureKind, SubtypeRegistry};
use keel_logging::{AppenderFactory, ConsoleAppenderFactory, FileAppenderFactory, Level, LoggingConfig};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn factory() -> ConfigurationFactory<LoggingConfig> {
	ConfigurationFactory::with_global_registry("dw").expect("registry builds")
}

fn file_config(path: &Path, extra: &str) -> String {
	format!(
		"level: INFO\n{extra}appenders:\n  - type: file\n    threshold: WARN\n    currentLogFilename: {}\n",
		path.display()
	)
}

#[rstest]
#[case::console(type_name::<ConsoleAppenderFactory>())]
#[case::file(type_name::<FileAppenderFactory>())]
fn appender_factories_are_discoverable(#[case] variant: &str) {
	let registry = SubtypeRegistry::global().expect("registry builds");
	assert!(registry.discovered_variants::<dyn AppenderFactory>().iter().any(|name| *name == variant));
}

#[test]
fn console_appender_is_discoverable() {
	let registry = SubtypeRegistry::global().expect("registry builds");
	assert!(registry.is_discoverable::<dyn AppenderFactory, ConsoleAppenderFactory>());
	assert_eq!(registry.known_discriminators::<dyn AppenderFactory>(), ["console", "file"]);
}

#[test]
fn defaults_log_info_to_the_console() {
	let config = factory().build_default().expect("defaults are valid");
	assert_eq!(config.level, Level::Info);
	assert_eq!(config.appenders.len(), 1);
	assert_eq!(config.appenders[0].threshold(), Level::All);
}

#[test]
fn maps_levels_loggers_and_appenders() {
	let config = factory()
		.build_from_str(
			"logging.yml",
			"level: debug\nloggers:\n  keel_config: TRACE\n  hyper: off\nappenders:\n  - type: console\n    target: stderr\n    threshold: warn\n",
		)
		.expect("valid");
	assert_eq!(config.level, Level::Debug);
	let loggers: Vec<_> = config.loggers.iter().map(|(target, level)| (target.as_str(), *level)).collect();
	assert_eq!(loggers, [("keel_config", Level::Trace), ("hyper", Level::Off)]);
	assert_eq!(config.appenders[0].threshold(), Level::Warn);
}

#[test]
fn file_appender_honours_its_threshold() {
	let dir = tempfile::tempdir().expect("temp dir");
	let path = dir.path().join("logs/app.log");
	let config = factory().build_from_str("logging.yml", &file_config(&path, "")).expect("valid");

	let subscriber = config.subscriber().expect("appenders open");
	tracing::subscriber::with_default(subscriber, || {
		tracing::info!("below the appender threshold");
		tracing::warn!(port = 8080, "connector port in use");
	});

	let written = std::fs::read_to_string(&path).expect("log file written");
	assert!(written.contains("connector port in use"), "{written}");
	assert!(written.contains("port=8080"), "{written}");
	assert!(!written.contains("below the appender threshold"), "{written}");
}

#[test]
fn logger_levels_override_the_root_level() {
	let dir = tempfile::tempdir().expect("temp dir");
	let path = dir.path().join("app.log");
	let config = factory()
		.build_from_str("logging.yml", &file_config(&path, "loggers:\n  noisy: OFF\n"))
		.expect("valid");

	tracing::subscriber::with_default(config.subscriber().expect("appenders open"), || {
		tracing::error!(target: "noisy", "silenced target");
		tracing::error!(target: "audit", "kept target");
	});

	let written = std::fs::read_to_string(&path).expect("log file written");
	assert!(written.contains("kept target"), "{written}");
	assert!(!written.contains("silenced target"), "{written}");
}

#[test]
fn file_appender_requires_a_filename() {
	let err = factory()
		.build_from_str("logging.yml", "appenders:\n  - type: file\n    bufferSize: 0\n")
		.err()
		.expect("no filename");
	assert_eq!(
		err.to_string(),
		"logging.yml has the following errors:\n\
		 \x20 * appenders[0].bufferSize must be greater than or equal to 1 (was 0)\n\
		 \x20 * appenders[0].currentLogFilename may not be null (was null)\n"
	);
}

#[rstest]
#[case::level("level: LOUD\n", "level: unknown level \"LOUD\", expected one of: OFF, ERROR, WARN, INFO, DEBUG, TRACE, ALL")]
#[case::target(
	"appenders:\n  - type: console\n    target: printer\n",
	"appenders[0].target: unknown variant \"printer\", expected one of: stdout, stderr"
)]
#[case::appender("appenders:\n  - type: syslog\n", "appenders[0]: unregistered type: syslog, known: [console, file]")]
fn mapping_failures_are_located(#[case] document: &str, #[case] cause: &str) {
	let err = factory().build_from_str("logging.yml", document).err().expect("mapping failure");
	assert_eq!(err.kind(), FailureKind::Mapping);
	assert_eq!(err.to_string(), format!("logging.yml has the following error:\n  * {cause}"));
}
