// tests/config_loading.rs

mod common;
use crate::common::builders::ConfigFileBuilder;

use std::fs;
use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use ibazel::config::{load_and_validate, load_or_default, DEFAULT_CONFIG_FILE};
use ibazel::errors::IbazelError;

#[test]
fn workspace_config_is_picked_up() {
    let ws = tempfile::tempdir().unwrap();
    fs::write(
        ws.path().join(DEFAULT_CONFIG_FILE),
        r#"
[config]
debounce = "250ms"

[bazel]
path = "bazelisk"
args = ["--config=dev", "--keep_going"]
write_stdout = false
"#,
    )
    .unwrap();

    let cfg = load_or_default(None, ws.path()).unwrap();
    assert_eq!(cfg.debounce(), Duration::from_millis(250));
    assert_eq!(cfg.bazel.path, "bazelisk");
    assert_eq!(cfg.bazel.args, vec!["--config=dev", "--keep_going"]);
    assert!(!cfg.bazel.write_stdout);
    assert!(cfg.bazel.write_stderr);
}

#[test]
fn missing_workspace_config_uses_defaults() {
    let ws = tempfile::tempdir().unwrap();
    let cfg = load_or_default(None, ws.path()).unwrap();
    assert_eq!(cfg.debounce(), Duration::from_millis(100));
    assert_eq!(cfg.bazel.path, "bazel");
    assert!(cfg.bazel.args.is_empty());
}

#[test]
fn explicit_config_must_exist() {
    let ws = tempfile::tempdir().unwrap();
    let missing = ws.path().join("nope.toml");
    let err = load_or_default(Some(missing.as_path()), ws.path()).unwrap_err();
    assert!(matches!(err, IbazelError::IoError(_)));
}

#[test]
fn malformed_toml_is_reported() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[config\ndebounce = ").unwrap();

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, IbazelError::TomlError(_)));
}

#[test]
fn invalid_values_are_config_errors() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[config]\ndebounce = \"fast\"\n").unwrap();

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, IbazelError::ConfigError(_)));
    assert_eq!(err.exit_code(), ibazel::errors::EXIT_FAILURE);
}

#[test]
fn builder_produces_validated_config() {
    let cfg = ConfigFileBuilder::new()
        .debounce("1s")
        .bazel_arg("--config=ci")
        .quiet()
        .build();

    assert_eq!(cfg.debounce(), Duration::from_secs(1));
    assert_eq!(cfg.bazel.args, vec!["--config=ci"]);
    assert!(!cfg.bazel.write_stdout && !cfg.bazel.write_stderr);

    let raw = ConfigFileBuilder::new().bazel("").raw();
    assert!(ibazel::config::ConfigFile::try_from(raw).is_err());
}
