// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// File name looked up in the workspace root when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".ibazel.toml";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate values.
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration for one invocation.
///
/// - An explicit path must exist and parse.
/// - Otherwise `<workspace>/.ibazel.toml` is used when present, and the
///   built-in defaults when not.
pub fn load_or_default(explicit: Option<&Path>, workspace: &Path) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let candidate = workspace.join(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        debug!(path = ?candidate, "loading workspace config");
        load_and_validate(candidate)
    } else {
        debug!("no {DEFAULT_CONFIG_FILE} in workspace; using defaults");
        Ok(ConfigFile::default())
    }
}
