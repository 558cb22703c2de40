// src/config/validate.rs

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{IbazelError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::IbazelError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_bazel_section(&raw)?;
        let debounce = parse_duration(&raw.config.debounce).map_err(|e| {
            IbazelError::ConfigError(format!("[config].debounce is invalid: {e}"))
        })?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.bazel, debounce))
    }
}

fn validate_bazel_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.bazel.path.trim().is_empty() {
        return Err(IbazelError::ConfigError(
            "[bazel].path must not be empty".to_string(),
        ));
    }

    if let Some(arg) = cfg.bazel.args.iter().find(|a| a.trim().is_empty()) {
        return Err(IbazelError::ConfigError(format!(
            "[bazel].args contains an empty argument ({arg:?})"
        )));
    }

    Ok(())
}
