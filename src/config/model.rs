// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// debounce = "100ms"
///
/// [bazel]
/// path = "bazel"
/// args = ["--config=dev"]
/// write_stdout = true
/// write_stderr = true
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Supervisor behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Build tool invocation from `[bazel]`.
    #[serde(default)]
    pub bazel: BazelSection,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Delay after the most recent file event before acting.
    #[serde(default = "default_debounce")]
    pub debounce: String,
}

fn default_debounce() -> String {
    "100ms".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
        }
    }
}

/// `[bazel]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BazelSection {
    /// Binary used for every build tool invocation.
    #[serde(default = "default_bazel_path")]
    pub path: String,

    /// Extra arguments appended after the verb of every build/test/run.
    #[serde(default)]
    pub args: Vec<String>,

    /// Stream the build tool's stdout to ours.
    #[serde(default = "default_true")]
    pub write_stdout: bool,

    /// Stream the build tool's stderr to ours.
    #[serde(default = "default_true")]
    pub write_stderr: bool,
}

fn default_bazel_path() -> String {
    "bazel".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BazelSection {
    fn default() -> Self {
        Self {
            path: default_bazel_path(),
            args: Vec::new(),
            write_stdout: true,
            write_stderr: true,
        }
    }
}

/// Validated configuration.
///
/// Built from a [`RawConfigFile`] via `TryFrom`, which is the only place the
/// debounce string is parsed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub bazel: BazelSection,
    debounce: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        bazel: BazelSection,
        debounce: Duration,
    ) -> Self {
        Self {
            config,
            bazel,
            debounce,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Replace the debounce window (used for the `--debounce` override).
    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            ConfigSection::default(),
            BazelSection::default(),
            Duration::from_millis(100),
        )
    }
}
