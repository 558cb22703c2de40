#![allow(dead_code)]

use ibazel::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn debounce(mut self, value: &str) -> Self {
        self.config.config.debounce = value.to_string();
        self
    }

    pub fn bazel(mut self, path: &str) -> Self {
        self.config.bazel.path = path.to_string();
        self
    }

    pub fn bazel_arg(mut self, arg: &str) -> Self {
        self.config.bazel.args.push(arg.to_string());
        self
    }

    pub fn quiet(mut self) -> Self {
        self.config.bazel.write_stdout = false;
        self.config.bazel.write_stderr = false;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
