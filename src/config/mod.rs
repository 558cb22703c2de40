// src/config/mod.rs

//! Configuration loading and validation for ibazel.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate values and resolve them into typed settings (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path, load_or_default, DEFAULT_CONFIG_FILE};
pub use model::{BazelSection, ConfigFile, ConfigSection, RawConfigFile};
