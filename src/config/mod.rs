// src/config/mod.rs

//! Batch file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a batch file from disk (`loader.rs`).
//! - Validate names, dependency references and sweeps (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{ConfigFile, ConfigSection, DefaultSection, JobConfig, RawConfigFile};
