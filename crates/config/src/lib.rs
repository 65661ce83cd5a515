//! Configuration loading, env substitution, env overrides and validation.
//!
//! Config files: `alertcast.toml`, `alertcast.yaml`, or `alertcast.json`
//! Searched in `./` then the user config dir (`~/.config/alertcast/`).
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, config_dir, default_data_dir, discover_and_load, find_config_file,
        load_config,
    },
    schema::{AlertcastConfig, StorageConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_file},
};
