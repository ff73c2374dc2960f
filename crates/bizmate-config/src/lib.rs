// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Bizmate.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.
//!
//! # Usage
//!
//! ```no_run
//! let config = bizmate_config::load().expect("config errors");
//! println!("assistant: {}", config.agent.name);
//! ```

pub mod loader;
pub mod model;

pub use loader::{load_config_from_path, load_config_from_str};
pub use model::BizmateConfig;

use bizmate_core::BizmateError;

/// Load configuration from the XDG hierarchy and env vars, converting
/// figment errors into the shared error type.
pub fn load() -> Result<BizmateConfig, BizmateError> {
    loader::load_config().map_err(|e| BizmateError::Config(e.to_string()))
}
