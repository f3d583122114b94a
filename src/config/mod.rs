// src/config/mod.rs

//! Settings loading and validation.
//!
//! - TOML-backed data model (`model.rs`), including the `[commands]` table
//!   that backs known commands.
//! - Loading from disk (`loader.rs`).
//! - Validation of basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{RawSettings, RunnerSection, Settings};
pub use validate::validate_settings;
