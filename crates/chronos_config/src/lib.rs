//! Parsing and validation of `chronos.toml` analysis configuration files.
//!
//! The timer reads a small TOML file that selects analysis options (CPPR on
//! or off, worker thread count) and reporting defaults (number of paths,
//! slack cutoff). Every section and field is optional.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::{AnalysisConfig, ReportConfig, TimerConfig};
