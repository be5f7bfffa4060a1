//! Configuration types deserialized from `chronos.toml`.

use serde::Deserialize;

/// The top-level timer configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimerConfig {
    /// Analysis options.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Reporting defaults.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Options that change how slack is computed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Whether common-path pessimism removal credit is applied to reports.
    #[serde(default = "default_cppr")]
    pub cppr: bool,
    /// Number of worker threads for path queries. Uses the global rayon pool
    /// when absent.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cppr: default_cppr(),
            num_threads: None,
        }
    }
}

fn default_cppr() -> bool {
    true
}

/// Defaults used when a report call does not specify them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Number of worst paths to report.
    #[serde(default = "default_num_paths")]
    pub num_paths: usize,
    /// Only paths whose slack is at or below this value are enumerated.
    #[serde(default)]
    pub cutoff: Option<f64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            num_paths: default_num_paths(),
            cutoff: None,
        }
    }
}

fn default_num_paths() -> usize {
    1
}
