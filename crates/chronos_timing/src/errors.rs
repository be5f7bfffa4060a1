//! Diagnostic codes and helper functions for timing queries.
//!
//! Codes `T101`--`T107` cover degenerate queries (zero paths, unreachable
//! through pins), incomplete clocking, combinational loops and violated
//! checks.

use chronos_diagnostics::{Diagnostic, DiagnosticCode, Location};

/// A path query asked for zero paths.
pub const T101: DiagnosticCode = DiagnosticCode::timing(101);

/// The through pin of a query does not reach the endpoint.
pub const T102: DiagnosticCode = DiagnosticCode::timing(102);

/// The capturing clock pin of a check is not in the clock tree.
pub const T103: DiagnosticCode = DiagnosticCode::timing(103);

/// No path is within the requested slack cutoff.
pub const T104: DiagnosticCode = DiagnosticCode::timing(104);

/// A timing check fails.
pub const T105: DiagnosticCode = DiagnosticCode::timing(105);

/// The design has sequential checks but no clock.
pub const T106: DiagnosticCode = DiagnosticCode::timing(106);

/// The timing graph contains a combinational loop.
pub const T107: DiagnosticCode = DiagnosticCode::timing(107);

/// Creates a diagnostic for a query that asked for no paths.
pub fn error_zero_paths(location: Location) -> Diagnostic {
    Diagnostic::error(T101, "the number of paths must be positive", location)
        .with_help("request at least one path")
}

/// Creates a diagnostic for a through pin that cannot reach the endpoint.
pub fn warning_unreachable_through(through: &str, location: Location) -> Diagnostic {
    Diagnostic::warning(
        T102,
        format!("no data path through `{through}` reaches this endpoint"),
        location,
    )
}

/// Creates a diagnostic for a capture clock pin outside the clock tree.
pub fn warning_unclocked_capture(clock_pin: &str, location: Location) -> Diagnostic {
    Diagnostic::warning(
        T103,
        format!("capture clock pin `{clock_pin}` is not driven by the clock"),
        location,
    )
    .with_note("pessimism removal is skipped for this check")
}

/// Creates a diagnostic for a query whose cutoff excludes every path.
pub fn note_no_path_within_cutoff(cutoff: f64, location: Location) -> Diagnostic {
    Diagnostic::note(T104, format!("no path has slack at or below {cutoff}"), location)
}

/// Creates a diagnostic for a failing check.
pub fn warning_timing_not_met(kind: &str, slack: f64, location: Location) -> Diagnostic {
    Diagnostic::warning(T105, format!("{kind} timing not met: slack {slack:.3}"), location)
}

/// Creates a diagnostic for sequential checks analyzed without a clock.
pub fn warning_no_clock(num_checks: usize) -> Diagnostic {
    Diagnostic::warning(
        T106,
        format!("{num_checks} sequential check(s) but no clock is defined"),
        Location::Design,
    )
    .with_help("define a clock on a primary input")
}

/// Creates a diagnostic for a graph that cannot be levelized.
pub fn error_combinational_loop(message: &str) -> Diagnostic {
    Diagnostic::error(T107, message.to_string(), Location::Design)
}
