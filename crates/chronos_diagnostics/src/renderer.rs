//! Diagnostic rendering for human-readable output.

use crate::diagnostic::Diagnostic;
use chronos_common::Interner;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic, resolving object names through `interner`.
    fn render(&self, diag: &Diagnostic, interner: &Interner) -> String;
}

/// Renders diagnostics in a rustc-like terminal format.
///
/// ```text
/// warning[T103]: capture clock pin is not reached by the clock tree
///   --> pin `ff2:CK`
///    = note: CPPR credit is zero for this endpoint
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes for the severity header.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn header(&self, diag: &Diagnostic) -> String {
        let head = format!("{}[{}]", diag.severity, diag.code);
        if !self.color {
            return head;
        }
        let ansi = match diag.severity {
            crate::Severity::Error => "31",
            crate::Severity::Warning => "33",
            crate::Severity::Note => "36",
        };
        format!("\x1b[1;{ansi}m{head}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, interner: &Interner) -> String {
        let mut out = format!("{}: {}\n", self.header(diag), diag.message);

        if let Some(ident) = diag.location.ident() {
            out.push_str(&format!(
                "  --> {} `{}`\n",
                diag.location.kind(),
                interner.resolve(ident)
            ));
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}
