//! Diagnostic creation, severity management, and terminal rendering.
//!
//! The timer never prints. Degenerate queries and timing violations are
//! described as structured [`Diagnostic`] values carrying a severity, a
//! `T`-prefixed code and the design object they concern. A thread-safe
//! [`DiagnosticSink`] accumulates them while parallel queries run, and
//! [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod location;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use location::Location;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
