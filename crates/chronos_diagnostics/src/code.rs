//! Diagnostic codes.
//!
//! Every code the timer emits belongs to the timing category and prints as
//! `T` followed by three digits. Numbers in the 100s describe query and
//! analysis outcomes; see `chronos_timing::errors` for the assignments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The family a code belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Timing analysis and path queries.
    Timing,
}

impl Category {
    /// Letter printed in front of the code number.
    pub fn prefix(self) -> char {
        match self {
            Category::Timing => 'T',
        }
    }
}

/// A stable identifier for one kind of diagnostic, e.g. `T103`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// Family of the code.
    pub category: Category,
    /// Number within the family.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a code in `category`.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// Creates a timing code.
    pub const fn timing(number: u16) -> Self {
        Self::new(Category::Timing, number)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_codes_print_padded() {
        assert_eq!(DiagnosticCode::timing(101).to_string(), "T101");
        assert_eq!(DiagnosticCode::timing(7).to_string(), "T007");
    }

    #[test]
    fn usable_in_constants() {
        const LOOP: DiagnosticCode = DiagnosticCode::timing(107);
        assert_eq!(LOOP, DiagnosticCode::new(Category::Timing, 107));
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::timing(104);
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
