//! Interned names for pins, nets, gates and cells.
//!
//! Gate pins are named hierarchically as `<gate>:<pin>` (`u1:A`); ports and
//! nets keep their plain names.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// Separator between a gate instance and its pin in a pin name.
pub const PIN_SEPARATOR: char = ':';

/// An interned design object name.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Creates an `Ident` from a raw index, for tests and deserialization.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

// SAFETY: `try_from_usize` only accepts values that fit the wrapped `u32`.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// Splits a pin name into its gate and pin parts.
///
/// Port names have no gate part: `split_pin_name("clk")` is `(None, "clk")`.
pub fn split_pin_name(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once(PIN_SEPARATOR) {
        Some((gate, pin)) => (Some(gate), pin),
        None => (None, name),
    }
}

/// Name table shared by the circuit and diagnostic rendering.
///
/// Interning takes `&self`, so names can be added while the table is shared.
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Default for Interner {
    fn default() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }
}

impl Interner {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning the existing identifier if already present.
    pub fn get_or_intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Interns the name of pin `pin` on gate `gate`.
    pub fn intern_gate_pin(&self, gate: Ident, pin: &str) -> Ident {
        let full = format!("{}{PIN_SEPARATOR}{pin}", self.resolve(gate));
        self.rodeo.get_or_intern(full)
    }

    /// Looks up `s` without interning it.
    pub fn get(&self, s: &str) -> Option<Ident> {
        self.rodeo.get(s)
    }

    /// Resolves an identifier back to its name.
    ///
    /// # Panics
    ///
    /// Panics if `ident` came from another interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_ident() {
        let interner = Interner::new();
        let a = interner.get_or_intern("clk");
        assert_eq!(interner.get_or_intern("clk"), a);
        assert_eq!(interner.resolve(a), "clk");
    }

    #[test]
    fn lookup_does_not_intern() {
        let interner = Interner::new();
        assert_eq!(interner.get("net_7"), None);
        let id = interner.get_or_intern("net_7");
        assert_eq!(interner.get("net_7"), Some(id));
    }

    #[test]
    fn gate_pins_are_hierarchical() {
        let interner = Interner::new();
        let u1 = interner.get_or_intern("u1");
        let a = interner.intern_gate_pin(u1, "A");
        assert_eq!(interner.resolve(a), "u1:A");
        assert_eq!(interner.get("u1:A"), Some(a));
        assert_eq!(split_pin_name("u1:A"), (Some("u1"), "A"));
        assert_eq!(split_pin_name("clk"), (None, "clk"));
    }

    #[test]
    fn serde_roundtrip() {
        let id = Ident(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: Ident = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
