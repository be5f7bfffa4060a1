//! The design object a diagnostic is attached to.

use chronos_common::Ident;
use serde::{Deserialize, Serialize};

/// Where in the design a diagnostic applies.
///
/// Timing diagnostics point at netlist objects rather than at source text;
/// the name is resolved through the circuit's interner when rendering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Location {
    /// The design as a whole.
    Design,
    /// A pin, named `gate:pin` or by its primary I/O name.
    Pin(Ident),
    /// A net.
    Net(Ident),
    /// A gate instance.
    Gate(Ident),
}

impl Location {
    /// Returns the object kind as it appears in rendered output.
    pub fn kind(self) -> &'static str {
        match self {
            Location::Design => "design",
            Location::Pin(_) => "pin",
            Location::Net(_) => "net",
            Location::Gate(_) => "gate",
        }
    }

    /// Returns the object name, if the location names one.
    pub fn ident(self) -> Option<Ident> {
        match self {
            Location::Design => None,
            Location::Pin(id) | Location::Net(id) | Location::Gate(id) => Some(id),
        }
    }
}
