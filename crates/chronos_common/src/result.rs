//! Errors for malformed design models.
//!
//! Degenerate timing queries are not errors. They are reported as
//! diagnostics and answered with an empty or unbounded result.

use std::fmt;

/// The result of building, editing or propagating a design.
pub type ChronosResult<T> = Result<T, InternalError>;

/// The kind of design object an error names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DesignObject {
    /// A gate pin or port.
    Pin,
    /// A primary input or output, as named by boundary constraints.
    Port,
    /// A net.
    Net,
    /// A gate instance.
    Gate,
}

impl fmt::Display for DesignObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DesignObject::Pin => "pin",
            DesignObject::Port => "port",
            DesignObject::Net => "net",
            DesignObject::Gate => "gate",
        })
    }
}

/// The design model handed to the timer is malformed, e.g. an unknown pin
/// or a combinational loop.
#[derive(Debug, thiserror::Error)]
#[error("internal timer error: {message}")]
pub struct InternalError {
    /// What is wrong.
    pub message: String,
}

impl InternalError {
    /// Creates an error with a free-form message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// A name that is already taken by an object of the same kind.
    pub fn duplicate(kind: DesignObject, name: &str) -> Self {
        Self::new(format!("{kind} `{name}` already exists"))
    }

    /// A name that matches no object of the expected kind.
    pub fn unknown(kind: DesignObject, name: &str) -> Self {
        Self::new(format!("unknown {kind} `{name}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("combinational loop");
        assert_eq!(err.to_string(), "internal timer error: combinational loop");
    }

    #[test]
    fn object_messages() {
        assert_eq!(
            InternalError::duplicate(DesignObject::Gate, "u1").message,
            "gate `u1` already exists"
        );
        assert_eq!(
            InternalError::unknown(DesignObject::Port, "din").message,
            "unknown port `din`"
        );
    }
}
