//! Shared foundational types used across the Chronos timing toolchain.
//!
//! This crate provides interned design object names, including the
//! `gate:pin` naming rule for gate pins, and the error type for malformed
//! design models.

#![warn(missing_docs)]

pub mod ident;
pub mod result;

pub use ident::{split_pin_name, Ident, Interner, PIN_SEPARATOR};
pub use result::{ChronosResult, DesignObject, InternalError};
