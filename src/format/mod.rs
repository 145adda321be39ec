//! Formatting utilities.
//!
//! The [`hex`] module provides hexadecimal encoding and decoding,
//! used for engine ids in configuration rows and for logging key-free
//! diagnostics.

pub mod hex;
