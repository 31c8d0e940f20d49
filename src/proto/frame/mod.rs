//! RESP frame types.
//!
//! This module defines the tagged reply value: simple strings, errors,
//! integers, bulk strings, arrays and nil.

/// Frame type definitions.
pub mod types;

pub use types::Frame;
