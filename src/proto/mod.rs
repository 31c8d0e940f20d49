//! RESP (Redis Serialization Protocol) codec.
//!
//! Requests are arrays of binary-safe bulk strings; replies decode into a
//! tagged [`Frame`](frame::Frame) value.
//!
//! ## Modules
//!
//! - [`codec`] - Encoder and decoder for RESP protocol
//! - [`error`] - Error types
//! - [`frame`] - Frame types representing RESP data structures

pub mod codec;
/// Error types.
pub mod error;
pub mod frame;
