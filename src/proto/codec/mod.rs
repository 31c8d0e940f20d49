//! RESP protocol encoder and decoder.
//!
//! # Modules
//!
//! - [`encoder`] - Frame and command encoding to bytes
//! - [`decoder`] - Streaming frame decoder from bytes

pub mod decoder;
pub mod encoder;

pub use decoder::Decoder;
pub use encoder::{encode_frame, Encoder};
