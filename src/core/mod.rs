//! Commands and single-node connections.
//!
//! ## Modules
//!
//! - [`command`] - Command model, command catalogue and reply transforms
//! - [`connection`] - Node connection with batched writes and the login handshake

pub mod command;
pub mod connection;

pub use command::Cmd;
pub use connection::{Connection, ConnectionConfig};
