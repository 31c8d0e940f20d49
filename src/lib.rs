//! # Muxpipe
//!
//! Cluster-aware Redis pipelining for Rust.
//!
//! Commands are queued on a [`ClusterPipeline`], grouped per primary by hash
//! slot, and sent with one write per node when the pipeline is flushed. Each
//! queued command hands back a [`Deferred`] that holds its own outcome, so a
//! failing command never aborts the rest of the batch.
//!
//! ## Modules
//!
//! - [`proto`] - RESP frames and codec
//! - [`command`] - Command model, catalogue and reply transforms
//! - [`cluster`] - Topology, routing, pooling and pipelining
//!
//! ## Example
//!
//! ```no_run
//! use muxpipe::ClusterClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClusterClient::connect("127.0.0.1:7000").await?;
//!     let mut pipeline = client.pipeline();
//!     pipeline.set("{user1}.name", "ada")?;
//!     let name = pipeline.get("{user1}.name")?;
//!     let visits = pipeline.incr("{user1}.visits")?;
//!     pipeline.flush().await?;
//!     println!("{:?} {}", name.get()?, visits.get()?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod cluster;
pub(crate) mod core;
pub mod proto;

pub use crate::core::command;
pub use crate::core::connection::ConnectionConfig;
pub use crate::core::Cmd;
pub use crate::proto::error::{Error, Result};
pub use crate::proto::frame::Frame;

pub use crate::cluster::{
    key_slot, ClusterClient, ClusterClientBuilder, ClusterPipeline, Deferred, DeferredState, Route,
};
