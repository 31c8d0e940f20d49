//! Redis Cluster support: slot routing, topology discovery, per-node
//! connection pooling and cluster-aware pipelining.
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> muxpipe::Result<()> {
//! use muxpipe::ClusterClient;
//!
//! // Connect to Redis Cluster (comma-separated seed nodes)
//! let client = ClusterClient::connect("127.0.0.1:7000,127.0.0.1:7001").await?;
//!
//! // Keys on different nodes share one flush; each node gets one write
//! let mut pipeline = client.pipeline();
//! pipeline.set("foo", "bar")?;
//! pipeline.lpush("list", ["a", "b"])?;
//! let foo = pipeline.get("foo")?;
//! let list = pipeline.lrange("list", 0, -1)?;
//! pipeline.flush().await?;
//!
//! assert_eq!(foo.get()?.as_deref(), Some(&b"bar"[..]));
//! assert_eq!(list.get()?.len(), 2);
//! # Ok(())
//! # }
//! ```

mod builder;
mod client;
pub mod commands;
pub(crate) mod errors;
mod pipeline;
mod pool;
mod response;
pub mod router;
pub(crate) mod slot;
pub mod topology;

pub use builder::ClusterClientBuilder;
pub use client::ClusterClient;
pub use errors::parse_redis_error;
pub use pipeline::ClusterPipeline;
pub use pool::PoolConfig;
pub use response::{Deferred, DeferredState};
pub use router::{route, slot_for_keys, Route};
pub use slot::{key_slot, SLOT_COUNT};
pub use topology::{ClusterTopology, NodeAddr, SlotRange};
