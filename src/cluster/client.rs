//! Redis Cluster client.
//!
//! The client owns the seed list, the topology manager and the connection
//! pool. It is cheap to clone; clones share all three. Commands are sent
//! through a [`ClusterPipeline`]; the one-shot helpers here are single-command
//! pipelines.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::core::command::{self, Cmd};
use crate::core::connection::ConnectionConfig;
use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

use super::builder::ClusterClientBuilder;
use super::pipeline::ClusterPipeline;
use super::pool::{ConnectionPool, PoolConfig};
use super::router::slot_for_keys;
use super::topology::{ClusterTopology, NodeAddr, TopologyManager};

struct ClusterInner {
    seeds: Vec<NodeAddr>,
    topology: TopologyManager,
    pool: ConnectionPool,
}

/// Redis Cluster client.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> muxpipe::Result<()> {
/// use muxpipe::ClusterClient;
///
/// let client = ClusterClient::connect("127.0.0.1:7000,127.0.0.1:7001").await?;
///
/// let mut pipeline = client.pipeline();
/// pipeline.set("a", "1")?;
/// let b = pipeline.incr("b")?;
/// pipeline.flush().await?;
/// println!("b = {}", b.get()?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ClusterClient {
    inner: Arc<ClusterInner>,
}

impl ClusterClient {
    /// Connects using one seed address or a comma-separated list of them,
    /// with default settings.
    ///
    /// # Arguments
    ///
    /// * `addresses` - Seed node addresses (e.g., "redis://127.0.0.1:7000,127.0.0.1:7001")
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The address list cannot be parsed ([`Error::InvalidArgument`])
    /// - No seed answers CLUSTER SLOTS ([`Error::ClusterUnavailable`])
    pub async fn connect(addresses: &str) -> Result<Self> {
        ClusterClientBuilder::new().addresses(addresses).build().await
    }

    /// Returns a builder for a client with custom settings.
    pub fn builder() -> ClusterClientBuilder {
        ClusterClientBuilder::new()
    }

    pub(crate) async fn with_config(
        seeds: Vec<NodeAddr>,
        connection_config: ConnectionConfig,
        pool_config: PoolConfig,
    ) -> Result<Self> {
        if seeds.is_empty() {
            return Err(Error::InvalidArgument {
                message: "at least one seed address is required".to_string(),
            });
        }

        let client = Self {
            inner: Arc::new(ClusterInner {
                seeds,
                topology: TopologyManager::new(),
                pool: ConnectionPool::new(pool_config, connection_config),
            }),
        };
        let topology = client.refresh_topology().await?;
        debug!(
            nodes = topology.nodes().len(),
            covered = topology.is_fully_covered(),
            "connected to cluster"
        );
        Ok(client)
    }

    /// Reloads the slot map and publishes it.
    ///
    /// Seeds are tried first, then every known primary. If none answers,
    /// the previous snapshot stays in effect and
    /// [`Error::ClusterUnavailable`] is returned.
    pub async fn refresh_topology(&self) -> Result<Arc<ClusterTopology>> {
        self.inner
            .topology
            .refresh(&self.inner.seeds, &self.inner.pool)
            .await
    }

    pub(crate) fn request_refresh(&self) {
        self.inner.topology.request_refresh();
    }

    pub(crate) async fn refresh_if_requested(&self) -> Result<()> {
        if self.inner.topology.refresh_requested() {
            self.refresh_topology().await?;
        }
        Ok(())
    }

    pub(crate) fn pool(&self) -> &ConnectionPool {
        &self.inner.pool
    }

    /// Returns the current topology snapshot.
    pub fn topology(&self) -> Arc<ClusterTopology> {
        self.inner.topology.current()
    }

    /// Starts a new, empty pipeline.
    pub fn pipeline(&self) -> ClusterPipeline {
        ClusterPipeline::new(self.clone())
    }

    /// Returns the number of primaries in the current topology.
    pub fn node_count(&self) -> usize {
        self.topology().nodes().len()
    }

    /// Returns the number of slot ranges in the current topology.
    pub fn slot_range_count(&self) -> usize {
        self.topology().slot_ranges().len()
    }

    /// Checks if every slot (0-16383) has an owner.
    pub fn is_fully_covered(&self) -> bool {
        self.topology().is_fully_covered()
    }

    /// Returns the slot shared by `keys`.
    ///
    /// Fails with [`Error::CrossSlot`] when they differ and
    /// [`Error::InvalidArgument`] for an empty list.
    pub fn validate_same_slot<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<u16> {
        slot_for_keys(keys)?.ok_or_else(|| Error::InvalidArgument {
            message: "no keys given".to_string(),
        })
    }

    /// Sends one command and converts its reply.
    ///
    /// The command's own outcome wins over a failed topology refresh: a
    /// reply that arrived is returned even if the refresh that followed it
    /// could not reach any node.
    pub async fn query<T, F>(&self, cmd: Cmd, transform: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Frame) -> Result<T> + Send + 'static,
    {
        let mut pipeline = self.pipeline();
        let result = pipeline.enqueue(cmd, transform)?;
        let flushed = pipeline.flush().await;
        match (result.get(), flushed) {
            (Ok(value), Err(e)) => {
                warn!(error = %e, "topology refresh failed after query");
                Ok(value)
            }
            (outcome, _) => outcome,
        }
    }

    /// Gets a string value.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to retrieve
    ///
    /// # Returns
    ///
    /// The value if the key exists, or `None` if it does not.
    pub async fn get(&self, key: impl Into<Bytes>) -> Result<Option<Bytes>> {
        self.query(command::get(key), command::frame_to_bytes).await
    }

    /// Sets a value.
    pub async fn set(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<()> {
        self.query(command::set(key, value), command::frame_to_status)
            .await
            .map(|_| ())
    }

    /// Deletes a key.
    ///
    /// # Returns
    ///
    /// 1 if the key was deleted, 0 if it did not exist.
    pub async fn del(&self, key: impl Into<Bytes>) -> Result<i64> {
        self.query(command::del([key]), command::frame_to_int).await
    }

    /// Checks if a key exists.
    pub async fn exists(&self, key: impl Into<Bytes>) -> Result<bool> {
        self.query(command::exists([key]), command::frame_to_bool).await
    }

    /// Loads a script on the primary owning `slot_hint_key` and returns its
    /// SHA1 digest.
    pub async fn script_load(
        &self,
        script: impl Into<Bytes>,
        slot_hint_key: impl Into<Bytes>,
    ) -> Result<String> {
        let mut pipeline = self.pipeline();
        let digest = pipeline.script_load(script, slot_hint_key)?;
        pipeline.flush().await?;
        digest.get()
    }
}

impl fmt::Debug for ClusterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterClient")
            .field("seeds", &self.inner.seeds)
            .field("topology", &self.inner.topology)
            .field("pool", &self.inner.pool)
            .finish()
    }
}
