//! Connection pooling for cluster nodes.
//!
//! Each node gets a semaphore bounding checked-out connections and a small
//! stack of idle ones. A connection is used by at most one batch at a time;
//! after a failure it is dropped instead of being returned.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::core::connection::{self, Connection, ConnectionConfig};
use crate::proto::error::{Error, Result};

use super::topology::NodeAddr;

/// Pooling policy.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Maximum number of connections checked out per node at once.
    pub max_connections_per_node: usize,
    /// Maximum number of idle connections kept per node.
    pub max_idle_per_node: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections_per_node: 10,
            max_idle_per_node: 4,
        }
    }
}

/// A connection checked out of the pool.
///
/// Holds a permit of its node's semaphore until it is released or dropped.
pub(crate) struct NodeConnection {
    address: NodeAddr,
    connection: Connection<TcpStream>,
    _permit: OwnedSemaphorePermit,
}

impl NodeConnection {
    pub(crate) fn connection_mut(&mut self) -> &mut Connection<TcpStream> {
        &mut self.connection
    }

    pub(crate) fn address(&self) -> &NodeAddr {
        &self.address
    }
}

impl fmt::Debug for NodeConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConnection")
            .field("address", &self.address)
            .finish()
    }
}

struct NodeEntry {
    permits: Arc<Semaphore>,
    idle: Vec<Connection<TcpStream>>,
}

/// Pool of node connections keyed by address.
pub(crate) struct ConnectionPool {
    config: PoolConfig,
    connection_config: ConnectionConfig,
    nodes: Mutex<HashMap<NodeAddr, NodeEntry>>,
}

impl ConnectionPool {
    pub(crate) fn new(config: PoolConfig, connection_config: ConnectionConfig) -> Self {
        Self {
            config,
            connection_config,
            nodes: Mutex::new(HashMap::new()),
        }
    }

    /// Returns an idle connection to `address`, or opens a new one.
    ///
    /// Waits while `max_connections_per_node` connections are checked out.
    ///
    /// # Errors
    ///
    /// Returns an error if a new connection cannot be opened or its
    /// AUTH/SETNAME handshake is rejected.
    pub(crate) async fn acquire(&self, address: &NodeAddr) -> Result<NodeConnection> {
        let permits = {
            let mut nodes = self.nodes.lock().await;
            let entry = nodes.entry(address.clone()).or_insert_with(|| NodeEntry {
                permits: Arc::new(Semaphore::new(self.config.max_connections_per_node.max(1))),
                idle: Vec::new(),
            });
            Arc::clone(&entry.permits)
        };

        let permit = permits
            .acquire_owned()
            .await
            .map_err(|_| Error::Usage {
                message: "connection pool is closed".to_string(),
            })?;

        let idle = {
            let mut nodes = self.nodes.lock().await;
            nodes.get_mut(address).and_then(|e| e.idle.pop())
        };

        let connection = match idle {
            Some(conn) => conn,
            None => connection::connect(&address.to_string(), &self.connection_config).await?,
        };

        Ok(NodeConnection {
            address: address.clone(),
            connection,
            _permit: permit,
        })
    }

    /// Returns a healthy connection to the idle stack.
    pub(crate) async fn release(&self, conn: NodeConnection) {
        let NodeConnection {
            address,
            connection,
            _permit,
        } = conn;

        let mut nodes = self.nodes.lock().await;
        match nodes.get_mut(&address) {
            Some(entry) if entry.idle.len() < self.config.max_idle_per_node => {
                entry.idle.push(connection);
            }
            _ => debug!(node = %address, "closing surplus connection"),
        }
    }

    /// Discards a connection after a failure.
    pub(crate) fn invalidate(&self, conn: NodeConnection, error: &Error) {
        warn!(node = %conn.address(), %error, "discarding connection");
        drop(conn);
    }

    /// Drops idle connections to nodes that are no longer primaries.
    pub(crate) async fn retain(&self, live: &[NodeAddr]) {
        let mut nodes = self.nodes.lock().await;
        nodes.retain(|addr, entry| {
            if live.contains(addr) {
                return true;
            }
            entry.idle.clear();
            // keep the entry while connections are checked out
            entry.permits.available_permits() < self.config.max_connections_per_node.max(1)
        });
    }

    #[cfg(test)]
    async fn idle_count(&self, address: &NodeAddr) -> usize {
        self.nodes
            .lock()
            .await
            .get(address)
            .map_or(0, |e| e.idle.len())
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.config)
            .finish()
    }
}
