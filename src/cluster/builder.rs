use std::time::Duration;

use crate::core::connection::ConnectionConfig;
use crate::proto::error::{Error, Result};

use super::client::ClusterClient;
use super::pool::PoolConfig;
use super::topology::NodeAddr;

/// Builder for configuring and creating a [`ClusterClient`].
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use muxpipe::ClusterClientBuilder;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ClusterClientBuilder::new()
///     .addresses("redis://127.0.0.1:7000,127.0.0.1:7001")
///     .password("secret")
///     .read_timeout(Some(Duration::from_secs(2)))
///     .max_connections_per_node(4)
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ClusterClientBuilder {
    addresses: Vec<String>,
    connection: ConnectionConfig,
    pool: PoolConfig,
}

impl ClusterClientBuilder {
    /// Creates a new [`ClusterClientBuilder`] instance.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds seed addresses.
    ///
    /// # Arguments
    ///
    /// * `addresses` - `host:port`, `redis://host:port`, or a comma-separated list of them
    #[inline]
    pub fn addresses(mut self, addresses: impl Into<String>) -> Self {
        self.addresses.push(addresses.into());
        self
    }

    /// Sets the password for authentication.
    #[inline]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.connection.password = Some(password.into());
        self
    }

    /// Sets the username for ACL authentication.
    #[inline]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.connection.username = Some(username.into());
        self
    }

    /// Sets the client connection name.
    ///
    /// # Arguments
    ///
    /// * `name` - Client name displayed in `CLIENT LIST` on every node
    #[inline]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.connection.client_name = Some(name.into());
        self
    }

    /// Sets the connection timeout.
    #[inline]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection.connect_timeout = timeout;
        self
    }

    /// Sets the read timeout. `None` means no timeout.
    #[inline]
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connection.read_timeout = timeout;
        self
    }

    /// Sets the write timeout. `None` means no timeout.
    #[inline]
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connection.write_timeout = timeout;
        self
    }

    /// Sets the largest reply accepted from a node.
    #[inline]
    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.connection.max_frame_size = bytes;
        self
    }

    /// Sets how many connections to one node may be in use at once.
    #[inline]
    pub fn max_connections_per_node(mut self, max: usize) -> Self {
        self.pool.max_connections_per_node = max;
        self
    }

    /// Sets how many idle connections to one node are kept.
    #[inline]
    pub fn max_idle_per_node(mut self, max: usize) -> Self {
        self.pool.max_idle_per_node = max;
        self
    }

    /// Discovers the cluster and builds the [`ClusterClient`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no address is set or one is malformed.
    /// Returns [`Error::ClusterUnavailable`] if no seed answers.
    pub async fn build(self) -> Result<ClusterClient> {
        let seeds = self.seeds()?;
        ClusterClient::with_config(seeds, self.connection, self.pool).await
    }

    fn seeds(&self) -> Result<Vec<NodeAddr>> {
        if self.addresses.is_empty() {
            return Err(Error::InvalidArgument {
                message: "address is required".to_string(),
            });
        }
        let mut seeds = Vec::new();
        for list in &self.addresses {
            for addr in NodeAddr::parse_list(list)? {
                if !seeds.contains(&addr) {
                    seeds.push(addr);
                }
            }
        }
        Ok(seeds)
    }
}
