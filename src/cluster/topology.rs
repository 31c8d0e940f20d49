//! Cluster topology snapshots and their publication.
//!
//! A [`ClusterTopology`] is an immutable view of slot ownership built from a
//! CLUSTER SLOTS reply. The [`TopologyManager`] publishes a new snapshot on
//! every refresh by swapping an `Arc`, so readers never lock and never see a
//! half-built map.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, instrument, warn};

use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

use super::commands::cluster_slots;
use super::pool::ConnectionPool;
use super::slot::SLOT_COUNT;

const DEFAULT_PORT: u16 = 6379;
const UNASSIGNED: u16 = u16::MAX;

/// Network identity of a cluster node.
///
/// Equality is by value; connections are pooled per address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddr {
    host: String,
    port: u16,
}

impl NodeAddr {
    /// Creates a node address from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host:port`, `[ipv6]:port` or `redis://host:port`.
    ///
    /// The port defaults to 6379 when omitted.
    ///
    /// ```
    /// use muxpipe::cluster::NodeAddr;
    ///
    /// let addr = NodeAddr::parse("redis://127.0.0.1:7000").unwrap();
    /// assert_eq!(addr.to_string(), "127.0.0.1:7000");
    /// assert_eq!(NodeAddr::parse("[::1]:7001").unwrap().port(), 7001);
    /// ```
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("redis://{}", address)
        };

        let parsed = url::Url::parse(&with_scheme).map_err(|_| Error::InvalidArgument {
            message: format!("invalid node address: {}", address),
        })?;

        if parsed.scheme() != "redis" {
            return Err(Error::InvalidArgument {
                message: format!("unsupported scheme {}, expected redis://", parsed.scheme()),
            });
        }

        let host = match parsed.host() {
            Some(url::Host::Domain(d)) if !d.is_empty() => d.to_string(),
            Some(url::Host::Ipv4(ip)) => ip.to_string(),
            Some(url::Host::Ipv6(ip)) => ip.to_string(),
            _ => {
                return Err(Error::InvalidArgument {
                    message: format!("missing host in address: {}", address),
                })
            }
        };

        Ok(Self {
            host,
            port: parsed.port().unwrap_or(DEFAULT_PORT),
        })
    }

    /// Parses a comma-separated list of addresses, skipping blank entries.
    pub fn parse_list(addresses: &str) -> Result<Vec<Self>> {
        let parsed = addresses
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(Self::parse)
            .collect::<Result<Vec<_>>>()?;

        if parsed.is_empty() {
            return Err(Error::InvalidArgument {
                message: "no valid addresses provided".to_string(),
            });
        }
        Ok(parsed)
    }

    /// Returns the host name or IP.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A range of hash slots served by one primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRange {
    /// First slot (inclusive).
    pub start: u16,
    /// Last slot (inclusive).
    pub end: u16,
    /// Primary serving the range.
    pub master: NodeAddr,
    /// Replicas of the primary, in reply order.
    pub replicas: Vec<NodeAddr>,
}

impl SlotRange {
    /// Returns true if the given slot is within this range.
    pub fn contains(&self, slot: u16) -> bool {
        slot >= self.start && slot <= self.end
    }

    /// Returns the number of slots in this range.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// Always false: a parsed range holds at least one slot.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Immutable snapshot of slot ownership.
///
/// Primaries are kept in an arena (`nodes`) and every slot maps to an index
/// into it, so routing is a table lookup.
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    epoch: u64,
    nodes: Vec<NodeAddr>,
    slot_ranges: Vec<SlotRange>,
    slots: Vec<u16>,
}

impl ClusterTopology {
    /// Creates a snapshot with no nodes and no assigned slots.
    pub fn empty() -> Self {
        Self {
            epoch: 0,
            nodes: Vec::new(),
            slot_ranges: Vec::new(),
            slots: vec![UNASSIGNED; SLOT_COUNT as usize],
        }
    }

    /// Builds a snapshot from a CLUSTER SLOTS reply.
    ///
    /// # Arguments
    ///
    /// * `frame` - The raw reply: one `[start, end, [host, port, id], replicas...]` entry per range
    /// * `epoch` - The epoch stamped on the snapshot
    /// * `answered_by` - Replaces node entries whose host is empty or `?`,
    ///   which Redis uses to mean "the node you are talking to"
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for a malformed reply or a slot outside
    /// 0-16383. Unparsable replica entries are skipped.
    pub fn from_cluster_slots(frame: Frame, epoch: u64, answered_by: &NodeAddr) -> Result<Self> {
        let ranges = match frame {
            Frame::Array(arr) => arr,
            other => {
                return Err(Error::protocol(format!(
                    "CLUSTER SLOTS reply must be an array, got {:?}",
                    other
                )))
            }
        };

        let mut topology = Self::empty();
        topology.epoch = epoch;

        for range in ranges {
            let Frame::Array(entry) = range else {
                return Err(Error::protocol("slot range entry must be an array"));
            };
            if entry.len() < 3 {
                return Err(Error::protocol(
                    "slot range entry must have start, end and a primary",
                ));
            }

            let start = parse_slot(&entry[0])?;
            let end = parse_slot(&entry[1])?;
            if start > end {
                return Err(Error::protocol(format!(
                    "slot range {}-{} is reversed",
                    start, end
                )));
            }

            let master = parse_node(&entry[2], answered_by)?;
            let replicas = entry[3..]
                .iter()
                .filter_map(|n| parse_node(n, answered_by).ok())
                .collect();

            let index = topology.intern(&master)?;
            topology.slots[start as usize..=end as usize].fill(index);
            topology.slot_ranges.push(SlotRange {
                start,
                end,
                master,
                replicas,
            });
        }

        topology.slot_ranges.sort_by_key(|r| r.start);
        Ok(topology)
    }

    fn intern(&mut self, node: &NodeAddr) -> Result<u16> {
        if let Some(i) = self.nodes.iter().position(|n| n == node) {
            return Ok(i as u16);
        }
        if self.nodes.len() >= UNASSIGNED as usize {
            return Err(Error::protocol("too many nodes in CLUSTER SLOTS reply"));
        }
        self.nodes.push(node.clone());
        Ok((self.nodes.len() - 1) as u16)
    }

    /// Returns the epoch this snapshot was published with.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns the primaries, indexed the same way as [`node_index_for_slot`](Self::node_index_for_slot).
    pub fn nodes(&self) -> &[NodeAddr] {
        &self.nodes
    }

    /// Returns the slot ranges ordered by first slot.
    pub fn slot_ranges(&self) -> &[SlotRange] {
        &self.slot_ranges
    }

    /// Returns the index of the primary owning `slot`.
    pub fn node_index_for_slot(&self, slot: u16) -> Option<usize> {
        match self.slots.get(slot as usize) {
            Some(&UNASSIGNED) | None => None,
            Some(&i) => Some(i as usize),
        }
    }

    /// Returns the primary owning `slot`.
    pub fn node_for_slot(&self, slot: u16) -> Option<&NodeAddr> {
        self.node_index_for_slot(slot).map(|i| &self.nodes[i])
    }

    /// Returns the arena index of a primary.
    pub fn node_index(&self, addr: &NodeAddr) -> Option<usize> {
        self.nodes.iter().position(|n| n == addr)
    }

    /// Returns the number of slots with an owner.
    pub fn assigned_slots(&self) -> usize {
        self.slots.iter().filter(|&&i| i != UNASSIGNED).count()
    }

    /// Returns true if every one of the 16384 slots has an owner.
    pub fn is_fully_covered(&self) -> bool {
        self.assigned_slots() == SLOT_COUNT as usize
    }
}

impl Default for ClusterTopology {
    fn default() -> Self {
        Self::empty()
    }
}

fn parse_slot(frame: &Frame) -> Result<u16> {
    match frame {
        Frame::Integer(n) if (0..SLOT_COUNT as i64).contains(n) => Ok(*n as u16),
        other => Err(Error::protocol(format!("invalid slot number {:?}", other))),
    }
}

fn parse_node(frame: &Frame, answered_by: &NodeAddr) -> Result<NodeAddr> {
    let Frame::Array(parts) = frame else {
        return Err(Error::protocol("node entry must be an array"));
    };
    if parts.len() < 2 {
        return Err(Error::protocol("node entry must have host and port"));
    }

    let host = match &parts[0] {
        Frame::BulkString(b) => String::from_utf8_lossy(b).into_owned(),
        Frame::SimpleString(s) => String::from_utf8_lossy(s).into_owned(),
        Frame::Null => String::new(),
        _ => return Err(Error::protocol("node host must be a string")),
    };
    let port = match &parts[1] {
        Frame::Integer(n) => u16::try_from(*n)
            .map_err(|_| Error::protocol(format!("node port {} out of range", n)))?,
        _ => return Err(Error::protocol("node port must be an integer")),
    };

    let host = if host.is_empty() || host == "?" {
        answered_by.host().to_string()
    } else {
        host
    };
    Ok(NodeAddr::new(host, port))
}

/// Owns the current snapshot and publishes replacements.
pub(crate) struct TopologyManager {
    current: ArcSwap<ClusterTopology>,
    epoch: AtomicU64,
    refresh_requested: AtomicBool,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl TopologyManager {
    pub(crate) fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(ClusterTopology::empty()),
            epoch: AtomicU64::new(0),
            refresh_requested: AtomicBool::new(false),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Latest published snapshot. Never blocks.
    pub(crate) fn current(&self) -> Arc<ClusterTopology> {
        self.current.load_full()
    }

    pub(crate) fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn publish(&self, topology: ClusterTopology) -> Arc<ClusterTopology> {
        let topology = Arc::new(topology);
        debug!(
            epoch = topology.epoch(),
            nodes = topology.nodes().len(),
            ranges = topology.slot_ranges().len(),
            "published cluster topology"
        );
        self.current.store(Arc::clone(&topology));
        topology
    }

    /// Marks the snapshot as stale; the next refresh point will reload it.
    pub(crate) fn request_refresh(&self) {
        self.refresh_requested.store(true, Ordering::Release);
    }

    pub(crate) fn refresh_requested(&self) -> bool {
        self.refresh_requested.load(Ordering::Acquire)
    }

    /// Queries the seeds, then every known primary, until one answers
    /// CLUSTER SLOTS, and publishes the result.
    ///
    /// On total failure the previous snapshot stays in effect and
    /// [`Error::ClusterUnavailable`] is returned.
    #[instrument(skip_all)]
    pub(crate) async fn refresh(
        &self,
        seeds: &[NodeAddr],
        pool: &ConnectionPool,
    ) -> Result<Arc<ClusterTopology>> {
        let _guard = self.refresh_lock.lock().await;
        // clear before querying so a request raised meanwhile is kept
        self.refresh_requested.store(false, Ordering::Release);

        let known = self.current();
        let mut candidates: Vec<&NodeAddr> = Vec::with_capacity(seeds.len() + known.nodes().len());
        for addr in seeds.iter().chain(known.nodes()) {
            if !candidates.contains(&addr) {
                candidates.push(addr);
            }
        }

        let mut last_error = None;
        for addr in candidates {
            match self.fetch_from(addr, pool).await {
                Ok(topology) => {
                    let published = self.publish(topology);
                    pool.retain(published.nodes()).await;
                    return Ok(published);
                }
                Err(e) => {
                    warn!(node = %addr, error = %e, "topology refresh failed");
                    last_error = Some(e);
                }
            }
        }

        self.request_refresh();
        Err(Error::ClusterUnavailable {
            message: match last_error {
                Some(e) => format!("no node answered CLUSTER SLOTS, last error: {}", e),
                None => "no node addresses to query".to_string(),
            },
        })
    }

    async fn fetch_from(&self, addr: &NodeAddr, pool: &ConnectionPool) -> Result<ClusterTopology> {
        let mut conn = pool.acquire(addr).await?;
        let reply = match conn.connection_mut().request(&cluster_slots()).await {
            Ok(reply) => reply,
            Err(e) => {
                pool.invalidate(conn, &e);
                return Err(e);
            }
        };
        pool.release(conn).await;

        if let Frame::Error(msg) = &reply {
            return Err(super::errors::parse_redis_error(msg));
        }
        let topology = ClusterTopology::from_cluster_slots(reply, self.next_epoch(), addr)?;
        if topology.nodes().is_empty() {
            return Err(Error::protocol("CLUSTER SLOTS reply assigns no slots"));
        }
        Ok(topology)
    }
}

impl fmt::Debug for TopologyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologyManager")
            .field("epoch", &self.current.load().epoch())
            .field("refresh_requested", &self.refresh_requested())
            .finish()
    }
}
