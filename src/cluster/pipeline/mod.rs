//! Cluster-aware pipelining.
//!
//! Commands are grouped per primary as they are enqueued. A flush sends each
//! node's group in one write, reads the replies back in order, and resolves
//! every [`Deferred`] handle. Nodes are flushed concurrently and independently:
//! a failure on one node only fails that node's commands.
//!
//! Redirects are not followed. A `MOVED`/`ASK` reply fails its command and
//! makes the flush reload the topology before returning, so the next round
//! is routed with the new slot map.

mod commands;

use std::mem;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, instrument, warn};

use crate::core::command::Cmd;
use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

use super::client::ClusterClient;
use super::errors::parse_redis_error;
use super::pool::{ConnectionPool, NodeConnection};
use super::response::{deferred, Deferred, Resolve};
use super::router::{route_index, Route};
use super::topology::{ClusterTopology, NodeAddr};

#[derive(Default)]
struct NodeBatch {
    cmds: Vec<Cmd>,
    sinks: Vec<(usize, Box<dyn Resolve>)>,
}

#[derive(Default)]
struct NodeReport {
    outcomes: Vec<(usize, Result<Frame>)>,
    refresh: bool,
}

/// A batch of commands for a Redis Cluster.
///
/// Obtained from [`ClusterClient::pipeline`]. The pipeline is a single-owner
/// builder: enqueue commands, then [`flush`](Self::flush) them. After a flush
/// it is empty and can be reused for another round.
///
/// ```no_run
/// # async fn example(client: muxpipe::ClusterClient) -> muxpipe::Result<()> {
/// let mut pipeline = client.pipeline();
/// pipeline.set("foo", "bar")?;
/// let len = pipeline.strlen("foo")?;
/// let missing = pipeline.get("nope")?;
/// pipeline.flush().await?;
/// assert_eq!(len.get()?, 3);
/// assert_eq!(missing.get()?, None);
/// # Ok(())
/// # }
/// ```
pub struct ClusterPipeline {
    client: ClusterClient,
    snapshot: Option<Arc<ClusterTopology>>,
    batches: Vec<NodeBatch>,
    queued: usize,
}

impl ClusterPipeline {
    pub(crate) fn new(client: ClusterClient) -> Self {
        Self {
            client,
            snapshot: None,
            batches: Vec::new(),
            queued: 0,
        }
    }

    /// Queues a command routed by its keys.
    ///
    /// # Arguments
    ///
    /// * `cmd` - The command. Its [`key`](Cmd::key) arguments pick the node
    /// * `transform` - Converts the raw reply once it arrives. Its error, for
    ///   an unexpected reply shape, becomes the command's outcome
    ///
    /// # Returns
    ///
    /// A [`Deferred`] handle that resolves when the round is flushed. Nothing
    /// is sent before that.
    ///
    /// # Errors
    ///
    /// * [`Error::CrossSlot`] when the keys hash to different slots
    /// * [`Error::SlotUnassigned`] when no node serves the slot
    /// * [`Error::ClusterUnavailable`] when the topology has no nodes
    pub fn enqueue<T, F>(&mut self, cmd: Cmd, transform: F) -> Result<Deferred<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(Frame) -> Result<T> + Send + 'static,
    {
        self.enqueue_to(cmd, Route::Auto, transform)
    }

    /// Queues a command with an explicit route.
    pub fn enqueue_to<T, F>(&mut self, cmd: Cmd, route: Route, transform: F) -> Result<Deferred<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(Frame) -> Result<T> + Send + 'static,
    {
        let snapshot = self.pinned_snapshot()?;
        let index = match route_index(&snapshot, cmd.keys(), &route)? {
            Some(index) => index,
            None => self.any_node(),
        };

        let (result, sink) = deferred(transform);
        let batch = &mut self.batches[index];
        batch.cmds.push(cmd);
        batch.sinks.push((self.queued, sink));
        self.queued += 1;
        Ok(result)
    }

    /// Returns the number of queued commands.
    pub fn len(&self) -> usize {
        self.queued
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queued == 0
    }

    /// Sends every queued command and resolves all handles.
    ///
    /// Per-command failures (server errors, redirects, node failures) are
    /// recorded in the affected handles, not returned here.
    ///
    /// # Errors
    ///
    /// Only [`Error::ClusterUnavailable`], when the topology needed
    /// reloading and no node answered. The handles are resolved even then.
    ///
    /// # Cancellation
    ///
    /// Dropping the returned future once it has been polled fails every
    /// handle still waiting for a reply with [`Error::Usage`]. Those commands
    /// may or may not have run. A future dropped before its first poll sends
    /// nothing and leaves the round queued.
    pub async fn flush(&mut self) -> Result<()> {
        self.dispatch(false).await.map(|_| ())
    }

    /// Like [`flush`](Self::flush), and also returns every raw outcome in
    /// submission order.
    pub async fn flush_all(&mut self) -> Result<Vec<Result<Frame>>> {
        self.dispatch(true).await
    }

    /// The first enqueue of a round pins the current topology; the batch
    /// table is indexed by its node arena until the round is flushed.
    fn pinned_snapshot(&mut self) -> Result<Arc<ClusterTopology>> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = self.client.topology();
        if snapshot.nodes().is_empty() {
            return Err(Error::ClusterUnavailable {
                message: "topology has no nodes".to_string(),
            });
        }
        self.batches = snapshot.nodes().iter().map(|_| NodeBatch::default()).collect();
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Keyless commands join a node that is already part of the round.
    fn any_node(&self) -> usize {
        self.batches
            .iter()
            .position(|b| !b.cmds.is_empty())
            .unwrap_or(0)
    }

    #[instrument(skip(self), fields(commands = self.queued))]
    async fn dispatch(&mut self, collect: bool) -> Result<Vec<Result<Frame>>> {
        let Some(snapshot) = self.snapshot.take() else {
            self.client.refresh_if_requested().await?;
            return Ok(Vec::new());
        };
        let batches = mem::take(&mut self.batches);
        let total = mem::replace(&mut self.queued, 0);

        let pool = self.client.pool();
        let runs = batches
            .into_iter()
            .zip(snapshot.nodes())
            .filter(|(batch, _)| !batch.cmds.is_empty())
            .map(|(batch, addr)| run_node_batch(pool, addr, batch, collect));
        let reports = join_all(runs).await;

        let mut outcomes: Vec<Option<Result<Frame>>> = vec![None; if collect { total } else { 0 }];
        let mut refresh = false;
        for report in reports {
            refresh |= report.refresh;
            for (seq, outcome) in report.outcomes {
                outcomes[seq] = Some(outcome);
            }
        }

        if refresh {
            self.client.request_refresh();
        }
        self.client.refresh_if_requested().await?;

        Ok(outcomes
            .into_iter()
            .map(|o| o.unwrap_or_else(|| Err(Error::protocol("no outcome recorded"))))
            .collect())
    }
}

impl std::fmt::Debug for ClusterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterPipeline")
            .field("queued", &self.queued)
            .field("epoch", &self.snapshot.as_ref().map(|s| s.epoch()))
            .finish()
    }
}

/// Writes one node's commands, reads its replies and resolves its handles.
async fn run_node_batch(
    pool: &ConnectionPool,
    addr: &NodeAddr,
    batch: NodeBatch,
    collect: bool,
) -> NodeReport {
    let NodeBatch { cmds, sinks } = batch;
    debug!(node = %addr, commands = cmds.len(), "sending batch");

    let mut replies = Vec::with_capacity(cmds.len());
    let failure = match pool.acquire(addr).await {
        Ok(mut conn) => match exchange(&mut conn, &cmds, &mut replies).await {
            Ok(()) => {
                pool.release(conn).await;
                None
            }
            Err(e) => {
                pool.invalidate(conn, &e);
                Some(e)
            }
        },
        Err(e) => Some(e),
    };

    let mut report = NodeReport::default();
    if let Some(e) = &failure {
        error!(
            node = %addr,
            error = %e,
            answered = replies.len(),
            failed = cmds.len() - replies.len(),
            "batch failed"
        );
        report.refresh = e.is_network();
    }

    let mut replies = replies.into_iter();
    for (seq, sink) in sinks {
        let outcome = match replies.next() {
            Some(Frame::Error(msg)) => {
                let err = parse_redis_error(&msg);
                if err.is_redirect() || matches!(err, Error::ClusterDown) {
                    warn!(node = %addr, error = %err, "cluster redirect");
                    report.refresh = true;
                }
                Err(err)
            }
            Some(frame) => Ok(frame),
            None => Err(failure
                .clone()
                .unwrap_or_else(|| Error::protocol("missing reply"))),
        };
        if collect {
            report.outcomes.push((seq, outcome.clone()));
        }
        sink.resolve(outcome);
    }
    report
}

/// Replies read before a failure are kept in `replies`.
async fn exchange(conn: &mut NodeConnection, cmds: &[Cmd], replies: &mut Vec<Frame>) -> Result<()> {
    let connection = conn.connection_mut();
    connection.write_commands(cmds).await?;
    for _ in 0..cmds.len() {
        replies.push(connection.read_frame().await?);
    }
    Ok(())
}
