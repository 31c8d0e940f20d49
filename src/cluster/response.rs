//! Deferred pipeline results.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::proto::error::{Error, Result};
use crate::proto::frame::Frame;

/// Resolution state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    /// The command has not been flushed yet.
    Pending,
    /// The reply arrived and was converted.
    Resolved,
    /// The command failed: a server error, redirect, network error or
    /// conversion error, or its pipeline was dropped mid-flush.
    Failed,
}

/// Handle to the outcome of one pipelined command.
///
/// Created by enqueuing a command and filled in by the flush that sends it.
/// Handles are cheap to clone; every clone sees the same outcome.
///
/// ```no_run
/// # async fn example(client: muxpipe::ClusterClient) -> muxpipe::Result<()> {
/// let mut pipeline = client.pipeline();
/// let value = pipeline.get("key")?;
/// assert!(value.get().is_err()); // not flushed yet
/// pipeline.flush().await?;
/// println!("{:?}", value.get()?);
/// # Ok(())
/// # }
/// ```
pub struct Deferred<T> {
    cell: Arc<OnceLock<Result<T>>>,
}

impl<T: Clone> Deferred<T> {
    /// Returns the converted reply, or the error the command failed with.
    ///
    /// Fails with [`Error::Usage`] while the command has not been flushed.
    /// Once resolved, repeated calls return the same outcome.
    ///
    /// # Errors
    ///
    /// * The command's own failure, see [`DeferredState::Failed`]
    /// * [`Error::Usage`] before the flush, or after the pipeline (or the
    ///   flush future) was dropped before the reply was read. The command
    ///   may still have run on the server in that case.
    pub fn get(&self) -> Result<T> {
        match self.cell.get() {
            Some(outcome) => outcome.clone(),
            None => Err(Error::Usage {
                message: "pipeline result read before flush".to_string(),
            }),
        }
    }
}

impl<T> Deferred<T> {
    /// Returns the current resolution state.
    pub fn state(&self) -> DeferredState {
        match self.cell.get() {
            None => DeferredState::Pending,
            Some(Ok(_)) => DeferredState::Resolved,
            Some(Err(_)) => DeferredState::Failed,
        }
    }

    /// Returns true once the command has been resolved or failed.
    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            None => f.write_str("Deferred(<pending>)"),
            Some(outcome) => f.debug_tuple("Deferred").field(outcome).finish(),
        }
    }
}

/// Receiving side of a [`Deferred`], held by the pipeline until flush.
pub(crate) trait Resolve: Send {
    /// Records the raw outcome, applying the command's reply transform.
    fn resolve(self: Box<Self>, outcome: Result<Frame>);
}

type Transform<T> = Box<dyn FnOnce(Frame) -> Result<T> + Send>;

/// Filled exactly once: by [`Resolve::resolve`], or on drop when the sink
/// never saw a reply (pipeline dropped, flush future cancelled).
struct Sink<T> {
    cell: Arc<OnceLock<Result<T>>>,
    transform: Option<Transform<T>>,
}

impl<T: Send + Sync> Resolve for Sink<T> {
    fn resolve(mut self: Box<Self>, outcome: Result<Frame>) {
        if let Some(transform) = self.transform.take() {
            let _ = self.cell.set(outcome.and_then(transform));
        }
    }
}

impl<T> Drop for Sink<T> {
    fn drop(&mut self) {
        if self.transform.is_some() {
            let _ = self.cell.set(Err(Error::Usage {
                message: "pipeline dropped before the command completed".to_string(),
            }));
        }
    }
}

/// Creates a pending result and the sink that resolves it.
pub(crate) fn deferred<T, F>(transform: F) -> (Deferred<T>, Box<dyn Resolve>)
where
    T: Send + Sync + 'static,
    F: FnOnce(Frame) -> Result<T> + Send + 'static,
{
    let cell = Arc::new(OnceLock::new());
    let sink = Sink {
        cell: Arc::clone(&cell),
        transform: Some(Box::new(transform)),
    };
    (Deferred { cell }, Box::new(sink))
}
