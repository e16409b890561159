//! Execution contexts for listener notifications.
//!
//! The connection never calls its listener directly; it hands each
//! notification to an [`EventQueue`]. Jobs are submitted in the order the
//! underlying transitions were applied, and every implementation must run
//! them in submission order.
//!
//! | Executor | Runs jobs | Use |
//! |----------|-----------|-----|
//! | [`InstantExecutor`] | inline, on the submitting thread | tests, single-threaded hosts |
//! | [`QueuedExecutor`] | on a dedicated tokio task, FIFO | production default |

// ============================================================================
// Imports
// ============================================================================

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// A unit of notification work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

// ============================================================================
// EventQueue
// ============================================================================

/// Runs notification jobs in submission order.
pub trait EventQueue: Send + Sync {
    /// Submits a job. Must not block waiting for earlier jobs.
    fn execute(&self, job: Job);
}

// ============================================================================
// InstantExecutor
// ============================================================================

/// Runs every job immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantExecutor;

impl EventQueue for InstantExecutor {
    #[inline]
    fn execute(&self, job: Job) {
        job();
    }
}

// ============================================================================
// QueuedExecutor
// ============================================================================

/// Runs jobs one at a time on a background tokio task.
///
/// The task ends when the executor is dropped, after draining every job
/// already submitted.
#[derive(Debug)]
pub struct QueuedExecutor {
    /// Channel feeding the worker task.
    job_tx: mpsc::UnboundedSender<Job>,
}

impl QueuedExecutor {
    /// Creates an executor on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when called outside a tokio runtime.
    pub fn new() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| Error::config(format!("QueuedExecutor requires a tokio runtime: {e}")))?;
        Ok(Self::with_runtime(&handle))
    }

    /// Creates an executor whose worker runs on `handle`.
    #[must_use]
    pub fn with_runtime(handle: &Handle) -> Self {
        let (job_tx, mut job_rx) = mpsc::unbounded_channel::<Job>();

        handle.spawn(async move {
            while let Some(job) = job_rx.recv().await {
                job();
            }
            debug!("Event queue drained");
        });

        Self { job_tx }
    }
}

impl EventQueue for QueuedExecutor {
    fn execute(&self, job: Job) {
        if self.job_tx.send(job).is_err() {
            warn!("Event queue worker stopped, dropping notification");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
