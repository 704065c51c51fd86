// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background persistence queue.
//!
//! The reply path only ever calls [`PersistenceQueue::enqueue`], which is
//! a non-blocking `try_send`. A single worker task drains the queue and
//! awaits the ingestion gate, so turns are persisted strictly in arrival
//! order and at most one write is in flight at a time.

use std::sync::Arc;

use cairn_core::{Channel, Role};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ingest::IngestionGate;
use crate::types::RecordOutcome;

/// A turn waiting to be persisted.
#[derive(Debug, Clone)]
pub struct PersistJob {
    pub text: String,
    pub role: Role,
    pub channel: Channel,
    pub counterpart: Option<String>,
}

/// Bounded queue with a single draining worker.
pub struct PersistenceQueue {
    tx: mpsc::Sender<PersistJob>,
    worker: JoinHandle<usize>,
}

impl PersistenceQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(gate: Arc<IngestionGate>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<PersistJob>(capacity.max(1));
        let worker = tokio::spawn(async move {
            let mut stored = 0usize;
            while let Some(job) = rx.recv().await {
                let outcome = gate
                    .record_turn(&job.text, job.role, job.channel, job.counterpart.as_deref())
                    .await;
                if matches!(outcome, RecordOutcome::Stored { .. }) {
                    stored += 1;
                }
                debug!(
                    channel = %job.channel,
                    role = %job.role,
                    outcome = outcome.label(),
                    "persistence job finished"
                );
            }
            debug!(stored, "persistence worker stopped");
            stored
        });
        Self { tx, worker }
    }

    /// Hand a job to the worker without waiting. Returns false if dropped.
    pub fn enqueue(&self, job: PersistJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                warn!(channel = %job.channel, "persistence queue full, dropping turn");
                false
            }
            Err(TrySendError::Closed(job)) => {
                warn!(channel = %job.channel, "persistence worker gone, dropping turn");
                false
            }
        }
    }

    /// Close the queue and wait for queued jobs to drain.
    ///
    /// Returns the number of records the worker stored over its lifetime.
    pub async fn shutdown(self) -> usize {
        drop(self.tx);
        match self.worker.await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "persistence worker ended abnormally");
                0
            }
        }
    }
}
