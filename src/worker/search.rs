//! Search worker: generate, match, publish or continue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, trace};

use crate::crypto::{IdentityBundle, IdentitySource};
use crate::matcher::SearchConstraint;

use super::CancelToken;

/// Counters shared by all workers of a round.
#[derive(Debug, Default)]
pub struct SearchStats {
    /// Successful generation attempts
    pub attempts: AtomicU64,
    /// Generation attempts that failed and were retried
    pub failures: AtomicU64,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// How a worker left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// This worker's bundle claimed the round's result slot
    Matched,
    /// The round was cancelled, or another worker claimed the slot first
    Cancelled,
}

/// A matching bundle published by a worker.
#[derive(Debug)]
pub(crate) struct Found {
    pub worker_id: usize,
    pub bundle: IdentityBundle,
}

/// A worker that generates identities until one satisfies the constraint.
pub struct SearchWorker<G> {
    id: usize,
    generator: Arc<G>,
    constraint: SearchConstraint,
    active_provider: Option<String>,
    result_tx: Sender<Found>,
    cancel: CancelToken,
    stats: Arc<SearchStats>,
}

impl<G: IdentitySource> SearchWorker<G> {
    pub(crate) fn new(
        id: usize,
        generator: Arc<G>,
        constraint: SearchConstraint,
        active_provider: Option<String>,
        result_tx: Sender<Found>,
        cancel: CancelToken,
        stats: Arc<SearchStats>,
    ) -> Self {
        Self {
            id,
            generator,
            constraint,
            active_provider,
            result_tx,
            cancel,
            stats,
        }
    }

    /// Runs the worker loop.
    ///
    /// Loops until:
    /// - A match is published to the result slot (`Matched`)
    /// - The cancel token fires (`Cancelled`)
    /// - The slot is already taken or closed (`Cancelled`)
    ///
    /// Generation failures are counted and retried immediately.
    pub fn run(&self) -> WorkerOutcome {
        let outcome = self.search();
        debug!(worker = self.id, ?outcome, "search worker exited");
        outcome
    }

    fn search(&self) -> WorkerOutcome {
        loop {
            if self.cancel.is_cancelled() {
                return WorkerOutcome::Cancelled;
            }

            let bundle = match self.generator.generate() {
                Ok(bundle) => bundle,
                Err(e) => {
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    trace!(worker = self.id, error = %e, "generation failed, retrying");
                    continue;
                }
            };
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);

            if !self.constraint.matches(&bundle.node_id) {
                continue;
            }

            let bundle = match &self.active_provider {
                Some(provider) => bundle.with_provider(provider.clone()),
                None => bundle,
            };

            if self.cancel.is_cancelled() {
                return WorkerOutcome::Cancelled;
            }

            // Single-slot channel: a full or closed slot means the round is decided
            return match self.result_tx.try_send(Found {
                worker_id: self.id,
                bundle,
            }) {
                Ok(()) => WorkerOutcome::Matched,
                Err(_) => WorkerOutcome::Cancelled,
            };
        }
    }
}
