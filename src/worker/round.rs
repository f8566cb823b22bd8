//! Round coordination: race a worker pool to the first matching identity.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, Sender};
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::crypto::{IdentityBundle, IdentitySource};
use crate::matcher::SearchConstraint;

use super::search::{Found, SearchStats, SearchWorker, WorkerOutcome};
use super::CancelToken;

/// Per-round execution settings.
#[derive(Debug, Clone)]
pub struct RoundSettings {
    /// Number of search workers spawned per round
    pub workers: usize,
    /// Label applied to each winning bundle
    pub active_provider: Option<String>,
    /// Cadence of progress reports while a round is running
    pub progress_interval: Duration,
    /// Abort the round once this many identities have been tried
    pub max_attempts: Option<u64>,
    /// Abort the round once it has run this long
    pub max_duration: Option<Duration>,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            active_provider: None,
            progress_interval: Duration::from_secs(1),
            max_attempts: None,
            max_duration: None,
        }
    }
}

impl RoundSettings {
    /// Validates the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidConfig(
                "Worker count must be at least 1".into(),
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Progress interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Snapshot of a running round, delivered on every progress tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundProgress {
    pub elapsed: Duration,
    pub attempts: u64,
    pub failures: u64,
}

impl RoundProgress {
    /// Returns the current generation rate (identities per second).
    pub fn attempts_per_second(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.attempts as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// The accepted identity of one round.
#[derive(Debug, Clone)]
pub struct RoundResult {
    pub bundle: IdentityBundle,
    /// The ID of the worker that found this result
    pub worker_id: usize,
    /// Identities generated across all workers during the round
    pub attempts: u64,
    pub elapsed: Duration,
}

/// Receives liveness reports from a running round.
pub trait ProgressReporter {
    fn tick(&mut self, progress: &RoundProgress);

    /// Called by the batch driver after each accepted round.
    fn round_complete(&mut self, index: usize, result: &RoundResult) {
        let _ = (index, result);
    }
}

/// A reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn tick(&mut self, _progress: &RoundProgress) {}
}

#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to spawn search worker: {0}")]
    Resource(#[source] io::Error),

    #[error("Search cancelled")]
    Cancelled,

    #[error("Search limit reached after {attempts} attempts in {elapsed:?}")]
    LimitExceeded { attempts: u64, elapsed: Duration },

    #[error("All search workers exited without a result")]
    WorkersExited,
}

/// Spawns a worker pool per round and returns the first matching identity.
///
/// There is no built-in timeout: with no limits configured, a round with an
/// unsatisfiable constraint runs until the coordinator's cancel token fires.
pub struct RoundCoordinator<G> {
    generator: Arc<G>,
    settings: RoundSettings,
    cancel: CancelToken,
}

impl<G: IdentitySource + 'static> RoundCoordinator<G> {
    pub fn new(generator: Arc<G>, settings: RoundSettings) -> Self {
        Self {
            generator,
            settings,
            cancel: CancelToken::new(),
        }
    }

    /// Replaces the root cancel token (e.g. one wired to Ctrl-C).
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &RoundSettings {
        &self.settings
    }

    /// Returns a clone of the root cancel token for external use.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs one round to completion.
    ///
    /// Every spawned worker has exited by the time this returns, on all
    /// paths.
    pub fn run_round(
        &self,
        constraint: &SearchConstraint,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<RoundResult, RoundError> {
        self.settings.validate()?;

        let round_cancel = self.cancel.child();
        let stats = Arc::new(SearchStats::new());
        let (result_tx, result_rx) = bounded::<Found>(1);
        let started = Instant::now();

        debug!(
            workers = self.settings.workers,
            prefix = constraint.prefix(),
            suffix = constraint.suffix(),
            "starting round"
        );

        let pool = self.spawn_workers(constraint, result_tx, &round_cancel, &stats)?;

        let ticker = tick(self.settings.progress_interval);
        let outcome = loop {
            select! {
                recv(result_rx) -> msg => {
                    break match msg {
                        Ok(found) => Ok(found),
                        Err(_) if self.cancel.is_cancelled() => Err(RoundError::Cancelled),
                        Err(_) => Err(RoundError::WorkersExited),
                    };
                }
                recv(ticker) -> _ => {
                    let progress = RoundProgress {
                        elapsed: started.elapsed(),
                        attempts: stats.total_attempts(),
                        failures: stats.total_failures(),
                    };
                    reporter.tick(&progress);

                    if self.cancel.is_cancelled() {
                        break Err(RoundError::Cancelled);
                    }
                    if let Some(err) = self.limit_exceeded(&progress) {
                        break Err(err);
                    }
                }
            }
        };

        let outcomes = pool.join();
        debug!(
            joined = outcomes.len(),
            matched = outcomes.iter().filter(|o| **o == WorkerOutcome::Matched).count(),
            "round workers joined"
        );

        let found = outcome?;
        let result = RoundResult {
            bundle: found.bundle,
            worker_id: found.worker_id,
            attempts: stats.total_attempts(),
            elapsed: started.elapsed(),
        };
        debug!(
            node_id = %result.bundle.node_id,
            worker = result.worker_id,
            attempts = result.attempts,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "round matched"
        );
        Ok(result)
    }

    /// Spawns worker threads.
    ///
    /// If a spawn fails, the workers already running are stopped and joined
    /// before the error is returned.
    fn spawn_workers(
        &self,
        constraint: &SearchConstraint,
        result_tx: Sender<Found>,
        round_cancel: &CancelToken,
        stats: &Arc<SearchStats>,
    ) -> Result<WorkerSet, RoundError> {
        let mut pool = WorkerSet::new(round_cancel.clone());

        for id in 0..self.settings.workers {
            let worker = SearchWorker::new(
                id,
                Arc::clone(&self.generator),
                constraint.clone(),
                self.settings.active_provider.clone(),
                result_tx.clone(),
                round_cancel.clone(),
                Arc::clone(stats),
            );

            let handle = thread::Builder::new()
                .name(format!("identity-worker-{}", id))
                .spawn(move || worker.run())
                .map_err(RoundError::Resource)?;
            pool.handles.push(handle);
        }

        Ok(pool)
    }

    fn limit_exceeded(&self, progress: &RoundProgress) -> Option<RoundError> {
        let over_attempts = self
            .settings
            .max_attempts
            .is_some_and(|max| progress.attempts >= max);
        let over_time = self
            .settings
            .max_duration
            .is_some_and(|max| progress.elapsed >= max);

        (over_attempts || over_time).then(|| RoundError::LimitExceeded {
            attempts: progress.attempts,
            elapsed: progress.elapsed,
        })
    }
}

/// The threads of one round. Dropping the set cancels and joins them.
struct WorkerSet {
    cancel: CancelToken,
    handles: Vec<JoinHandle<WorkerOutcome>>,
}

impl WorkerSet {
    fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            handles: Vec::new(),
        }
    }

    /// Signals all workers to stop and waits for them to complete.
    fn join(mut self) -> Vec<WorkerOutcome> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Vec<WorkerOutcome> {
        self.cancel.cancel();
        self.handles
            .drain(..)
            .filter_map(|handle| match handle.join() {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    warn!("search worker panicked");
                    None
                }
            })
            .collect()
    }
}

impl Drop for WorkerSet {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.shutdown();
        }
    }
}
