//! Batch driver: one sequential round per requested identity.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::crypto::IdentitySource;
use crate::matcher::SearchConstraint;

use super::round::{ProgressReporter, RoundCoordinator, RoundError, RoundResult, RoundSettings};
use super::CancelToken;

/// Accepted identities in request order.
pub type ResultSequence = Vec<RoundResult>;

/// Runs rounds back to back, each with its own worker pool and cancel scope.
pub struct BatchDriver<G> {
    coordinator: RoundCoordinator<G>,
}

impl<G: IdentitySource + 'static> BatchDriver<G> {
    pub fn new(generator: Arc<G>, settings: RoundSettings) -> Self {
        Self {
            coordinator: RoundCoordinator::new(generator, settings),
        }
    }

    /// Replaces the root cancel token shared by every round.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.coordinator = self.coordinator.with_cancel_token(cancel);
        self
    }

    /// Generates `count` identities satisfying `constraint`.
    ///
    /// Rounds never overlap. The first failing round aborts the batch and
    /// no partial sequence is returned.
    pub fn generate_batch(
        &self,
        count: usize,
        constraint: &SearchConstraint,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<ResultSequence, RoundError> {
        self.coordinator.settings().validate()?;

        let started = Instant::now();
        let mut results = Vec::with_capacity(count);
        for index in 0..count {
            let result = self.coordinator.run_round(constraint, reporter)?;
            reporter.round_complete(index, &result);
            results.push(result);
        }

        info!(
            count,
            attempts = results.iter().map(|r| r.attempts).sum::<u64>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch complete"
        );
        Ok(results)
    }
}
