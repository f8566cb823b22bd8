//! Concurrent constrained-identity search.
//!
//! This module provides:
//! - Search workers (one OS thread each) racing to a single-slot result
//! - A round coordinator with progress ticks, cancellation and join-on-exit
//! - A batch driver running rounds strictly in sequence
//!
//! ## Future Extensions
//! - Overlapping rounds for higher throughput on large batches

mod batch;
mod cancel;
mod round;
mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchDriver, ResultSequence};
pub use cancel::CancelToken;
pub use round::{
    NoProgress, ProgressReporter, RoundCoordinator, RoundError, RoundProgress, RoundResult,
    RoundSettings,
};
pub use search::{SearchStats, SearchWorker, WorkerOutcome};
