//! # staker_vanity
//!
//! Validator staking identity generator with vanity node ID search.
//!
//! ## Architecture
//!
//! - `crypto`: Staking certificates, node ids and BLS signer keys
//! - `matcher`: Prefix/suffix constraints on node ids
//! - `worker`: Parallel search rounds and the sequential batch driver
//! - `output`: CSV, JSON and staking directory writers
//! - `api`: Proof-of-possession verification and node uploads
//! - `config`: Command line configuration

pub mod api;
pub mod config;
pub mod crypto;
pub mod matcher;
pub mod output;
pub mod worker;

pub use config::{Cli, Command, ConfigError};
pub use crypto::{IdentityBundle, IdentitySource, NodeId, StakingIdentityGenerator};
pub use matcher::SearchConstraint;
pub use output::OutputTarget;
pub use worker::{BatchDriver, CancelToken, RoundCoordinator, RoundResult, RoundSettings};
