//! Cryptographic material for validator node identities.
//!
//! This module provides:
//! - Staking certificate and key generation (ECDSA P-256, self-signed)
//! - Node id derivation and CB58 encoding
//! - BLS signer keys with proof-of-possession

mod bls;
mod identity;
mod node_id;

pub use bls::{verify_proof_of_possession, BlsError, BlsKeypair, POP_DST};
pub use identity::{GenerationError, IdentityBundle, IdentitySource, StakingIdentityGenerator};
pub use node_id::{NodeId, NodeIdError, NODE_ID_PREFIX};
