//! Vanity constraints on node identifiers.
//!
//! Matching is exact prefix/suffix anchoring on the CB58 body of a node
//! id, optionally case-insensitive.

mod constraint;

pub use constraint::{matches, SearchConstraint, CB58_ALPHABET, MAX_NODE_ID_BODY_LEN};
