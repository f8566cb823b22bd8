//! Node identifier derivation and CB58 encoding.

use std::fmt;
use std::str::FromStr;

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Scheme tag carried by every textual node identifier.
pub const NODE_ID_PREFIX: &str = "NodeID-";

/// Trailing checksum bytes appended before base58 encoding.
const CHECKSUM_LEN: usize = 4;

/// A validator node identifier (20 bytes).
///
/// Derived as `ripemd160(sha256(cert_der))` from the node's staking
/// certificate, and rendered as `NodeID-<cb58>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId([u8; 20]);

impl NodeId {
    /// Creates a node id from raw bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derives the node id of a DER-encoded staking certificate.
    pub fn from_cert_der(der: &[u8]) -> Self {
        let digest = Ripemd160::digest(Sha256::digest(der));
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Returns the CB58 body (without the `NodeID-` tag).
    pub fn to_cb58(&self) -> String {
        cb58_encode(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_cb58())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NODE_ID_PREFIX, self.to_cb58())
    }
}

impl FromStr for NodeId {
    type Err = NodeIdError;

    /// Parses `NodeID-<cb58>` or a bare CB58 body.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix(NODE_ID_PREFIX).unwrap_or(s);
        let payload = cb58_decode(body)?;
        let bytes: [u8; 20] = payload
            .try_into()
            .map_err(|v: Vec<u8>| NodeIdError::InvalidLength(v.len()))?;
        Ok(Self(bytes))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NodeIdError {
    #[error("Invalid base58 encoding")]
    InvalidEncoding,
    #[error("Checksum mismatch")]
    BadChecksum,
    #[error("Expected 20 payload bytes, got {0}")]
    InvalidLength(usize),
}

/// Base58 with a 4-byte `sha256` checksum suffix.
fn cb58_encode(payload: &[u8]) -> String {
    let checksum = Sha256::digest(payload);
    let mut buf = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum[checksum.len() - CHECKSUM_LEN..]);
    bs58::encode(buf).into_string()
}

fn cb58_decode(s: &str) -> Result<Vec<u8>, NodeIdError> {
    let mut raw = bs58::decode(s)
        .into_vec()
        .map_err(|_| NodeIdError::InvalidEncoding)?;
    if raw.len() < CHECKSUM_LEN {
        return Err(NodeIdError::InvalidLength(raw.len()));
    }

    let split = raw.len() - CHECKSUM_LEN;
    let checksum = Sha256::digest(&raw[..split]);
    if raw[split..] != checksum[checksum.len() - CHECKSUM_LEN..] {
        return Err(NodeIdError::BadChecksum);
    }

    raw.truncate(split);
    Ok(raw)
}
