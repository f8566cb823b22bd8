//! Provider API clients.
//!
//! - proof-of-possession verification, locally with `blst` or remotely
//! - batched node uploads to the provider's REST endpoint

mod upload;
mod verify;

use crate::crypto::BlsError;

pub use upload::{
    build_payloads, response_file_name, upload_nodes, BatchResponse, BatchSink, NodeInsert,
    RestUploader, UploadOptions, UploadSummary,
};
pub use verify::{pop_request_body, LocalPopVerifier, PopVerifier, RemotePopVerifier};

/// Default remote proof-of-possession verification endpoint.
pub const DEFAULT_POP_VERIFY_URL: &str = "https://api.gogopool.com/bls/pop";

/// Adds a `0x` prefix to hex text that lacks one.
pub(crate) fn ensure_hex_prefix(hex: &str) -> String {
    if hex.starts_with("0x") {
        hex.to_string()
    } else {
        format!("0x{}", hex)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Local verification failed: {0}")]
    Local(#[from] BlsError),
}
