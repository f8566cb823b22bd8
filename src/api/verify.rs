//! Proof-of-possession verification.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::crypto::verify_proof_of_possession;

use super::ApiError;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Checks that a node's BLS signature proves possession of its key.
pub trait PopVerifier {
    fn verify(&self, node_id: &str, public_key: &str, proof: &str) -> Result<bool, ApiError>;
}

/// Verifies in-process with `blst`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPopVerifier;

impl PopVerifier for LocalPopVerifier {
    fn verify(&self, _node_id: &str, public_key: &str, proof: &str) -> Result<bool, ApiError> {
        Ok(verify_proof_of_possession(public_key, proof)?)
    }
}

/// Verifies against a remote HTTP endpoint.
pub struct RemotePopVerifier {
    url: String,
    client: Client,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
}

impl RemotePopVerifier {
    pub fn new(url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(VERIFY_TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PopVerifier for RemotePopVerifier {
    fn verify(&self, node_id: &str, public_key: &str, proof: &str) -> Result<bool, ApiError> {
        let body = pop_request_body(node_id, public_key, proof);
        let resp = self.client.post(&self.url).json(&body).send()?;
        let status = resp.status();
        let text = resp.text().unwrap_or_default();

        if status.as_u16() != 200 {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(node_id, response = %text, "remote proof-of-possession check");
        let parsed: VerifyResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::MalformedResponse(format!("{}: {}", e, text)))?;
        Ok(parsed.valid)
    }
}

/// Request body for the remote verifier. Hex values are sent as stored.
pub fn pop_request_body(node_id: &str, public_key: &str, proof: &str) -> Value {
    json!({
        "nodeID": node_id,
        "nodePOP": {
            "publicKey": public_key,
            "proofOfPossession": proof,
        }
    })
}
