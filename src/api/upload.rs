//! Batched node uploads.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::crypto::IdentityBundle;

use super::{ensure_hex_prefix, ApiError};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const NODES_PATH: &str = "/rest/v1/nodes";

/// Fields shared by every uploaded node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub hardware_provider_id: i64,
    pub user_id: String,
    pub l1_id: String,
    pub network: String,
    pub include_secrets: bool,
    pub batch_size: usize,
    /// Directory receiving `upload_nodes_response_batch_<n>.json` files
    pub response_dir: Option<PathBuf>,
}

/// One row inserted into the provider's `nodes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInsert {
    pub node_id: String,
    pub bls_public_key: String,
    pub bls_signature: String,
    pub hardware_provider_id: i64,
    pub user_id: String,
    pub hw_status: &'static str,
    pub node_state: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub l1_id: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staker_cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staker_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bls_private_key: Option<String>,
}

impl NodeInsert {
    pub fn from_bundle(bundle: &IdentityBundle, opts: &UploadOptions) -> Self {
        let secrets = opts.include_secrets;
        Self {
            node_id: bundle.node_id.clone(),
            bls_public_key: ensure_hex_prefix(&bundle.bls_public),
            bls_signature: ensure_hex_prefix(&bundle.bls_signature),
            hardware_provider_id: opts.hardware_provider_id,
            user_id: opts.user_id.clone(),
            hw_status: "inactive",
            node_state: "available",
            l1_id: opts.l1_id.clone(),
            network: opts.network.clone(),
            staker_cert: secrets.then(|| bundle.cert.clone()),
            staker_key: secrets.then(|| bundle.key.clone()),
            bls_private_key: secrets.then(|| bundle.bls_private.clone()),
        }
    }
}

/// Status and body of one batch insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResponse {
    pub status: u16,
    pub body: String,
}

impl BatchResponse {
    pub fn is_created(&self) -> bool {
        self.status == 201
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub total: usize,
    pub batches: usize,
    pub rejected_batches: usize,
}

/// Destination of node batches.
pub trait BatchSink {
    fn insert_batch(&self, batch: &[NodeInsert]) -> Result<BatchResponse, ApiError>;
}

/// Inserts node batches through the provider's REST API.
pub struct RestUploader {
    endpoint: String,
    api_key: String,
    access_token: String,
    client: Client,
}

impl RestUploader {
    pub fn new(
        api_url: &str,
        api_key: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
        Ok(Self {
            endpoint: format!("{}{}", api_url.trim_end_matches('/'), NODES_PATH),
            api_key: api_key.into(),
            access_token: access_token.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BatchSink for RestUploader {
    fn insert_batch(&self, batch: &[NodeInsert]) -> Result<BatchResponse, ApiError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .header("apikey", &self.api_key)
            .header("Prefer", "return=representation")
            .json(batch)
            .send()?;
        let status = resp.status().as_u16();
        let body = resp.text().unwrap_or_default();
        Ok(BatchResponse { status, body })
    }
}

/// File name for the saved response of a 1-based batch number.
pub fn response_file_name(batch_num: usize) -> String {
    format!("upload_nodes_response_batch_{}.json", batch_num)
}

pub fn build_payloads(nodes: &[IdentityBundle], opts: &UploadOptions) -> Vec<NodeInsert> {
    nodes.iter().map(|n| NodeInsert::from_bundle(n, opts)).collect()
}

/// Uploads nodes in chunks of `opts.batch_size`.
///
/// A batch the server does not accept with 201 is logged and counted, and
/// the upload continues. Transport errors abort. When `opts.response_dir`
/// is set, each batch's response body is saved there; a failed save is
/// only a warning.
pub fn upload_nodes(
    sink: &dyn BatchSink,
    nodes: &[IdentityBundle],
    opts: &UploadOptions,
) -> Result<UploadSummary, ApiError> {
    let payloads = build_payloads(nodes, opts);
    let batch_size = opts.batch_size.max(1);
    let mut summary = UploadSummary {
        total: payloads.len(),
        ..Default::default()
    };

    for (index, batch) in payloads.chunks(batch_size).enumerate() {
        let batch_num = index + 1;
        let response = sink.insert_batch(batch)?;
        summary.batches += 1;

        if let Some(dir) = &opts.response_dir {
            let path = dir.join(response_file_name(batch_num));
            match fs::write(&path, &response.body) {
                Ok(()) => debug!(batch = batch_num, path = %path.display(), "saved batch response"),
                Err(e) => warn!(
                    batch = batch_num,
                    path = %path.display(),
                    error = %e,
                    "failed to save batch response"
                ),
            }
        }

        if response.is_created() {
            info!(batch = batch_num, nodes = batch.len(), "batch uploaded");
        } else {
            summary.rejected_batches += 1;
            warn!(
                batch = batch_num,
                status = response.status,
                body = %response.body,
                "batch rejected"
            );
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::bundle;
    use std::cell::RefCell;

    struct MockSink {
        sizes: RefCell<Vec<usize>>,
        statuses: Vec<u16>,
    }

    impl MockSink {
        fn new(statuses: &[u16]) -> Self {
            Self {
                sizes: RefCell::new(Vec::new()),
                statuses: statuses.to_vec(),
            }
        }
    }

    impl BatchSink for MockSink {
        fn insert_batch(&self, batch: &[NodeInsert]) -> Result<BatchResponse, ApiError> {
            let mut sizes = self.sizes.borrow_mut();
            let status = self.statuses.get(sizes.len()).copied().unwrap_or(201);
            sizes.push(batch.len());
            Ok(BatchResponse {
                status,
                body: format!("[{{\"batch\":{}}}]", sizes.len()),
            })
        }
    }

    fn options(include_secrets: bool, batch_size: usize) -> UploadOptions {
        UploadOptions {
            hardware_provider_id: 7,
            user_id: "user-1".into(),
            l1_id: String::new(),
            network: "fuji".into(),
            include_secrets,
            batch_size,
            response_dir: None,
        }
    }

    fn nodes(n: usize) -> Vec<IdentityBundle> {
        (0..n).map(|i| bundle(format!("NodeID-n{}", i))).collect()
    }

    #[test]
    fn test_payload_without_secrets() {
        let payload = NodeInsert::from_bundle(&bundle("NodeID-a".into()), &options(false, 25));
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["node_id"], "NodeID-a");
        assert_eq!(value["bls_public_key"], format!("0x{}", "02".repeat(48)));
        assert_eq!(value["bls_signature"], format!("0x{}", "03".repeat(96)));
        assert_eq!(value["hardware_provider_id"], 7);
        assert_eq!(value["hw_status"], "inactive");
        assert_eq!(value["node_state"], "available");
        assert_eq!(value["network"], "fuji");
        assert!(value.get("l1_id").is_none());
        assert!(value.get("staker_cert").is_none());
        assert!(value.get("staker_key").is_none());
        assert!(value.get("bls_private_key").is_none());
    }

    #[test]
    fn test_payload_with_secrets_and_l1() {
        let mut opts = options(true, 25);
        opts.l1_id = "l1-abc".into();
        let node = bundle("NodeID-a".into());
        let value = serde_json::to_value(NodeInsert::from_bundle(&node, &opts)).unwrap();

        assert_eq!(value["l1_id"], "l1-abc");
        assert_eq!(value["staker_cert"], node.cert.as_str());
        assert_eq!(value["staker_key"], node.key.as_str());
        assert_eq!(value["bls_private_key"], node.bls_private.as_str());
    }

    #[test]
    fn test_existing_hex_prefix_is_kept() {
        let mut node = bundle("NodeID-a".into());
        node.bls_public = format!("0x{}", "02".repeat(48));
        node.bls_signature = format!("0x{}", "03".repeat(96));
        node.bls_private = format!("0x{}", "01".repeat(32));

        let payload = NodeInsert::from_bundle(&node, &options(true, 25));

        assert_eq!(payload.bls_public_key, node.bls_public);
        assert_eq!(payload.bls_signature, node.bls_signature);
        assert!(!payload.bls_public_key.starts_with("0x0x"));
        assert_eq!(payload.bls_private_key.as_deref(), Some(node.bls_private.as_str()));
    }

    #[test]
    fn test_private_key_sent_as_stored() {
        let node = bundle("NodeID-a".into());
        let payload = NodeInsert::from_bundle(&node, &options(true, 25));
        assert_eq!(payload.bls_private_key.as_deref(), Some("01".repeat(32).as_str()));
    }

    #[test]
    fn test_batch_responses_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(false, 2);
        opts.response_dir = Some(dir.path().to_path_buf());

        let sink = MockSink::new(&[201, 409]);
        upload_nodes(&sink, &nodes(3), &opts).unwrap();

        let first = fs::read_to_string(dir.path().join("upload_nodes_response_batch_1.json")).unwrap();
        let second = fs::read_to_string(dir.path().join(response_file_name(2))).unwrap();
        assert_eq!(first, r#"[{"batch":1}]"#);
        assert_eq!(second, r#"[{"batch":2}]"#);
        assert!(!dir.path().join(response_file_name(3)).exists());
    }

    #[test]
    fn test_unwritable_response_dir_does_not_fail_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(false, 25);
        opts.response_dir = Some(dir.path().join("missing"));

        let sink = MockSink::new(&[]);
        let summary = upload_nodes(&sink, &nodes(1), &opts).unwrap();
        assert_eq!(summary.batches, 1);
    }

    #[test]
    fn test_batches_are_chunked() {
        let sink = MockSink::new(&[]);
        let summary = upload_nodes(&sink, &nodes(7), &options(false, 3)).unwrap();

        assert_eq!(*sink.sizes.borrow(), vec![3, 3, 1]);
        assert_eq!(
            summary,
            UploadSummary {
                total: 7,
                batches: 3,
                rejected_batches: 0
            }
        );
    }

    #[test]
    fn test_rejected_batch_does_not_stop_upload() {
        let sink = MockSink::new(&[201, 409, 201]);
        let summary = upload_nodes(&sink, &nodes(5), &options(false, 2)).unwrap();

        assert_eq!(sink.sizes.borrow().len(), 3);
        assert_eq!(summary.rejected_batches, 1);
    }

    #[test]
    fn test_empty_upload() {
        let sink = MockSink::new(&[]);
        let summary = upload_nodes(&sink, &[], &options(false, 25)).unwrap();
        assert_eq!(summary.batches, 0);
        assert!(sink.sizes.borrow().is_empty());
    }
}
