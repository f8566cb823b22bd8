use serde_json::{json, Value};
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use staker_vanity::api::{
    upload_nodes, ApiError, PopVerifier, RemotePopVerifier, RestUploader, UploadOptions,
};
use staker_vanity::IdentityBundle;

fn node(i: usize) -> IdentityBundle {
    IdentityBundle {
        node_id: format!("NodeID-n{}", i),
        cert: "cert".into(),
        key: "key".into(),
        bls_private: "01".repeat(32),
        bls_public: "02".repeat(48),
        bls_signature: "03".repeat(96),
        active_provider: None,
    }
}

fn options(batch_size: usize) -> UploadOptions {
    UploadOptions {
        hardware_provider_id: 3,
        user_id: "user-1".into(),
        l1_id: String::new(),
        network: "fuji".into(),
        include_secrets: false,
        batch_size,
        response_dir: None,
    }
}

fn mount(rt: &Runtime, server: &MockServer, mock: Mock) {
    rt.block_on(mock.mount(server));
}

#[test]
fn test_remote_verify_sends_stored_values() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/bls/pop"))
            .and(body_json(json!({
                "nodeID": "NodeID-x",
                "nodePOP": {"publicKey": "abcd", "proofOfPossession": "ef01"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": true}))),
    );

    let verifier = RemotePopVerifier::new(format!("{}/bls/pop", server.uri())).unwrap();
    assert!(verifier.verify("NodeID-x", "abcd", "ef01").unwrap());
}

#[test]
fn test_remote_verify_reports_invalid() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": false}))),
    );

    let verifier = RemotePopVerifier::new(server.uri()).unwrap();
    assert!(!verifier.verify("NodeID-x", "abcd", "ef01").unwrap());
}

#[test]
fn test_remote_verify_non_200_is_status_error() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom")),
    );

    let verifier = RemotePopVerifier::new(server.uri()).unwrap();
    match verifier.verify("NodeID-x", "abcd", "ef01") {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[test]
fn test_remote_verify_malformed_body() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true}))),
    );

    let verifier = RemotePopVerifier::new(server.uri()).unwrap();
    assert!(matches!(
        verifier.verify("NodeID-x", "abcd", "ef01"),
        Err(ApiError::MalformedResponse(_))
    ));
}

#[test]
fn test_uploader_sends_auth_headers() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/rest/v1/nodes"))
            .and(header("authorization", "Bearer jwt-token"))
            .and(header("apikey", "anon-key"))
            .and(header("prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(201).set_body_string("[]")),
    );

    let uploader =
        RestUploader::new(&format!("{}/", server.uri()), "anon-key", "jwt-token").unwrap();
    let nodes: Vec<_> = (0..3).map(node).collect();
    let summary = upload_nodes(&uploader, &nodes, &options(2)).unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.rejected_batches, 0);

    let requests = rt.block_on(server.received_requests()).unwrap();
    assert_eq!(requests.len(), 2);
    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let rows = first.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["node_id"], "NodeID-n0");
    assert_eq!(rows[0]["bls_public_key"], format!("0x{}", "02".repeat(48)));
    assert_eq!(rows[0]["hw_status"], "inactive");
    assert!(rows[0].get("bls_private_key").is_none());
}

#[test]
fn test_uploader_counts_rejected_batches() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/rest/v1/nodes"))
            .respond_with(ResponseTemplate::new(409).set_body_string("duplicate")),
    );

    let uploader = RestUploader::new(&server.uri(), "anon-key", "jwt-token").unwrap();
    let nodes: Vec<_> = (0..2).map(node).collect();
    let summary = upload_nodes(&uploader, &nodes, &options(1)).unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.rejected_batches, 2);
}
