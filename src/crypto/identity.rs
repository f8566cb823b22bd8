//! Staking identity generation.

use rcgen::{CertificateParams, DistinguishedName, KeyPair, KeyUsagePurpose};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use super::bls::{BlsError, BlsKeypair};
use super::node_id::NodeId;

/// Staking certificates are valid for roughly a century.
const CERT_VALIDITY_DAYS: i64 = 36_525;

/// Errors from a single generation attempt.
///
/// These are transient: the search loop retries instead of aborting.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Certificate generation failed: {0}")]
    Certificate(#[from] rcgen::Error),
    #[error("BLS key generation failed: {0}")]
    Bls(#[from] BlsError),
}

/// A complete node identity: staking TLS material plus BLS signer key.
///
/// Serializes with the field names used in node files
/// (`{"nodes": [...]}`); `active_provider` is omitted when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityBundle {
    /// `NodeID-<cb58>` derived from the staking certificate
    pub node_id: String,
    /// Staking certificate (PEM)
    pub cert: String,
    /// Staking private key (PKCS#8 PEM)
    pub key: String,
    /// BLS secret key (hex, 32 bytes)
    pub bls_private: String,
    /// BLS compressed public key (hex, 48 bytes)
    pub bls_public: String,
    /// BLS proof-of-possession (hex, 96 bytes)
    pub bls_signature: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty"
    )]
    pub active_provider: Option<String>,
}

impl IdentityBundle {
    /// Returns the bundle labelled with an active provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.active_provider = Some(provider.into());
        self
    }

    /// Decodes the BLS secret key into the raw bytes stored in `signer.key`.
    pub fn bls_private_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.bls_private)
    }
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// A source of fresh identity bundles.
///
/// Implementations must be safe to call from many worker threads at once.
pub trait IdentitySource: Send + Sync {
    fn generate(&self) -> Result<IdentityBundle, GenerationError>;
}

/// Generates real staking identities.
///
/// Each call creates an ECDSA P-256 key with a self-signed certificate,
/// derives the node id from the certificate, and creates an independent
/// BLS signer key whose proof-of-possession signs the compressed public key.
/// All material stays in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakingIdentityGenerator;

impl StakingIdentityGenerator {
    pub fn new() -> Self {
        Self
    }

    fn certificate_params() -> CertificateParams {
        let mut params = CertificateParams::default();
        params.distinguished_name = DistinguishedName::new();
        params.not_before = rcgen::date_time_ymd(2000, 1, 1);
        params.not_after = OffsetDateTime::now_utc() + time::Duration::days(CERT_VALIDITY_DAYS);
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        params
    }
}

impl IdentitySource for StakingIdentityGenerator {
    fn generate(&self) -> Result<IdentityBundle, GenerationError> {
        let key_pair = KeyPair::generate()?;
        let cert = Self::certificate_params().self_signed(&key_pair)?;
        let node_id = NodeId::from_cert_der(cert.der());

        let signer = BlsKeypair::generate()?;

        Ok(IdentityBundle {
            node_id: node_id.to_string(),
            cert: cert.pem(),
            key: key_pair.serialize_pem(),
            bls_private: hex::encode(signer.secret_bytes()),
            bls_public: hex::encode(signer.public_bytes()),
            bls_signature: hex::encode(signer.proof_of_possession()),
            active_provider: None,
        })
    }
}
