//! BLS12-381 signer keys and proof-of-possession.

use blst::min_pk::{PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;
use rand::RngCore;

/// Domain separation tag for proof-of-possession signatures.
pub const POP_DST: &[u8] = b"BLS_POP_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Errors raised by BLS key handling.
#[derive(Debug, thiserror::Error)]
pub enum BlsError {
    #[error("Key generation failed: {0:?}")]
    KeyGen(BLST_ERROR),
    #[error("Invalid secret key: {0:?}")]
    InvalidSecretKey(BLST_ERROR),
    #[error("Invalid public key: {0:?}")]
    InvalidPublicKey(BLST_ERROR),
    #[error("Invalid signature: {0:?}")]
    InvalidSignature(BLST_ERROR),
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// A BLS signer key (min-pk: 48-byte public keys, 96-byte signatures).
pub struct BlsKeypair {
    secret: SecretKey,
    public: PublicKey,
}

impl BlsKeypair {
    /// Generates a new signer key from 32 bytes of OS-seeded randomness.
    pub fn generate() -> Result<Self, BlsError> {
        let mut ikm = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut ikm);
        let secret = SecretKey::key_gen(&ikm, &[]).map_err(BlsError::KeyGen)?;
        let public = secret.sk_to_pk();
        Ok(Self { secret, public })
    }

    /// Restores a signer key from its 32-byte big-endian encoding.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, BlsError> {
        let secret = SecretKey::from_bytes(bytes).map_err(BlsError::InvalidSecretKey)?;
        let public = secret.sk_to_pk();
        Ok(Self { secret, public })
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Compressed public key.
    pub fn public_bytes(&self) -> [u8; 48] {
        self.public.compress()
    }

    /// Signs the compressed public key under [`POP_DST`].
    pub fn proof_of_possession(&self) -> [u8; 96] {
        let message = self.public_bytes();
        self.secret.sign(&message, POP_DST, &[]).compress()
    }
}

/// Checks a hex-encoded proof-of-possession against a hex-encoded public key.
///
/// Accepts values with or without a `0x` prefix. Malformed keys or
/// signatures are errors; a well-formed signature that does not verify
/// returns `Ok(false)`.
pub fn verify_proof_of_possession(public_hex: &str, signature_hex: &str) -> Result<bool, BlsError> {
    let public_bytes = hex::decode(strip_hex_prefix(public_hex))?;
    let signature_bytes = hex::decode(strip_hex_prefix(signature_hex))?;

    let public = PublicKey::key_validate(&public_bytes).map_err(BlsError::InvalidPublicKey)?;
    let signature = Signature::from_bytes(&signature_bytes).map_err(BlsError::InvalidSignature)?;

    let result = signature.verify(true, &public_bytes, POP_DST, &[], &public, false);
    Ok(matches!(result, BLST_ERROR::BLST_SUCCESS))
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}
